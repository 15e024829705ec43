// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! One JSON document per line. With a key, the line is the base64 of the age ciphertext;
//! without one, it is the JSON text itself.

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;
use serde_json::Value;

use crate::transport::{WireError, WireKey};

/// Fields go out in `value`'s own serialization order; pass the typed response, not a `Value`,
/// when order matters.
pub fn encode_frame<T>(key: Option<&WireKey>, value: &T) -> Result<String, WireError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(value)?;
    match key {
        None => Ok(String::from_utf8(json)?),
        Some(key) => Ok(general_purpose::STANDARD.encode(key.seal(&json)?)),
    }
}

pub fn decode_frame(key: Option<&WireKey>, line: &str) -> Result<Value, WireError> {
    let line = line.trim();
    let value = match key {
        None => serde_json::from_str(line)?,
        Some(key) => {
            let ciphertext = general_purpose::STANDARD.decode(line)?;
            serde_json::from_slice(&key.open(&ciphertext)?)?
        }
    };
    Ok(value)
}
