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

//! Everything between a TCP socket and a JSON value: line framing, optional encryption, and the
//! shared handle requests use to write back to the connection they arrived on.

use serde::Serialize;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

pub use connection::{Connection, LineSink};
pub use encryption::WireKey;
pub use frame::{decode_frame, encode_frame};

mod connection;
mod encryption;
mod frame;

/// Upper bound on a single line; an age-encrypted, base64'd request is well under this.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Lines(#[from] LinesCodecError),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("frame is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("frame is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection is closed")]
    ConnectionClosed,
}

/// Encode `value` (encrypting it when `key` is present) and write it as one line on
/// `connection`.
pub async fn send_json<T>(
    connection: &Connection,
    key: Option<&WireKey>,
    value: &T,
) -> Result<(), WireError>
where
    T: Serialize + ?Sized,
{
    let line = encode_frame(key, value)?;
    connection.send_line(line).await
}
