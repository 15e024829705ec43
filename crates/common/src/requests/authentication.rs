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

use crate::model::PrincipalId;
use crate::requests::{Payload, RequestError, required_str};

/// Fields of an authentication request, as carried in the envelope's `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationPayload {
    /// Informational only; never used to match the principal.
    pub player_name: String,
    pub player_id: PrincipalId,
}

impl AuthenticationPayload {
    /// Extract the fields for the given protocol revision. Every revision seen so far shares one
    /// layout; a revision that changes it gets its own arm here.
    #[allow(clippy::match_single_binding)]
    pub fn from_versioned(protocol_version: i32, data: &Payload) -> Result<Self, RequestError> {
        match protocol_version {
            _ => {
                let player_name = required_str(data, "player_name")?.to_string();
                let raw_uuid = required_str(data, "player_uuid")?;
                let player_id = raw_uuid.parse::<PrincipalId>().map_err(|e| {
                    RequestError::MalformedPayload(format!(
                        "field `player_uuid` is not a valid UUID ({raw_uuid:?}): {e}"
                    ))
                })?;
                Ok(Self {
                    player_name,
                    player_id,
                })
            }
        }
    }
}
