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

//! Responses sent back to the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply to an authentication request. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub protocol_version: i32,
    pub request_id: i64,
    pub data: AuthResponseData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponseData {
    pub authenticated: bool,
}

#[must_use]
pub fn build_auth_response(protocol_version: i32, request_id: i64, authenticated: bool) -> AuthResponse {
    AuthResponse {
        protocol_version,
        request_id,
        data: AuthResponseData { authenticated },
    }
}

impl AuthResponse {
    /// For inspection. A `Value` map does not keep key order, so never put this on the wire;
    /// serialize the response itself instead.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "protocol_version": self.protocol_version,
            "request_id": self.request_id,
            "data": { "authenticated": self.data.authenticated },
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_value().to_string())
    }
}
