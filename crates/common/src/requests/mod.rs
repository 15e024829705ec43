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

//! The inbound side of the store protocol: the envelope every request arrives in, and the
//! per-type, per-version payloads carried inside it.

use serde_json::{Map, Value};
use strum::{Display, EnumString};
use thiserror::Error;

pub use authentication::AuthenticationPayload;

mod authentication;

/// Raw request payload, the `data` object of the envelope.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unknown request type: {0}")]
    UnknownRequestType(String),
    #[error("request {0} is already in flight")]
    DuplicateRequest(i64),
    #[error("request is already running")]
    AlreadyRunning,
    #[error("request has already been closed")]
    AlreadyClosed,
}

/// Identity of one request: which protocol revision the store spoke, and the id it expects to see
/// echoed back in the response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RequestHeader {
    pub protocol_version: i32,
    pub request_id: i64,
}

impl RequestHeader {
    pub fn new(protocol_version: i32, request_id: i64) -> Self {
        Self {
            protocol_version,
            request_id,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    Authentication,
}

/// A decoded but not yet dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub header: RequestHeader,
    pub request_type: String,
    pub data: Payload,
}

impl RequestEnvelope {
    /// Pull the envelope fields out of a decoded frame. Only the envelope is checked here; the
    /// contents of `data` are left to the request type that ends up handling it.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(mut object) = value else {
            return Err(RequestError::MalformedPayload(
                "request is not a JSON object".to_string(),
            ));
        };
        let protocol_version = required_i64(&object, "protocol_version")?;
        let protocol_version = i32::try_from(protocol_version).map_err(|_| {
            RequestError::MalformedPayload(format!(
                "protocol_version out of range: {protocol_version}"
            ))
        })?;
        let request_id = required_i64(&object, "request_id")?;
        let request_type = required_str(&object, "request_type")?.to_string();
        let data = match object.remove("data") {
            Some(Value::Object(data)) => data,
            Some(_) => {
                return Err(RequestError::MalformedPayload(
                    "field `data` is not an object".to_string(),
                ));
            }
            None => {
                return Err(RequestError::MalformedPayload(
                    "missing field `data`".to_string(),
                ));
            }
        };

        Ok(Self {
            header: RequestHeader::new(protocol_version, request_id),
            request_type,
            data,
        })
    }

    pub fn request_type(&self) -> Result<RequestType, RequestError> {
        self.request_type
            .parse()
            .map_err(|_| RequestError::UnknownRequestType(self.request_type.clone()))
    }
}

pub(crate) fn required_str<'a>(data: &'a Payload, field: &str) -> Result<&'a str, RequestError> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(RequestError::MalformedPayload(format!(
            "field `{field}` is not a string: {other}"
        ))),
        None => Err(RequestError::MalformedPayload(format!(
            "missing field `{field}`"
        ))),
    }
}

pub(crate) fn required_i64(data: &Payload, field: &str) -> Result<i64, RequestError> {
    match data.get(field) {
        Some(v) => v.as_i64().ok_or_else(|| {
            RequestError::MalformedPayload(format!("field `{field}` is not an integer: {v}"))
        }),
        None => Err(RequestError::MalformedPayload(format!(
            "missing field `{field}`"
        ))),
    }
}
