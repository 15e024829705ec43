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

//! Types shared between the storelink daemon and anything that talks to it: principal
//! identifiers, the inbound request envelope and its versioned payloads, and the fixed-shape
//! responses sent back to the store.

pub use model::{Principal, PrincipalId};
pub use requests::{RequestEnvelope, RequestError, RequestHeader, RequestType};
pub use response::{AuthResponse, AuthResponseData, build_auth_response};

pub mod model;
pub mod requests;
pub mod response;
pub mod tracing;
pub mod util;
