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

//! In-flight store requests: the lifecycle every request type follows, the table that tracks
//! them, and dispatch from a decoded envelope to a running request.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use storelink_common::{RequestEnvelope, RequestError, RequestHeader, RequestType};
use tracing::debug;

use crate::principals::PrincipalRegistry;
use crate::transport::{Connection, WireKey};

pub use authentication::AuthenticationRequest;
pub use poll::{PollState, PollerState, Tick};
pub use table::RequestTable;

mod authentication;
mod poll;
mod table;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TICK_BUDGET: u32 = 300;
pub const DEFAULT_CONFIRMATION_MESSAGE: &str = "You have authenticated your current store purchase!";

/// Timing and wording for authentication polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    pub tick_interval: Duration,
    pub tick_budget: u32,
    pub confirmation_message: String,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            tick_budget: DEFAULT_TICK_BUDGET,
            confirmation_message: DEFAULT_CONFIRMATION_MESSAGE.to_string(),
        }
    }
}

/// Everything a request needs from the service that owns it.
pub struct ServiceContext {
    pub principals: Arc<dyn PrincipalRegistry>,
    pub requests: Arc<RequestTable>,
    pub encryption_key: Option<Arc<WireKey>>,
    pub poller: PollerSettings,
}

impl ServiceContext {
    pub fn new(
        principals: Arc<dyn PrincipalRegistry>,
        encryption_key: Option<Arc<WireKey>>,
        poller: PollerSettings,
    ) -> Self {
        Self {
            principals,
            requests: Arc::new(RequestTable::new()),
            encryption_key,
            poller,
        }
    }
}

/// The contract every request type obeys.
///
/// A request is built (and its payload validated) without starting anything. `run` starts its
/// work and may be called once. `close` tears it down and may be called any number of times,
/// from anywhere, including while the request's own task is mid-tick; once it returns the request
/// does no further work.
pub trait RequestLifecycle: Send + Sync {
    fn header(&self) -> RequestHeader;

    fn run(self: Arc<Self>) -> Result<(), RequestError>;

    fn close(&self) -> BoxFuture<'_, ()>;

    /// True once the request has reached a terminal state.
    fn is_finished(&self) -> bool;
}

pub type ActiveRequest = Arc<dyn RequestLifecycle>;

/// Build the request an envelope describes, register it, and start it.
///
/// Construction failures (bad payload, unknown type) never reach the table. A request whose id
/// is already in flight is refused so that a request id is answered at most once.
pub fn dispatch(
    context: &Arc<ServiceContext>,
    connection: &Arc<Connection>,
    envelope: RequestEnvelope,
) -> Result<ActiveRequest, RequestError> {
    let header = envelope.header;
    let request: ActiveRequest = match envelope.request_type()? {
        RequestType::Authentication => Arc::new(AuthenticationRequest::new(
            context.clone(),
            connection.clone(),
            header.protocol_version,
            header.request_id,
            &envelope.data,
        )?),
    };

    context.requests.register(request.clone())?;
    if let Err(e) = request.clone().run() {
        context.requests.deregister(header.request_id);
        return Err(e);
    }
    debug!(
        request_id = header.request_id,
        request_type = %envelope.request_type,
        "Request dispatched"
    );
    Ok(request)
}
