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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use storelink_common::requests::{AuthenticationPayload, Payload};
use storelink_common::{Principal, PrincipalId, RequestError, RequestHeader, build_auth_response};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::requests::poll::{PollState, PollerState, Tick};
use crate::requests::{RequestLifecycle, ServiceContext};
use crate::transport::{Connection, send_json};

/// Waits for an online principal to confirm a store purchase, then tells the store so.
///
/// Polls once per tick until the principal's flag is seen set, the tick budget runs out, or the
/// store connection goes away. Only the first of those produces any output; the other two end
/// quietly.
pub struct AuthenticationRequest {
    context: Arc<ServiceContext>,
    connection: Arc<Connection>,
    header: RequestHeader,
    player_name: String,
    // Held for the whole of each tick, so `close` returning means no tick is mid-flight.
    poll: Mutex<PollState>,
    // Set under `poll` together with the terminal state, for lock-free `is_finished`.
    finished: AtomicBool,
    cancel: CancellationToken,
    running: AtomicBool,
}

impl AuthenticationRequest {
    pub fn new(
        context: Arc<ServiceContext>,
        connection: Arc<Connection>,
        protocol_version: i32,
        request_id: i64,
        data: &Payload,
    ) -> Result<Self, RequestError> {
        let payload = AuthenticationPayload::from_versioned(protocol_version, data)?;
        let tick_budget = context.poller.tick_budget;
        Ok(Self {
            context,
            connection,
            header: RequestHeader::new(protocol_version, request_id),
            player_name: payload.player_name,
            poll: Mutex::new(PollState::new(payload.player_id, tick_budget)),
            finished: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
        })
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub async fn target(&self) -> PrincipalId {
        self.poll.lock().await.target_id()
    }

    pub async fn state(&self) -> PollerState {
        self.poll.lock().await.state()
    }

    async fn poll_loop(self: Arc<Self>) {
        let registry = self.context.principals.clone();
        {
            let mut poll = self.poll.lock().await;
            if poll.state().is_terminal() {
                return;
            }
            poll.prime(registry.as_ref());
        }

        let mut interval = tokio::time::interval(self.context.poller.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = interval.tick() => {}
            }

            let mut poll = self.poll.lock().await;
            if poll.state().is_terminal() {
                return;
            }
            let terminal = match poll.tick(registry.as_ref(), self.connection.is_closed()) {
                Tick::Pending => continue,
                Tick::Confirmed(principal) => self.confirm(&principal).await,
                Tick::TimedOut => {
                    debug!(
                        request_id = self.header.request_id,
                        principal = %poll.target_id(),
                        "Authentication request timed out"
                    );
                    PollerState::TimedOut
                }
                Tick::TransportClosed => {
                    debug!(
                        request_id = self.header.request_id,
                        peer = %self.connection.peer(),
                        "Store connection closed, abandoning authentication request"
                    );
                    PollerState::Aborted
                }
            };
            self.finish(&mut poll, terminal);
            return;
        }
    }

    /// Answer the store and clean up after the principal. The flag is consumed even when the
    /// answer cannot be delivered; the principal is only told about it when it was.
    async fn confirm(&self, principal: &Principal) -> PollerState {
        let registry = self.context.principals.as_ref();
        let response = build_auth_response(
            self.header.protocol_version,
            self.header.request_id,
            true,
        );
        let key = self.context.encryption_key.as_deref();
        match send_json(&self.connection, key, &response).await {
            Ok(()) => {
                registry.notify(principal, &self.context.poller.confirmation_message);
                registry.set_authenticated(principal, false);
                registry.on_authenticated(principal);
                info!(
                    request_id = self.header.request_id,
                    principal = %principal.id,
                    name = %principal.name,
                    "Authentication confirmed"
                );
                PollerState::Completed
            }
            Err(e) => {
                error!(
                    request_id = self.header.request_id,
                    principal = %principal.id,
                    peer = %self.connection.peer(),
                    error = %e,
                    "Failed to deliver authentication response"
                );
                registry.set_authenticated(principal, false);
                PollerState::Aborted
            }
        }
    }

    fn finish(&self, poll: &mut PollState, state: PollerState) {
        poll.finish(state);
        self.finished.store(true, Ordering::SeqCst);
        self.context.requests.deregister(self.header.request_id);
        self.cancel.cancel();
    }
}

impl RequestLifecycle for AuthenticationRequest {
    fn header(&self) -> RequestHeader {
        self.header
    }

    fn run(self: Arc<Self>) -> Result<(), RequestError> {
        if self.cancel.is_cancelled() {
            return Err(RequestError::AlreadyClosed);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RequestError::AlreadyRunning);
        }
        debug!(
            request_id = self.header.request_id,
            player_name = %self.player_name,
            "Starting authentication poll"
        );
        tokio::spawn(self.poll_loop());
        Ok(())
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        async move {
            self.cancel.cancel();
            let mut poll = self.poll.lock().await;
            if !poll.state().is_terminal() {
                debug!(request_id = self.header.request_id, "Authentication request closed");
                self.finish(&mut poll, PollerState::Aborted);
            }
        }
        .boxed()
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}
