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

use storelink_common::RequestError;
use tracing::{debug, info};

use crate::requests::ActiveRequest;

/// Requests currently in flight, keyed by request id.
pub struct RequestTable {
    requests: papaya::HashMap<i64, ActiveRequest>,
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTable {
    pub fn new() -> Self {
        Self {
            requests: papaya::HashMap::new(),
        }
    }

    pub fn register(&self, request: ActiveRequest) -> Result<(), RequestError> {
        let request_id = request.header().request_id;
        let requests = self.requests.pin();
        if requests.try_insert(request_id, request).is_err() {
            return Err(RequestError::DuplicateRequest(request_id));
        }
        debug!(request_id, in_flight = requests.len(), "Request registered");
        Ok(())
    }

    /// Remove a request. Returns false if it was not present.
    pub fn deregister(&self, request_id: i64) -> bool {
        let removed = self.requests.pin().remove(&request_id).is_some();
        if removed {
            debug!(request_id, "Request deregistered");
        }
        removed
    }

    pub fn get(&self, request_id: i64) -> Option<ActiveRequest> {
        self.requests.pin().get(&request_id).cloned()
    }

    pub fn contains(&self, request_id: i64) -> bool {
        self.requests.pin().contains_key(&request_id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every request in flight.
    pub async fn close_all(&self) {
        let requests: Vec<ActiveRequest> =
            self.requests.pin().iter().map(|(_, r)| r.clone()).collect();
        if requests.is_empty() {
            return;
        }
        info!(count = requests.len(), "Closing in-flight requests");
        for request in requests {
            request.close().await;
        }
    }
}
