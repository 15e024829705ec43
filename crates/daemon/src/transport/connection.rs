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

use std::pin::Pin;

use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;
use uuid::Uuid;

use crate::transport::WireError;

/// The write half of a line-framed socket.
pub type LineSink = Pin<Box<dyn Sink<String, Error = LinesCodecError> + Send>>;

/// A store connection as seen by the requests that arrived on it. The reader side belongs to the
/// listener; requests only ever write, and only ever look at whether the socket is gone.
pub struct Connection {
    id: Uuid,
    peer: String,
    writer: Mutex<LineSink>,
    closed: CancellationToken,
}

impl Connection {
    pub fn new(peer: impl Into<String>, writer: LineSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
        }
    }

    pub fn from_sink<S>(peer: impl Into<String>, sink: S) -> Self
    where
        S: Sink<String, Error = LinesCodecError> + Send + 'static,
    {
        Self::new(peer, Box::pin(sink))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Flag the connection as gone. Requests notice on their next tick.
    pub fn mark_closed(&self) {
        if !self.closed.is_cancelled() {
            debug!(connection = %self.id, peer = %self.peer, "Connection marked closed");
            self.closed.cancel();
        }
    }

    /// Resolves once the connection has been marked closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Write one line and flush it. A failed write marks the connection closed.
    pub async fn send_line(&self, line: String) -> Result<(), WireError> {
        if self.is_closed() {
            return Err(WireError::ConnectionClosed);
        }
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(line).await {
            self.mark_closed();
            return Err(e.into());
        }
        Ok(())
    }

    /// Mark closed and close the write half.
    pub async fn shutdown(&self) {
        self.mark_closed();
        let mut writer = self.writer.lock().await;
        let _ = writer.close().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
