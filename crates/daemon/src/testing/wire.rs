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

//! In-memory stand-ins for a store socket.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::DuplexStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::transport::{Connection, WireKey, decode_frame};

/// The store's end of a [`connection_pair`].
pub struct StorePeer {
    framed: Framed<DuplexStream, LinesCodec>,
}

impl StorePeer {
    /// Next raw line, or None once our side has gone away.
    pub async fn next_line(&mut self) -> Option<String> {
        self.framed.next().await.and_then(Result::ok)
    }

    pub async fn next_json(&mut self, key: Option<&WireKey>) -> Option<Value> {
        let line = self.next_line().await?;
        decode_frame(key, &line).ok()
    }
}

/// A connection whose writes land on the returned peer.
pub fn connection_pair() -> (Arc<Connection>, StorePeer) {
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let connection = Connection::from_sink("duplex", Framed::new(ours, LinesCodec::new()));
    (
        Arc::new(connection),
        StorePeer {
            framed: Framed::new(theirs, LinesCodec::new()),
        },
    )
}
