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

//! The store-facing listener: accepts store connections, decodes request frames and hands them to
//! dispatch. Nothing is ever written back from here; responses come from the requests themselves.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use storelink_common::{RequestEnvelope, RequestError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::requests::{ActiveRequest, ServiceContext, dispatch};
use crate::transport::{Connection, WireError, decode_frame};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

pub struct RequestListener {
    context: Arc<ServiceContext>,
    max_frame_length: usize,
}

impl RequestListener {
    pub fn new(context: Arc<ServiceContext>, max_frame_length: usize) -> Self {
        Self {
            context,
            max_frame_length,
        }
    }

    /// Accept store connections until `shutdown` fires. One task per connection.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), eyre::Report> {
        info!(addr = ?listener.local_addr()?, "Listening for store connections");
        loop {
            select! {
                _ = shutdown.cancelled() => {
                    info!("Request listener stopping");
                    return Ok(());
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!(?addr, "Accepted store connection");
                            let this = self.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                this.handle_stream(stream, peer_name(addr), shutdown).await;
                            });
                        }
                        Err(e) => {
                            warn!(?e, "Accept failed, can't handle connection");
                        }
                    }
                }
            }
        }
    }

    /// Read frames off one store connection until it ends. Requests started from it keep
    /// running; they notice the connection is gone on their next tick.
    pub async fn handle_stream<S>(&self, stream: S, peer: String, shutdown: CancellationToken)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(self.max_frame_length));
        let (sink, mut lines) = framed.split();
        let connection = Arc::new(Connection::from_sink(peer, sink));

        loop {
            let line = select! {
                _ = shutdown.cancelled() => break,
                line = lines.next() => line,
            };
            match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = self.handle_frame(&connection, &line) {
                        warn!(peer = %connection.peer(), error = %e, "Rejected store frame");
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!(
                        peer = %connection.peer(),
                        max = self.max_frame_length,
                        "Store frame too long, dropping connection"
                    );
                    break;
                }
                Some(Err(e)) => {
                    debug!(peer = %connection.peer(), error = %e, "Store connection read failed");
                    break;
                }
                None => break,
            }
        }

        connection.mark_closed();
        info!(peer = %connection.peer(), "Store connection closed");
    }

    /// Decode, validate and dispatch one frame.
    pub fn handle_frame(
        &self,
        connection: &Arc<Connection>,
        line: &str,
    ) -> Result<ActiveRequest, FrameError> {
        let value = decode_frame(self.context.encryption_key.as_deref(), line)?;
        let envelope = RequestEnvelope::from_value(value)?;
        Ok(dispatch(&self.context, connection, envelope)?)
    }
}

fn peer_name(addr: SocketAddr) -> String {
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use storelink_common::Principal;
    use tokio::time::sleep;

    use crate::requests::PollerSettings;
    use crate::testing::{FakeRegistry, RegistryEvent, connection_pair};
    use crate::transport::{WireKey, encode_frame};

    const ANN: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn listener(registry: &Arc<FakeRegistry>, key: Option<Arc<WireKey>>) -> RequestListener {
        let context = Arc::new(ServiceContext::new(
            registry.clone(),
            key,
            PollerSettings::default(),
        ));
        RequestListener::new(context, 1024)
    }

    fn request(request_id: i64) -> serde_json::Value {
        json!({
            "protocol_version": 1,
            "request_id": request_id,
            "request_type": "authentication",
            "data": {"player_name": "Ann", "player_uuid": ANN},
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_plaintext_frame_dispatches() {
        let registry = Arc::new(FakeRegistry::new());
        let listener = listener(&registry, None);
        let (connection, _peer) = connection_pair();

        let line = encode_frame(None, &request(4)).unwrap();
        let active = listener.handle_frame(&connection, &line).unwrap();
        assert_eq!(active.header().request_id, 4);
        assert!(listener.context.requests.contains(4));
        active.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_errors() {
        let registry = Arc::new(FakeRegistry::new());
        let key = Arc::new(WireKey::generate());
        let listener = listener(&registry, Some(key.clone()));
        let (connection, _peer) = connection_pair();

        // Plaintext where ciphertext is expected.
        let plain = encode_frame(None, &request(1)).unwrap();
        assert!(matches!(
            listener.handle_frame(&connection, &plain),
            Err(FrameError::Wire(_))
        ));

        // Sealed for someone else.
        let stranger = WireKey::generate();
        let foreign = encode_frame(Some(&stranger), &request(1)).unwrap();
        assert!(matches!(
            listener.handle_frame(&connection, &foreign),
            Err(FrameError::Wire(WireError::Decryption(_)))
        ));

        let mut unknown = request(2);
        unknown["request_type"] = json!("refund");
        let unknown = encode_frame(Some(&key), &unknown).unwrap();
        assert!(matches!(
            listener.handle_frame(&connection, &unknown),
            Err(FrameError::Request(RequestError::UnknownRequestType(t))) if t == "refund"
        ));
        assert!(listener.context.requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_end_marks_connection_closed() {
        let registry = Arc::new(FakeRegistry::new());
        registry.add(Principal::new(ANN.parse().unwrap(), "Ann"), false);
        let listener = Arc::new(listener(&registry, None));

        let (ours, theirs) = tokio::io::duplex(4096);
        let task = {
            let listener = listener.clone();
            tokio::spawn(async move {
                listener
                    .handle_stream(ours, "duplex".to_string(), CancellationToken::new())
                    .await
            })
        };

        let mut store = Framed::new(theirs, LinesCodec::new());
        futures_util::SinkExt::send(&mut store, encode_frame(None, &request(8)).unwrap())
            .await
            .unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert!(listener.context.requests.contains(8));

        drop(store);
        task.await.unwrap();
        // The poll gives up on its next tick.
        sleep(Duration::from_secs(1)).await;
        assert!(listener.context.requests.is_empty());
        assert_eq!(
            registry.events(),
            vec![RegistryEvent::FlagSet(ANN.parse().unwrap(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_lines_do_not_end_the_stream() {
        let registry = Arc::new(FakeRegistry::new());
        let listener = Arc::new(listener(&registry, None));
        let (ours, theirs) = tokio::io::duplex(8192);
        let shutdown = CancellationToken::new();
        let task = {
            let listener = listener.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                listener
                    .handle_stream(ours, "duplex".to_string(), shutdown)
                    .await
            })
        };

        let mut store = Framed::new(theirs, LinesCodec::new());
        for line in [
            "not json".to_string(),
            String::new(),
            encode_frame(None, &request(10)).unwrap(),
        ] {
            futures_util::SinkExt::send(&mut store, line).await.unwrap();
        }
        sleep(Duration::from_millis(100)).await;
        assert!(listener.context.requests.contains(10));

        shutdown.cancel();
        task.await.unwrap();
        listener.context.requests.close_all().await;
        assert!(listener.context.requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_frame_drops_connection() {
        let registry = Arc::new(FakeRegistry::new());
        let listener = listener(&registry, None);
        let (ours, theirs) = tokio::io::duplex(8192);

        let mut store = Framed::new(theirs, LinesCodec::new());
        futures_util::SinkExt::send(&mut store, "x".repeat(2048))
            .await
            .unwrap();
        // Returns without the store hanging up.
        listener
            .handle_stream(ours, "duplex".to_string(), CancellationToken::new())
            .await;
        assert!(listener.context.requests.is_empty());
    }
}
