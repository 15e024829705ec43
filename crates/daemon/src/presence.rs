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

//! The game-facing presence feed. A game server keeps one line-oriented connection open and
//! reports who is online and who has confirmed a purchase:
//!
//! ```text
//! join <uuid> <name>
//! leave <uuid>
//! confirm <uuid>
//! ```
//!
//! Every command is answered with `ok` or `error: <reason>`. Messages for principals joined
//! through a connection are pushed back on it as `notify <uuid> <message>`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use storelink_common::{Principal, PrincipalId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::principals::{Notification, PresenceSession, PrincipalRegistryMemory};

const MAX_COMMAND_LENGTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceCommand {
    Join(Principal),
    Leave(PrincipalId),
    Confirm(PrincipalId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PresenceError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("invalid uuid: {0}")]
    InvalidId(String),
    #[error("unexpected trailing input: {0}")]
    TrailingInput(String),
}

fn parse_id(raw: Option<&str>) -> Result<PrincipalId, PresenceError> {
    let raw = raw.ok_or(PresenceError::MissingArgument("uuid"))?;
    raw.parse()
        .map_err(|_| PresenceError::InvalidId(raw.to_string()))
}

impl FromStr for PresenceCommand {
    type Err = PresenceError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();
        match verb.to_ascii_lowercase().as_str() {
            "join" => {
                let (id, name) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let id = parse_id(Some(id).filter(|s| !s.is_empty()))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(PresenceError::MissingArgument("name"));
                }
                Ok(PresenceCommand::Join(Principal::new(id, name)))
            }
            "leave" | "confirm" => {
                let mut args = rest.split_whitespace();
                let id = parse_id(args.next())?;
                if let Some(extra) = args.next() {
                    return Err(PresenceError::TrailingInput(extra.to_string()));
                }
                if verb.eq_ignore_ascii_case("leave") {
                    Ok(PresenceCommand::Leave(id))
                } else {
                    Ok(PresenceCommand::Confirm(id))
                }
            }
            _ => Err(PresenceError::UnknownCommand(verb.to_string())),
        }
    }
}

pub struct PresenceListener {
    registry: Arc<PrincipalRegistryMemory>,
}

impl PresenceListener {
    pub fn new(registry: Arc<PrincipalRegistryMemory>) -> Self {
        Self { registry }
    }

    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), eyre::Report> {
        info!(addr = ?listener.local_addr()?, "Listening for presence connections");
        loop {
            select! {
                _ = shutdown.cancelled() => {
                    info!("Presence listener stopping");
                    return Ok(());
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!(?addr, "Accepted presence connection");
                            let this = self.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                this.handle_stream(stream, addr, shutdown).await;
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

    /// Serve one presence connection. Every principal it joined goes offline when it ends.
    pub async fn handle_stream<S>(&self, stream: S, peer: SocketAddr, shutdown: CancellationToken)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (session, notifications) = PresenceSession::new();
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_COMMAND_LENGTH));

        loop {
            let reply = select! {
                _ = shutdown.cancelled() => break,
                Ok(Notification { principal, message }) = notifications.recv_async() => {
                    format!("notify {principal} {message}")
                }
                line = framed.next() => match line {
                    Some(Ok(line)) if line.trim().is_empty() => continue,
                    Some(Ok(line)) => self.apply(&session, &line),
                    Some(Err(e)) => {
                        debug!(?peer, error = %e, "Presence connection read failed");
                        break;
                    }
                    None => break,
                },
            };
            if let Err(e) = framed.send(reply).await {
                debug!(?peer, error = %e, "Presence connection write failed");
                break;
            }
        }

        let dropped = self.registry.leave_session(session.id());
        info!(?peer, dropped, "Presence connection closed");
    }

    fn apply(&self, session: &PresenceSession, line: &str) -> String {
        let command = match line.parse::<PresenceCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!(line, error = %e, "Rejected presence command");
                return format!("error: {e}");
            }
        };
        match command {
            PresenceCommand::Join(principal) => {
                self.registry.join(principal, session);
                "ok".to_string()
            }
            PresenceCommand::Leave(id) => {
                if self.registry.leave(id) {
                    "ok".to_string()
                } else {
                    format!("error: {id} is not online")
                }
            }
            PresenceCommand::Confirm(id) => {
                if self.registry.confirm(id) {
                    "ok".to_string()
                } else {
                    format!("error: {id} is not online")
                }
            }
        }
    }
}
