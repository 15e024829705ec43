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

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Report, bail, eyre};
use mimalloc::MiMalloc;
use storelink_common::tracing;
use storelink_daemon::listen::RequestListener;
use storelink_daemon::presence::PresenceListener;
use storelink_daemon::principals::PrincipalRegistryMemory;
use storelink_daemon::requests::ServiceContext;
use storelink_daemon::transport::WireKey;
use tokio::net::TcpListener;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use ::tracing::{info, warn};

use crate::args::Args;

mod args;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn generate_key(key_file: Option<&Path>) -> Result<(), Report> {
    let key = WireKey::generate();
    let contents = format!(
        "# public key: {}\n{}\n",
        key.public_string(),
        key.to_secret_string()
    );
    match key_file {
        Some(path) => {
            if path.exists() {
                bail!("Refusing to overwrite existing key file {:?}", path);
            }
            std::fs::write(path, contents)?;
            info!(path = ?path, public_key = %key.public_string(), "Generated shared key");
        }
        None => print!("{contents}"),
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let args: Args = Args::parse();

    tracing::init_tracing(args.debug).map_err(|e| eyre!("Unable to configure logging: {}", e))?;

    let config = args.load_config()?;
    if args.generate_key {
        return generate_key(config.encryption.key_file.as_deref());
    }

    let encryption_key = match &config.encryption.key_file {
        Some(path) => {
            let key = WireKey::load(path)
                .map_err(|e| eyre!("Unable to load shared key from {:?}: {}", path, e))?;
            info!(path = ?path, public_key = %key.public_string(), "Loaded shared key");
            Some(Arc::new(key))
        }
        None => {
            warn!("No key file configured, store traffic will be sent in the clear");
            None
        }
    };

    let registry = Arc::new(PrincipalRegistryMemory::new());
    let context = Arc::new(ServiceContext::new(
        registry.clone(),
        encryption_key,
        config.authentication.poller_settings(),
    ));
    let shutdown = CancellationToken::new();

    let mut hup_signal = signal(SignalKind::hangup())?;
    let mut stop_signal = signal(SignalKind::interrupt())?;
    let mut term_signal = signal(SignalKind::terminate())?;

    let request_socket = TcpListener::bind(config.listen.requests).await?;
    let request_listener = Arc::new(RequestListener::new(
        context.clone(),
        config.max_frame_length,
    ));
    let request_loop = tokio::spawn(request_listener.serve(request_socket, shutdown.clone()));

    let presence_loop = match config.listen.presence {
        Some(addr) => {
            let presence_socket = TcpListener::bind(addr).await?;
            let presence_listener = Arc::new(PresenceListener::new(registry.clone()));
            Some(tokio::spawn(
                presence_listener.serve(presence_socket, shutdown.clone()),
            ))
        }
        None => None,
    };

    info!(
        requests = %config.listen.requests,
        presence = ?config.listen.presence,
        tick_interval = ?context.poller.tick_interval,
        tick_budget = context.poller.tick_budget,
        "Daemon started"
    );
    select! {
        _ = hup_signal.recv() => {
            info!("HUP received, stopping...");
        }
        _ = stop_signal.recv() => {
            info!("STOP received, stopping...");
        }
        _ = term_signal.recv() => {
            info!("TERM received, stopping...");
        }
    }

    shutdown.cancel();
    context.requests.close_all().await;
    request_loop.await??;
    if let Some(presence_loop) = presence_loop {
        presence_loop.await??;
    }
    info!("Done.");

    Ok(())
}
