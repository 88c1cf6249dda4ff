// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::time::sleep;

use super::{
    config::Config,
    routing::{self, AppContext},
};

const WEB_SERVER_LISTENING_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Launching,
    Starting,
    Listening { socket_addr: SocketAddr },
    Stopping,
    Terminating,
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to await shutdown signal: {err}");
        // Keep running until the process gets killed
        std::future::pending::<()>().await;
    }
    log::info!("Received shutdown signal");
}

pub(crate) async fn run(
    config: Config,
    mut on_state_changed: impl FnMut(State),
) -> anyhow::Result<()> {
    let launched_at = Timestamp::now();

    log::info!("Launching");
    on_state_changed(State::Launching);

    let about_json = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "version": env!("CARGO_PKG_VERSION"),
        "instance": {
            "launched_at": launched_at,
            "config": config,
            "environment": {
                "current_dir": std::env::current_dir().unwrap_or_default(),
            },
        },
    });

    let socket_addr = config.network.endpoint.socket_addr();
    let context = Arc::new(AppContext::new(config));

    log::info!("Initializing server");
    let server = warp::serve(routing::create_service(context, about_json));

    log::info!("Starting");
    on_state_changed(State::Starting);

    let (socket_addr, server_listener) =
        server.try_bind_with_graceful_shutdown(socket_addr, shutdown_signal())?;

    // Give the server some time to become ready and start listening
    // before announcing the actual endpoint address, i.e. when using
    // an ephemeral port. Warp does not provide any signal when the
    // server has started listening.
    sleep(WEB_SERVER_LISTENING_DELAY).await;

    log::info!("Listening on {socket_addr}");
    on_state_changed(State::Listening { socket_addr });

    server_listener.await;

    log::info!("Stopping");
    on_state_changed(State::Stopping);

    log::info!("Terminating");
    on_state_changed(State::Terminating);

    Ok(())
}
