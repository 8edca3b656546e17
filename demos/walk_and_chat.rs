// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Connects, joins a room, wanders it for a while shouting a greeting, then
//! disconnects. Run with:
//!
//! ```text
//! cargo run --bin walk_and_chat -- <room_id> <sso_ticket>
//! ```
//!
//! `ROOMWALKER_CONFIG` and `ROOMWALKER_LOGGER_CONFIG` override the default
//! `config.example.yaml` / `logger.example.yaml` paths.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use roomwalker_core::{
    cfg::{cli::resolve_config_path, config::Config, enums::WalkMode, logger::init_logger},
    session::{connection::Session, observers::Observers},
};
use tokio::time::sleep;
use tracing::info;

const WANDER_DURATION: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let logger_path =
        std::env::var("ROOMWALKER_LOGGER_CONFIG").unwrap_or_else(|_| "logger.example.yaml".into());
    let _guard = init_logger(&logger_path)?;

    let mut args = std::env::args().skip(1);
    let room_id: i32 = args
        .next()
        .context("usage: walk_and_chat <room_id> <sso_ticket>")?
        .parse()
        .context("room_id must be an integer")?;
    let ticket = args.next().context("usage: walk_and_chat <room_id> <sso_ticket>")?;

    let config_path =
        std::env::var("ROOMWALKER_CONFIG").unwrap_or_else(|_| "config.example.yaml".into());
    let cfg = resolve_config_path(&config_path)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let session = Session::connect(cfg, ticket, Observers::default())
        .await
        .context("handshake failed")?;
    info!("authenticated");

    session.join_room(room_id).await.context("join_room failed")?;
    session.wait_for_room().await;
    info!(room_id, "room entered");

    session.shout("Hello from roomwalker-core!", 0).await?;
    session.walk_random(WalkMode::RoomAware).await;

    sleep(WANDER_DURATION).await;

    session.stop_random_walk().await;
    let status = session.status().await;
    if status.is_terminal() {
        bail!("session ended unexpectedly: {status:?}");
    }

    session.quit_room().await?;
    session.shutdown();
    info!("done");
    Ok(())
}
