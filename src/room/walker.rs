// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Destination selection for the background random-walk task. The task
//! loop itself (sleep, send, check cancellation) lives in
//! `session::connection` since it needs the session's send path; this
//! module keeps the pure "where to walk next" decision testable without
//! a runtime.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rand::{Rng, RngExt};

use crate::{cfg::enums::WalkMode, room::geometry::RoomGeometry};

/// Cooperative stop flag shared between the spawner and the walker task.
#[derive(Clone, Default)]
pub struct WalkerHandle {
    stop: Arc<AtomicBool>,
}

impl WalkerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Picks the next destination for the given mode. Room-aware mode returns
/// `None` when there is nothing walkable (geometry not loaded, or no
/// walkable tile at all) rather than sending a no-op move.
pub fn pick_destination(
    mode: WalkMode,
    geometry: &RoomGeometry,
    rng: &mut impl Rng,
) -> Option<(i32, i32)> {
    match mode {
        WalkMode::Blind => Some((rng.random_range(0..=49), rng.random_range(0..=49))),
        WalkMode::RoomAware => {
            if !geometry.is_valid() {
                return None;
            }
            let tiles = geometry.walkable_tiles();
            if tiles.is_empty() {
                return None;
            }
            let idx = rng.random_range(0..tiles.len());
            Some(tiles[idx])
        },
    }
}
