// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Caller-supplied observer hooks. Passed in once at construction time
//! (see the design note on cyclic references) rather than having the
//! session hold a reference back to itself.

use std::sync::Arc;

use crate::{protocol::navigator::NavigatorRoom, session::state::SessionStatus};

pub type StatusCallback = Arc<dyn Fn(SessionStatus) + Send + Sync>;
pub type MuteCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type NavigatorCallback = Arc<dyn Fn(Vec<NavigatorRoom>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Observers {
    pub on_status: Option<StatusCallback>,
    pub on_mute: Option<MuteCallback>,
    pub on_navigator: Option<NavigatorCallback>,
}

impl Observers {
    pub fn notify_status(&self, status: SessionStatus) {
        if let Some(cb) = &self.on_status {
            cb(status);
        }
    }

    pub fn notify_mute(&self, formatted: String) {
        if let Some(cb) = &self.on_mute {
            cb(formatted);
        }
    }

    pub fn notify_navigator(&self, rooms: Vec<NavigatorRoom>) {
        if let Some(cb) = &self.on_navigator {
            cb(rooms);
        }
    }
}
