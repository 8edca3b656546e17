// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error taxonomy for the session core.
//!
//! Named, matchable variants live here so callers can branch on what kind
//! of failure happened (a ban, a timeout, a malformed handshake reply).
//! Everything else returns `anyhow::Result` with `.context(...)` chains.

use thiserror::Error;

/// Top-level failure reported to a caller driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("handshake error: {0}")]
    Handshake(String),

    #[error("socket i/o error: {0}")]
    SocketIo(#[from] std::io::Error),

    #[error("account banned: {reason}")]
    Ban { reason: String },

    #[error("authentication timed out waiting for server")]
    AuthTimeout,

    #[error("protocol error during handshake: {0}")]
    Protocol(String),
}

impl SessionError {
    /// True when this failure represents a confirmed ban, for callers that
    /// must not retry a banned account.
    pub fn is_ban(&self) -> bool {
        matches!(self, SessionError::Ban { .. })
    }
}
