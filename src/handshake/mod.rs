//! The fixed nine-step handshake: plaintext hello and DH exchange, cipher
//! installation, then the encrypted login triad and the bounded
//! authentication wait. Expressed as a small state machine in the same
//! shape used elsewhere in this crate (`state_machine::common`), one
//! marker struct per step.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod context;
pub mod states;

pub use context::{HandshakeCtx, HandshakeOutcome, run_handshake};
