//! A tiny generic state-machine driver: each state is a small struct with
//! a `step()`, and a loop drives `Transition` values until the machine is
//! `Done`. Used by the handshake engine to express its fixed sequence as
//! discrete, individually testable states instead of one long function.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod common;
