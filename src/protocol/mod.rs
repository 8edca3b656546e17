//! Incoming-packet parsers and outgoing-packet composers for the game
//! protocol. Parsers are deliberately lenient (see `codec::frame::InFrame`)
//! so a schema drift in one field never takes down the whole dispatcher.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod composers;
pub mod disconnect;
pub mod navigator;
pub mod users;
