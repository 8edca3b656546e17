//! Length-prefixed big-endian frame codec: the wire format shared by every
//! message in and out of the session.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod frame;
