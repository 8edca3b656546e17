// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Avatar gender, used to pick an appearance list during personalization.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "Male", alias = "male", alias = "M", alias = "m")]
    Male,
    #[serde(rename = "Female", alias = "female", alias = "F", alias = "f")]
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "M",
            Gender::Female => "F",
        })
    }
}

/// Whether the random walker should restrict destinations to tiles it has
/// confirmed are walkable, or walk blind over a fixed-size grid.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkMode {
    #[default]
    #[serde(rename = "RoomAware", alias = "room_aware", alias = "room-aware")]
    RoomAware,
    #[serde(rename = "Blind", alias = "blind")]
    Blind,
}
