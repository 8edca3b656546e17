// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The first-login flow: pick a random look, pick a throwaway nickname,
//! and drop into the starter room. Triggered once, the first time the
//! bot's own profile name still looks like a server-assigned default.

use rand::{Rng, RngExt};

use crate::cfg::enums::Gender;

/// Words mixed into generated nicknames; meme/pop-culture flavored, same
/// spirit as the original word list but without anything tied to a real
/// person.
const NICK_WORDS: &[&str] = &[
    "Doge", "Pepe", "Wojak", "Doomer", "Zoomer", "Boomer", "Shrek", "Thanos", "Joker", "Gotham",
    "Wayne", "Stark", "Vader", "Yoda", "Sonic", "Sanic", "Knuckles", "Goku", "Vegeta", "Naruto",
    "Sasuke", "Luffy", "Zoro", "Nami", "Walter", "Jesse", "Saul", "Gus", "Mike", "Based", "Cringe",
    "Epic", "Dark", "Lil", "Big", "Yung", "Sigma", "Alpha", "Beta", "Omega", "Giga", "Chad",
    "Stacy", "Karen", "Kyle", "Lord", "King", "God", "Demon", "Angel", "Saint", "Slayer", "Hunter",
    "Master", "Wizard", "Goblin", "Gremlin", "Rat", "Toxic", "Salty", "Sweaty", "Tryhard", "Noob",
    "Pro", "Hacker", "Bot", "Crypto", "Moon", "Mars", "Linux", "Python", "Coder", "Dev",
];

const NICK_MAX_LEN: usize = 15;

/// Picks two words and a random number and glues them together, e.g.
/// `Doge420Chad`. Falls back to a single-digit number, then to a hard
/// truncation, to respect the server's 15-character name limit.
pub fn generate_nickname(rng: &mut impl Rng) -> String {
    let part1 = NICK_WORDS[rng.random_range(0..NICK_WORDS.len())];
    let part2 = NICK_WORDS[rng.random_range(0..NICK_WORDS.len())];

    let mut nick = format!("{part1}{}{part2}", rng.random_range(10..=999));
    if nick.len() > NICK_MAX_LEN {
        nick = format!("{part1}{}{part2}", rng.random_range(1..=9));
    }
    if nick.len() > NICK_MAX_LEN {
        nick.truncate(NICK_MAX_LEN);
    }
    nick
}

/// Picks a uniformly random gender.
pub fn random_gender(rng: &mut impl Rng) -> Gender {
    if rng.random_bool(0.5) { Gender::Male } else { Gender::Female }
}

/// True when a just-received self profile name still looks like a
/// server-assigned placeholder, the signal the original bot used to
/// decide whether to run the new-user flow. Flagged in the design notes
/// as a fragile heuristic worth revisiting, not a pattern to copy
/// elsewhere.
pub fn looks_like_default_name(name: &str) -> bool {
    name.to_lowercase().contains("habb")
}
