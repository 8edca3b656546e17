// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The fixed disconnect-reason code table (frame id `4000`). Unknown codes
//! surface as `"generic/unknown"` rather than failing the parse — the
//! server has been observed to add codes over time.

/// Human-readable meaning plus whether the code indicates a ban.
pub fn classify(code: i32) -> (&'static str, bool) {
    match code {
        -2 => ("maintenance break", false),
        0 => ("logged out", false),
        1 => ("banned (just)", true),
        10 => ("banned (still)", true),
        2 | 13 | 11 | 18 => ("concurrent login", false),
        12 | 19 => ("hotel closed", false),
        20 => ("incorrect password", false),
        112 => ("idle timeout", false),
        122 => ("incompatible client", false),
        _ => ("generic/unknown", false),
    }
}
