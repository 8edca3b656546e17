// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::future::Future;

/// Outcome of a single state's `step()`.
pub enum Transition<S, R> {
    /// Move to a new state, carrying an intermediate result.
    Next(S, R),
    /// Stay in the current state (used when a step is retried, e.g. a
    /// loop waiting for one more frame).
    Stay(R),
    /// The machine has finished; `R` is the final result.
    Done(R),
}

/// A single state in a state machine: advances `Ctx` by one step, handing
/// back either the next state (as the enum `S` that groups every state in
/// the machine) or a final result.
pub trait StateMachine<Ctx, S, R>: Sized {
    type StepResult<'a>: Future<Output = Transition<S, R>> + Send + 'a
    where
        Self: 'a,
        Ctx: 'a,
        R: 'a;

    fn step<'a>(self, ctx: &'a mut Ctx) -> Self::StepResult<'a>;
}
