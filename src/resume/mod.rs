//! Observation of resumable computations, one resume step at a time.
//!
//! A resumable computation is a producer of a sequence of values: each resume
//! call either yields the next value or signals completion, and the producer
//! retains its position between calls. Intercepting the *factory* that
//! creates such a producer observes only a single call — the one returning
//! the handle — and none of the work, which happens across the subsequent
//! resume calls. This module attaches interception to the steps themselves.
//!
//! # Key Components
//!
//! - [`Resumable`] - The uniform three-operation producer contract
//!   (`resume`, `current`, `dispose`) the adapter is implemented against,
//!   regardless of the producer's origin
//! - [`IterProducer`] - Gives any [`Iterator`] the `Resumable` contract
//! - [`StepHooks`] - A synthetic call site for resume steps, carrying
//!   per-step Before/After observers and whole-wrap replacements
//! - [`StepAdapter`] - The wrapped handle: delegates each resume to the
//!   original producer, dispatching step observers around it
//! - [`wrap_factory`] - Lifts a producer factory into one returning wrapped
//!   handles
//!
//! # Granularities
//!
//! Three levels of control, from cheapest to most powerful:
//!
//! - **Per-step Before**: runs ahead of each resume call, while the
//!   produced-value slot is still unpopulated.
//! - **Per-step After**: runs once per *successful* resume and receives the
//!   committed value; never runs for the resume that signals completion.
//! - **Whole-wrap**: replaces the resumption sequence wholesale. The
//!   replacement producer consumes the original at its own cadence — it may
//!   skip values, inject extra ones, stop early, or suppress completion — at
//!   the cost of correctly re-implementing a producer rather than observing
//!   one.
//!
//! # Concurrency
//!
//! Stepping is synchronous and call-stack-bound: every observer runs on the
//! thread calling [`StepAdapter::step`]. A handle supports one resume in
//! flight at a time (`step` takes `&mut self`); the hook set behind it is
//! shared state with the same snapshot-at-entry isolation as the call-site
//! registry.

mod adapter;
mod producer;

pub use adapter::{
    wrap_factory, AfterStepFn, BeforeStepFn, BoxResumable, StepAdapter, StepHooks, WrapFn,
};
pub use producer::IterProducer;

use crate::error::BoxError;

/// The uniform contract for a resumable computation.
///
/// Completion is a normal termination path, not an error: a producer that has
/// run out of values reports `Ok(false)` and keeps reporting it. The
/// compiled-state-machine shape many generators lower to (an integer state
/// field advanced by a resume method) is deliberately *not* part of this
/// contract — the adapter only ever needs the three capabilities below.
pub trait Resumable {
    /// The type of value produced on each successful resume.
    type Item;

    /// Advances the computation by one step.
    ///
    /// Returns `Ok(true)` if a value was produced (readable via
    /// [`current`](Resumable::current) until the next resume), `Ok(false)`
    /// if the computation completed.
    ///
    /// # Errors
    /// Whatever failure mode the underlying computation has; the adapter
    /// wraps it with step-site context.
    fn resume(&mut self) -> std::result::Result<bool, BoxError>;

    /// The produced-value slot: empty before the first successful resume and
    /// after completion, otherwise the value of the latest step.
    fn current(&self) -> Option<&Self::Item>;

    /// Releases the computation without running it to completion.
    ///
    /// Must be idempotent. The default does nothing, which suits producers
    /// whose state is plain owned data.
    fn dispose(&mut self) {}
}
