use thiserror::Error;

use crate::hook::{HookId, HookKind};
use crate::target::TargetId;

/// The error type observers and core behaviors may fail with.
///
/// Callbacks registered with the dispatcher are host code; the dispatcher
/// cannot know their failure modes, so it accepts any boxed error and wraps
/// it with context identifying which registration failed.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur during hook registration,
/// call-site dispatch, and resumable-computation stepping. Each variant provides specific
/// context about the failure mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Registration Errors
/// - [`Error::DuplicateRegistration`] - Same observer instance attached twice with identical kind and order
/// - [`Error::UnknownTarget`] - Detach referenced a target with no registry entry
/// - [`Error::StaleHandle`] - Detach referenced a registration that was already removed
///
/// ## Dispatch Errors
/// - [`Error::Observer`] - An observer callback failed during dispatch
/// - [`Error::Original`] - The host-supplied core behavior failed during invocation
/// - [`Error::Producer`] - A wrapped resumable computation failed during a resume step
///
/// ## Synchronization Errors
/// - [`Error::LockError`] - A hook list lock was poisoned by a panicking thread
///
/// # Failure Semantics
///
/// Observer failures are fail-fast: the first failing observer of a kind aborts the
/// remaining observers of that kind for that invocation, and the error propagates to
/// the invoker. No error is silently swallowed and nothing is retried — interception
/// is not a retryable operation. Completion of a resumable computation is *not* an
/// error; it is reported as a normal `Ok(false)` from a resume step.
#[derive(Error, Debug)]
pub enum Error {
    /// The same observer instance was attached twice with identical kind and order.
    ///
    /// Attaching the *same* callback instance (pointer identity) to one target with
    /// the same kind and the same order key is an idempotency violation. Attaching
    /// the same instance with a different kind or order, or attaching a distinct
    /// instance with identical kind and order, always succeeds.
    #[error("Observer is already attached to target {target} as {kind} with order {order}")]
    DuplicateRegistration {
        /// The call site the duplicate attach was directed at
        target: TargetId,
        /// The interception kind of the duplicate registration
        kind: HookKind,
        /// The order key of the duplicate registration
        order: i32,
    },

    /// A detach referenced a target with no registry entry.
    ///
    /// Note that *invoking* an unregistered target is not an error: the invocation
    /// falls through to the supplied original behavior with no interception.
    #[error("Target {0} has no registered call site")]
    UnknownTarget(TargetId),

    /// A detach referenced a registration that no longer exists under its target.
    ///
    /// The call site is known, but the handle's registration was already removed.
    /// Detach is not idempotent; a second detach of the same handle lands here.
    #[error("Registration {hook} was already removed from target {target}")]
    StaleHandle {
        /// The call site the handle points at
        target: TargetId,
        /// The registration that no longer exists
        hook: HookId,
    },

    /// An observer callback failed during dispatch.
    ///
    /// Wraps the observer's own error with context identifying which observer and
    /// kind failed. Raised for Before/After/Replace observers at a call site and
    /// for per-step observers during a resume step.
    #[error("Observer {hook} ({kind}) on target {target} failed: {source}")]
    Observer {
        /// The call site being dispatched when the observer failed
        target: TargetId,
        /// The interception kind of the failing observer
        kind: HookKind,
        /// The registration identity of the failing observer
        hook: HookId,
        /// The observer's underlying error
        #[source]
        source: BoxError,
    },

    /// The host-supplied original behavior failed during an invocation.
    ///
    /// Distinct from [`Error::Observer`]: the interception machinery ran fine,
    /// the intercepted operation itself failed.
    #[error("Original behavior of target {target} failed: {source}")]
    Original {
        /// The call site whose core behavior failed
        target: TargetId,
        /// The core behavior's underlying error
        #[source]
        source: BoxError,
    },

    /// A wrapped resumable computation failed while being resumed.
    ///
    /// Distinct from [`Error::Observer`]: the failure came out of the producer
    /// being stepped, not out of a per-step observer.
    #[error("Resumable computation for step site {target} failed: {source}")]
    Producer {
        /// The synthetic resume-step call site
        target: TargetId,
        /// The producer's underlying error
        #[source]
        source: BoxError,
    },

    /// A lock was poisoned by a thread that panicked while holding it.
    #[error("LockError - {0}")]
    LockError(String),
}

impl Error {
    /// Wraps a callback failure as [`Error::Observer`], unless the failure already
    /// is a crate [`Error`] propagating out of a nested dispatch level — those pass
    /// through unchanged so the innermost context wins.
    pub(crate) fn observer_failure(
        target: TargetId,
        kind: HookKind,
        hook: HookId,
        source: BoxError,
    ) -> Self {
        match source.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(source) => Error::Observer {
                target,
                kind,
                hook,
                source,
            },
        }
    }

    /// Wraps a core-behavior failure as [`Error::Original`], with the same
    /// pass-through rule for nested crate errors.
    pub(crate) fn original_failure(target: TargetId, source: BoxError) -> Self {
        match source.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(source) => Error::Original { target, source },
        }
    }

    /// Wraps a producer failure as [`Error::Producer`], with the same
    /// pass-through rule for nested crate errors.
    pub(crate) fn producer_failure(target: TargetId, source: BoxError) -> Self {
        match source.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(source) => Error::Producer { target, source },
        }
    }
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;
