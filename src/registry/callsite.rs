//! Per-target call-site state and the replacement composition chain.
//!
//! A call site is created when the first observer is attached to a target and
//! destroyed when the last one is detached. It owns a single ordered hook
//! list behind a scoped `RwLock`: attach and detach take the write lock only
//! around the list mutation, dispatch takes the read lock only long enough to
//! clone a snapshot. Concurrent invocations of the same target therefore
//! never serialize on each other or on registration changes.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use crate::error::{BoxError, Error, Result};
use crate::hook::list::{CallbackIdentity, HookEntry, HookList};
use crate::hook::{HookId, HookKind};
use crate::target::TargetId;

/// A Before observer: inspects and may mutate the arguments ahead of the core
/// behavior.
pub type BeforeFn<A> = Arc<dyn Fn(&mut A) -> std::result::Result<(), BoxError> + Send + Sync>;

/// An After observer: sees the arguments and may adjust the committed result.
pub type AfterFn<A, R> =
    Arc<dyn Fn(&A, &mut R) -> std::result::Result<(), BoxError> + Send + Sync>;

/// The behavior a Replace observer composes over: either the next replacement
/// inward, or the host-supplied original at the innermost level.
pub type CoreBehavior<'a, A, R> =
    dyn FnMut(&mut A) -> std::result::Result<R, BoxError> + 'a;

/// A Replace observer: supersedes the core behavior and receives the next
/// behavior in the chain, which it must call explicitly for pass-through.
pub type ReplaceFn<A, R> = Arc<
    dyn Fn(&mut A, &mut CoreBehavior<'_, A, R>) -> std::result::Result<R, BoxError> + Send + Sync,
>;

/// Tagged callback storage, one variant per interception kind.
///
/// Stored as a tagged variant over the ordered list rather than a trait
/// object hierarchy: the three kinds have three different call shapes, and
/// dispatch needs to partition by kind anyway.
pub(crate) enum SiteCallback<A, R> {
    Before(BeforeFn<A>),
    After(AfterFn<A, R>),
    Replace(ReplaceFn<A, R>),
}

impl<A, R> Clone for SiteCallback<A, R> {
    fn clone(&self) -> Self {
        match self {
            SiteCallback::Before(callback) => SiteCallback::Before(Arc::clone(callback)),
            SiteCallback::After(callback) => SiteCallback::After(Arc::clone(callback)),
            SiteCallback::Replace(callback) => SiteCallback::Replace(Arc::clone(callback)),
        }
    }
}

impl<A, R> CallbackIdentity for SiteCallback<A, R> {
    fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (SiteCallback::Before(a), SiteCallback::Before(b)) => Arc::ptr_eq(a, b),
            (SiteCallback::After(a), SiteCallback::After(b)) => Arc::ptr_eq(a, b),
            (SiteCallback::Replace(a), SiteCallback::Replace(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// State of one interceptable call site.
pub(crate) struct CallSite<A, R> {
    hooks: RwLock<HookList<SiteCallback<A, R>>>,
    /// Set under the write lock when the last observer is detached, before
    /// the site is unlinked from the registry. Attach re-checks the flag
    /// under the write lock so no registration can land on a dying site.
    retired: AtomicBool,
}

impl<A, R> CallSite<A, R> {
    pub(crate) fn new() -> Self {
        CallSite {
            hooks: RwLock::new(HookList::new()),
            retired: AtomicBool::new(false),
        }
    }

    pub(crate) fn hooks(&self) -> &RwLock<HookList<SiteCallback<A, R>>> {
        &self.hooks
    }

    pub(crate) fn retired(&self) -> &AtomicBool {
        &self.retired
    }

    /// Clones the observer list under a short read lock.
    pub(crate) fn snapshot(&self) -> Result<Vec<HookEntry<SiteCallback<A, R>>>> {
        let hooks = self
            .hooks
            .read()
            .map_err(|e| Error::LockError(format!("call site hook list read: {e}")))?;
        Ok(hooks.snapshot())
    }
}

/// Runs the replacement chain over the host-supplied original behavior.
///
/// `chain` holds the Replace registrations in `(order, seq)` order. The fold
/// direction makes the earliest-sorted replacement innermost (closest to the
/// original) and the latest-registered one outermost, so a newly attached
/// replacement wraps everything attached before it. A replacement that never
/// calls its core argument means nothing inward of it — including the
/// original — ever runs.
pub(crate) fn run_replace_chain<A, R>(
    target: TargetId,
    chain: &[(HookId, ReplaceFn<A, R>)],
    args: &mut A,
    original: &mut CoreBehavior<'_, A, R>,
) -> Result<R> {
    match chain.split_last() {
        None => original(args).map_err(|e| Error::original_failure(target, e)),
        Some(((hook, callback), inner)) => {
            let mut next = |a: &mut A| -> std::result::Result<R, BoxError> {
                run_replace_chain(target, inner, a, original).map_err(BoxError::from)
            };
            callback(args, &mut next)
                .map_err(|e| Error::observer_failure(target, HookKind::Replace, *hook, e))
        }
    }
}
