//! Interceptable call-site registry and composition dispatcher.
//!
//! This module provides [`HookRegistry`], the shared table that lets multiple
//! independent components attach Before/After/Replace observers to the same
//! target operation and have them dispatched in a reproducible total order.
//!
//! # Registry Architecture
//!
//! The registry uses a two-index design:
//!
//! - **Primary store**: a lock-free `SkipMap` from [`TargetId`] to call-site
//!   state, traversed on every invocation without blocking writers.
//! - **Handle index**: a concurrent `DashMap` from [`HookId`] to the target
//!   it is registered under, used to resolve registrations independently of
//!   the handle the caller holds.
//!
//! Each call site owns its ordered observer list behind a scoped `RwLock`.
//! The lock is exclusive only around attach/detach mutations; an invocation
//! takes the read side just long enough to clone a snapshot of the list.
//!
//! # Ordering Guarantees
//!
//! Observers of one kind run in ascending order key, ties broken by
//! registration order. Replacements nest with the latest-registered one
//! outermost. Detaching never reorders survivors; a full detach followed by a
//! re-attach places the observer as if it were registered for the first time.
//!
//! # Thread Safety
//!
//! All operations take `&self`. Attach, detach and invoke may run
//! concurrently from any number of threads; an invocation snapshots its
//! observer list at entry, so a registration change racing with an in-flight
//! invocation applies only to subsequent invocations.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use callweave::registry::{BeforeFn, HookRegistry};
//! use callweave::TargetId;
//!
//! let registry: HookRegistry<Vec<i32>, i32> = HookRegistry::new();
//! let target = TargetId::new(0x0600_0001);
//!
//! let double_first: BeforeFn<Vec<i32>> = Arc::new(|args| {
//!     args[0] *= 2;
//!     Ok(())
//! });
//! registry.attach_before(target, double_first)?;
//!
//! let sum = registry.invoke(target, &mut vec![21, 1], |args| {
//!     Ok(args.iter().sum())
//! })?;
//! assert_eq!(sum, 43);
//! # Ok::<(), callweave::Error>(())
//! ```

mod callsite;

pub use callsite::{AfterFn, BeforeFn, CoreBehavior, ReplaceFn};

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::error::{BoxError, Error, Result};
use crate::hook::{HookId, HookKind, RegistrationHandle};
use crate::target::TargetId;
use callsite::{run_replace_chain, CallSite, SiteCallback};

/// Registry of interceptable call sites, generic over the call signature.
///
/// `A` is the argument bundle every target behind this registry accepts and
/// `R` the result every target produces. Hosts with heterogeneous signatures
/// keep one registry per signature family, or use the dynamically typed
/// process-wide default in [`crate::global`].
///
/// The registry is explicit, caller-constructed state: collaborators receive
/// it by reference. Nothing in the dispatch logic assumes a singleton.
pub struct HookRegistry<A, R> {
    /// Primary store, keyed by target identity.
    sites: SkipMap<TargetId, Arc<CallSite<A, R>>>,
    /// Secondary index resolving a registration to its target.
    index: DashMap<HookId, TargetId>,
}

impl<A: 'static, R: 'static> HookRegistry<A, R> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        HookRegistry {
            sites: SkipMap::new(),
            index: DashMap::new(),
        }
    }

    /// Attaches a Before observer with the default order key `0`.
    ///
    /// Creates the call site if this is the first observer on `target`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] if this exact callback
    /// instance is already attached to `target` as Before with order `0`.
    pub fn attach_before(&self, target: TargetId, observer: BeforeFn<A>) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::Before, 0, SiteCallback::Before(observer))
    }

    /// Attaches a Before observer with an explicit order key.
    ///
    /// Lower keys run earlier; observers sharing a key run in registration
    /// order.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_before_ordered(
        &self,
        target: TargetId,
        observer: BeforeFn<A>,
        order: i32,
    ) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::Before, order, SiteCallback::Before(observer))
    }

    /// Attaches an After observer with the default order key `0`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_after(&self, target: TargetId, observer: AfterFn<A, R>) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::After, 0, SiteCallback::After(observer))
    }

    /// Attaches an After observer with an explicit order key.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_after_ordered(
        &self,
        target: TargetId,
        observer: AfterFn<A, R>,
        order: i32,
    ) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::After, order, SiteCallback::After(observer))
    }

    /// Attaches a Replace observer with the default order key `0`.
    ///
    /// The replacement supersedes the core behavior and becomes the core for
    /// replacements registered after it: the latest-registered replacement
    /// wraps outermost. Pass-through requires explicitly calling the core
    /// argument handed to the callback.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_replace(
        &self,
        target: TargetId,
        observer: ReplaceFn<A, R>,
    ) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::Replace, 0, SiteCallback::Replace(observer))
    }

    /// Attaches a Replace observer with an explicit order key.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_replace_ordered(
        &self,
        target: TargetId,
        observer: ReplaceFn<A, R>,
        order: i32,
    ) -> Result<RegistrationHandle> {
        self.attach(target, HookKind::Replace, order, SiteCallback::Replace(observer))
    }

    /// Removes a registration.
    ///
    /// Safe to call while invocations of the same target are in flight on
    /// other threads: those keep their entry-time snapshot, and only
    /// subsequent invocations see the removal. Detaching the last observer
    /// destroys the call site.
    ///
    /// # Errors
    /// Returns [`Error::UnknownTarget`] if no call site exists for the
    /// handle's target, or [`Error::StaleHandle`] if the registration was
    /// already removed.
    pub fn detach(&self, handle: RegistrationHandle) -> Result<()> {
        let target = handle.target();
        let site = match self.sites.get(&target) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Err(Error::UnknownTarget(target)),
        };

        let mut hooks = site
            .hooks()
            .write()
            .map_err(|e| Error::LockError(format!("call site hook list write: {e}")))?;
        if !hooks.remove(handle.hook()) {
            return Err(Error::StaleHandle {
                target,
                hook: handle.hook(),
            });
        }
        self.index.remove(&handle.hook());
        if hooks.is_empty() {
            // Retire-then-unlink; attach re-checks the flag under the write
            // lock, so no registration can land on the dying site.
            site.retired().store(true, Ordering::Release);
            drop(hooks);
            self.sites.remove(&target);
        }
        Ok(())
    }

    /// Invokes a target through its interception chain.
    ///
    /// `original` is the target's core behavior, supplied by the host at the
    /// call seam. Dispatch order per invocation:
    ///
    /// 1. the observer list is snapshotted (registration changes racing with
    ///    this invocation apply only to later invocations);
    /// 2. Before observers run in `(order, seq)` order, fail-fast;
    /// 3. the replacement chain runs, innermost being `original` — with no
    ///    replacements attached, `original` runs directly;
    /// 4. After observers run in `(order, seq)` order over the committed
    ///    result, fail-fast.
    ///
    /// Invoking a target with no call site is not an error: the call falls
    /// through to `original` untouched.
    ///
    /// # Errors
    /// [`Error::Observer`] if an observer fails (remaining observers of that
    /// kind are skipped), [`Error::Original`] if the core behavior fails,
    /// [`Error::LockError`] if the observer list lock is poisoned.
    pub fn invoke<F>(&self, target: TargetId, args: &mut A, mut original: F) -> Result<R>
    where
        F: FnMut(&mut A) -> std::result::Result<R, BoxError>,
    {
        let snapshot = match self.sites.get(&target) {
            Some(entry) => entry.value().snapshot()?,
            None => Vec::new(),
        };

        for entry in &snapshot {
            if let SiteCallback::Before(callback) = &entry.callback {
                callback(args)
                    .map_err(|e| Error::observer_failure(target, HookKind::Before, entry.id, e))?;
            }
        }

        let chain: Vec<(HookId, ReplaceFn<A, R>)> = snapshot
            .iter()
            .filter_map(|entry| match &entry.callback {
                SiteCallback::Replace(callback) => Some((entry.id, Arc::clone(callback))),
                _ => None,
            })
            .collect();
        let mut result = run_replace_chain(target, &chain, args, &mut original)?;

        for entry in &snapshot {
            if let SiteCallback::After(callback) = &entry.callback {
                callback(args, &mut result)
                    .map_err(|e| Error::observer_failure(target, HookKind::After, entry.id, e))?;
            }
        }

        Ok(result)
    }

    /// Returns true if `target` currently has a call site
    #[must_use]
    pub fn is_registered(&self, target: TargetId) -> bool {
        self.sites.contains_key(&target)
    }

    /// Resolves a registration to the target it is attached to, if it still exists
    #[must_use]
    pub fn target_of(&self, hook: HookId) -> Option<TargetId> {
        self.index.get(&hook).map(|entry| *entry.value())
    }

    /// Number of observers currently attached to `target`, zero if unregistered.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the observer list lock is poisoned.
    pub fn observer_count(&self, target: TargetId) -> Result<usize> {
        match self.sites.get(&target) {
            Some(entry) => {
                let hooks = entry
                    .value()
                    .hooks()
                    .read()
                    .map_err(|e| Error::LockError(format!("call site hook list read: {e}")))?;
                Ok(hooks.len())
            }
            None => Ok(0),
        }
    }

    /// Number of live call sites
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// True if no call site is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    fn attach(
        &self,
        target: TargetId,
        kind: HookKind,
        order: i32,
        callback: SiteCallback<A, R>,
    ) -> Result<RegistrationHandle> {
        let id = HookId::next();
        loop {
            let site = {
                let entry = self
                    .sites
                    .get_or_insert_with(target, || Arc::new(CallSite::new()));
                Arc::clone(entry.value())
            };
            let mut hooks = site
                .hooks()
                .write()
                .map_err(|e| Error::LockError(format!("call site hook list write: {e}")))?;
            if site.retired().load(Ordering::Acquire) {
                // Lost the race against a detach that emptied this site;
                // the entry is gone from the map, start over.
                continue;
            }
            if hooks.insert(id, kind, order, callback.clone()).is_none() {
                return Err(Error::DuplicateRegistration {
                    target,
                    kind,
                    order,
                });
            }
            self.index.insert(id, target);
            return Ok(RegistrationHandle::new(target, id));
        }
    }
}

impl<A: 'static, R: 'static> Default for HookRegistry<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_before(log: Arc<std::sync::Mutex<Vec<&'static str>>>, name: &'static str) -> BeforeFn<u32> {
        Arc::new(move |_| {
            log.lock().map_err(|e| e.to_string())?.push(name);
            Ok(())
        })
    }

    #[test]
    fn test_invoke_unregistered_falls_through() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let result = registry
            .invoke(TargetId::new(1), &mut 20, |args| Ok(*args + 1))
            .unwrap();
        assert_eq!(result, 21);
    }

    #[test]
    fn test_before_order_keys_and_ties() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(2);
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        registry
            .attach_before_ordered(target, counter_before(log.clone(), "late"), 10)
            .unwrap();
        registry
            .attach_before_ordered(target, counter_before(log.clone(), "early"), -5)
            .unwrap();
        registry
            .attach_before_ordered(target, counter_before(log.clone(), "tie_a"), 0)
            .unwrap();
        registry
            .attach_before_ordered(target, counter_before(log.clone(), "tie_b"), 0)
            .unwrap();

        registry.invoke(target, &mut 0, |_| Ok(0)).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["early", "tie_a", "tie_b", "late"]
        );
    }

    #[test]
    fn test_duplicate_instance_rejected() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(3);
        let observer: BeforeFn<u32> = Arc::new(|_| Ok(()));

        registry.attach_before(target, observer.clone()).unwrap();
        let err = registry.attach_before(target, observer.clone()).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { .. }));

        // Same instance at a different order is a distinct registration.
        registry
            .attach_before_ordered(target, observer, 1)
            .unwrap();
        assert_eq!(registry.observer_count(target).unwrap(), 2);
    }

    #[test]
    fn test_detach_lifecycle_and_stale_handles() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(4);
        let observer: BeforeFn<u32> = Arc::new(|_| Ok(()));

        let handle = registry.attach_before(target, observer).unwrap();
        assert!(registry.is_registered(target));
        assert_eq!(registry.target_of(handle.hook()), Some(target));

        registry.detach(handle).unwrap();
        assert!(!registry.is_registered(target));
        assert_eq!(registry.target_of(handle.hook()), None);

        // Site is gone entirely, so a second detach reports UnknownTarget.
        let err = registry.detach(handle).unwrap_err();
        assert!(matches!(err, Error::UnknownTarget(t) if t == target));
    }

    #[test]
    fn test_detach_with_surviving_site_reports_stale() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(5);
        let a = registry.attach_before(target, Arc::new(|_| Ok(()))).unwrap();
        let _b = registry.attach_before(target, Arc::new(|_| Ok(()))).unwrap();

        registry.detach(a).unwrap();
        let err = registry.detach(a).unwrap_err();
        assert!(matches!(err, Error::StaleHandle { .. }));
        assert!(registry.is_registered(target));
    }

    #[test]
    fn test_replace_nesting_latest_outermost() {
        let registry: HookRegistry<Vec<&'static str>, u32> = HookRegistry::new();
        let target = TargetId::new(6);

        let first: ReplaceFn<Vec<&'static str>, u32> = Arc::new(|args, core| {
            args.push("inner:enter");
            let result = core(args)?;
            args.push("inner:exit");
            Ok(result + 1)
        });
        let second: ReplaceFn<Vec<&'static str>, u32> = Arc::new(|args, core| {
            args.push("outer:enter");
            let result = core(args)?;
            args.push("outer:exit");
            Ok(result * 10)
        });
        registry.attach_replace(target, first).unwrap();
        registry.attach_replace(target, second).unwrap();

        let mut trace = Vec::new();
        let result = registry
            .invoke(target, &mut trace, |args| {
                args.push("core");
                Ok(5)
            })
            .unwrap();

        // Latest-registered replacement wraps outermost: (5 + 1) * 10.
        assert_eq!(result, 60);
        assert_eq!(
            trace,
            vec![
                "outer:enter",
                "inner:enter",
                "core",
                "inner:exit",
                "outer:exit"
            ]
        );
    }

    #[test]
    fn test_replace_can_suppress_original() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(7);
        let core_runs = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let short_circuit: ReplaceFn<u32, u32> = Arc::new(|_, _| Ok(99));
        registry.attach_replace(target, short_circuit).unwrap();

        let runs = Arc::clone(&core_runs);
        let result = registry
            .invoke(target, &mut 0, move |_| {
                runs.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            })
            .unwrap();

        assert_eq!(result, 99);
        assert_eq!(core_runs.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_failing_before_aborts_rest_of_kind() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(8);
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        registry
            .attach_before_ordered(target, counter_before(log.clone(), "ran"), 0)
            .unwrap();
        registry
            .attach_before_ordered(
                target,
                Arc::new(|_| Err("before failed".into())),
                1,
            )
            .unwrap();
        registry
            .attach_before_ordered(target, counter_before(log.clone(), "skipped"), 2)
            .unwrap();

        let err = registry.invoke(target, &mut 0, |_| Ok(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::Observer {
                kind: HookKind::Before,
                ..
            }
        ));
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
    }

    #[test]
    fn test_after_sees_and_adjusts_result() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(9);

        let adjust: AfterFn<u32, u32> = Arc::new(|args, result| {
            *result += *args;
            Ok(())
        });
        registry.attach_after(target, adjust).unwrap();

        let result = registry.invoke(target, &mut 7, |_| Ok(100)).unwrap();
        assert_eq!(result, 107);
    }

    #[test]
    fn test_original_failure_is_contextualized() {
        let registry: HookRegistry<u32, u32> = HookRegistry::new();
        let target = TargetId::new(10);
        registry
            .attach_before(target, Arc::new(|_| Ok(())))
            .unwrap();

        let err = registry
            .invoke(target, &mut 0, |_| Err("core blew up".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Original { target: t, .. } if t == target));
    }
}
