//! The resume-step wrapping adapter.
//!
//! [`StepHooks`] plays the role of a call site for a *synthetic* target: not
//! the factory call that creates a producer, but the resume steps of the
//! producers it creates. [`StepAdapter`] is the wrapped handle — it fully
//! defers sequence bookkeeping to the producer it delegates to, which is why
//! its own control state collapses to exactly two values: "not yet started"
//! (the whole-wrap chain has not been applied) and "delegating to the
//! original".

use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::error::{BoxError, Error, Result};
use crate::hook::list::{CallbackIdentity, HookEntry, HookList};
use crate::hook::{HookId, HookKind, RegistrationHandle};
use crate::resume::Resumable;
use crate::target::TargetId;

/// A boxed producer, the currency of whole-wrap composition.
pub type BoxResumable<T> = Box<dyn Resumable<Item = T> + Send>;

/// A per-step Before observer: runs ahead of each resume call, while the
/// produced-value slot is still unpopulated.
pub type BeforeStepFn = Arc<dyn Fn() -> std::result::Result<(), BoxError> + Send + Sync>;

/// A per-step After observer: runs once per successful resume and reads the
/// committed value. Never runs for the resume that signals completion.
pub type AfterStepFn<T> = Arc<dyn Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync>;

/// A whole-wrap observer: consumes the producer it is handed and returns the
/// producer that replaces it. The replacement has unrestricted control over
/// the sequence — it may resume the original zero or more times, in any order
/// relative to its own output.
pub type WrapFn<T> = Arc<dyn Fn(BoxResumable<T>) -> BoxResumable<T> + Send + Sync>;

/// Tagged step-callback storage; whole-wraps carry the Replace kind.
pub(crate) enum StepCallback<T> {
    Before(BeforeStepFn),
    After(AfterStepFn<T>),
    Wrap(WrapFn<T>),
}

impl<T> StepCallback<T> {
    fn kind(&self) -> HookKind {
        match self {
            StepCallback::Before(_) => HookKind::Before,
            StepCallback::After(_) => HookKind::After,
            StepCallback::Wrap(_) => HookKind::Replace,
        }
    }
}

impl<T> Clone for StepCallback<T> {
    fn clone(&self) -> Self {
        match self {
            StepCallback::Before(callback) => StepCallback::Before(Arc::clone(callback)),
            StepCallback::After(callback) => StepCallback::After(Arc::clone(callback)),
            StepCallback::Wrap(callback) => StepCallback::Wrap(Arc::clone(callback)),
        }
    }
}

impl<T> CallbackIdentity for StepCallback<T> {
    fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (StepCallback::Before(a), StepCallback::Before(b)) => Arc::ptr_eq(a, b),
            (StepCallback::After(a), StepCallback::After(b)) => Arc::ptr_eq(a, b),
            (StepCallback::Wrap(a), StepCallback::Wrap(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The synthetic call site for resume steps of one producer family.
///
/// Caller-constructed and shared via `Arc`: the same hook set serves every
/// handle a wrapped factory creates. Registration semantics are identical to
/// the call-site registry — `(order, seq)` total order, pointer-identity
/// duplicate guard, detach never reorders survivors, snapshot-at-entry
/// isolation per step.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use callweave::resume::{IterProducer, Resumable, StepAdapter, StepHooks};
///
/// let hooks = Arc::new(StepHooks::new());
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&log);
/// hooks.attach_after(Arc::new(move |value: &i32| {
///     sink.lock().map_err(|e| e.to_string())?.push(*value);
///     Ok(())
/// }))?;
///
/// let mut handle = StepAdapter::new(hooks, IterProducer::new(vec![1, 2, 3].into_iter()));
/// while handle.step()? {}
///
/// assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
/// # Ok::<(), callweave::Error>(())
/// ```
pub struct StepHooks<T> {
    site: TargetId,
    hooks: RwLock<HookList<StepCallback<T>>>,
}

impl<T> StepHooks<T> {
    /// Creates a hook set with a fresh synthetic site identity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_site(TargetId::fresh())
    }

    /// Creates a hook set under a caller-chosen site identity.
    ///
    /// Useful when the host wants error context to name an identity from its
    /// own call graph (the factory's target, for instance).
    #[must_use]
    pub fn with_site(site: TargetId) -> Self {
        StepHooks {
            site,
            hooks: RwLock::new(HookList::new()),
        }
    }

    /// The identity of this synthetic resume-step call site
    #[must_use]
    pub fn site(&self) -> TargetId {
        self.site
    }

    /// Attaches a per-step Before observer with the default order key `0`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_before(&self, observer: BeforeStepFn) -> Result<RegistrationHandle> {
        self.attach(0, StepCallback::Before(observer))
    }

    /// Attaches a per-step Before observer with an explicit order key.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_before_ordered(
        &self,
        observer: BeforeStepFn,
        order: i32,
    ) -> Result<RegistrationHandle> {
        self.attach(order, StepCallback::Before(observer))
    }

    /// Attaches a per-step After observer with the default order key `0`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_after(&self, observer: AfterStepFn<T>) -> Result<RegistrationHandle> {
        self.attach(0, StepCallback::After(observer))
    }

    /// Attaches a per-step After observer with an explicit order key.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_after_ordered(
        &self,
        observer: AfterStepFn<T>,
        order: i32,
    ) -> Result<RegistrationHandle> {
        self.attach(order, StepCallback::After(observer))
    }

    /// Attaches a whole-wrap observer with the default order key `0`.
    ///
    /// Wraps nest like replacements: the latest-registered wrap ends up
    /// outermost. A wrap applies to handles whose *first resume* happens
    /// after the attachment; a handle already delegating keeps the chain it
    /// started with.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_wrap(&self, observer: WrapFn<T>) -> Result<RegistrationHandle> {
        self.attach(0, StepCallback::Wrap(observer))
    }

    /// Attaches a whole-wrap observer with an explicit order key.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateRegistration`] on an identical
    /// instance+kind+order registration.
    pub fn attach_wrap_ordered(&self, observer: WrapFn<T>, order: i32) -> Result<RegistrationHandle> {
        self.attach(order, StepCallback::Wrap(observer))
    }

    /// Removes a registration.
    ///
    /// Handles already stepping keep their entry-time snapshot for the step
    /// in progress; the removal applies from the next step on.
    ///
    /// # Errors
    /// Returns [`Error::UnknownTarget`] if the handle belongs to a different
    /// site, or [`Error::StaleHandle`] if the registration was already
    /// removed.
    pub fn detach(&self, handle: RegistrationHandle) -> Result<()> {
        if handle.target() != self.site {
            return Err(Error::UnknownTarget(handle.target()));
        }
        let mut hooks = self
            .hooks
            .write()
            .map_err(|e| Error::LockError(format!("step hook list write: {e}")))?;
        if !hooks.remove(handle.hook()) {
            return Err(Error::StaleHandle {
                target: self.site,
                hook: handle.hook(),
            });
        }
        Ok(())
    }

    /// Number of observers currently attached.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the hook list lock is poisoned.
    pub fn observer_count(&self) -> Result<usize> {
        let hooks = self
            .hooks
            .read()
            .map_err(|e| Error::LockError(format!("step hook list read: {e}")))?;
        Ok(hooks.len())
    }

    fn attach(&self, order: i32, callback: StepCallback<T>) -> Result<RegistrationHandle> {
        let id = HookId::next();
        let kind = callback.kind();
        let mut hooks = self
            .hooks
            .write()
            .map_err(|e| Error::LockError(format!("step hook list write: {e}")))?;
        if hooks.insert(id, kind, order, callback).is_none() {
            return Err(Error::DuplicateRegistration {
                target: self.site,
                kind,
                order,
            });
        }
        Ok(RegistrationHandle::new(self.site, id))
    }

    fn snapshot(&self) -> Result<Vec<HookEntry<StepCallback<T>>>> {
        let hooks = self
            .hooks
            .read()
            .map_err(|e| Error::LockError(format!("step hook list read: {e}")))?;
        Ok(hooks.snapshot())
    }
}

impl<T> Default for StepHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer that is already exhausted; placeholder during state transitions.
struct Exhausted<T>(PhantomData<fn() -> T>);

impl<T> Exhausted<T> {
    fn new() -> Self {
        Exhausted(PhantomData)
    }
}

impl<T> Resumable for Exhausted<T> {
    type Item = T;

    fn resume(&mut self) -> std::result::Result<bool, BoxError> {
        Ok(false)
    }

    fn current(&self) -> Option<&T> {
        None
    }
}

enum AdapterState<T> {
    /// Created but never resumed; the whole-wrap chain is not yet applied.
    NotStarted(BoxResumable<T>),
    /// Every step delegates to this (possibly wrapped) producer.
    Delegating(BoxResumable<T>),
}

/// The observable handle wrapping a resumable computation.
///
/// Each [`step`](StepAdapter::step) dispatches the synthetic call site in
/// [`StepHooks`]: per-step Before observers, one resume of the (possibly
/// whole-wrapped) producer, then — only for a resume that produced a value —
/// the per-step After observers over the committed value.
///
/// # Failure Exposure
///
/// A failing Before observer aborts the step before the producer is resumed,
/// so no value is consumed. A failing After observer fires *after* the value
/// was committed: the value stays readable via
/// [`current`](Resumable::current), the producer's position is not rewound,
/// and a later step continues from the partially-consumed state. Callers that
/// need stronger guarantees dispose the handle on error.
pub struct StepAdapter<T> {
    hooks: Arc<StepHooks<T>>,
    state: AdapterState<T>,
    done: bool,
}

impl<T: 'static> StepAdapter<T> {
    /// Wraps a producer so its resume steps dispatch through `hooks`.
    pub fn new<P>(hooks: Arc<StepHooks<T>>, producer: P) -> Self
    where
        P: Resumable<Item = T> + Send + 'static,
    {
        Self::from_boxed(hooks, Box::new(producer))
    }

    /// Wraps an already-boxed producer; the form whole-wrap authors use.
    pub fn from_boxed(hooks: Arc<StepHooks<T>>, producer: BoxResumable<T>) -> Self {
        StepAdapter {
            hooks,
            state: AdapterState::NotStarted(producer),
            done: false,
        }
    }

    /// The synthetic call site this handle dispatches through
    #[must_use]
    pub fn site(&self) -> TargetId {
        self.hooks.site()
    }

    /// True once the wrapped computation signaled completion or the handle
    /// was disposed
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Advances the wrapped computation by one observed step.
    ///
    /// Returns `Ok(true)` if a value was produced (readable via
    /// [`current`](Resumable::current)), `Ok(false)` on completion.
    /// Completion is sticky: further calls keep returning `Ok(false)`
    /// without touching the producer. The observer list is snapshotted at
    /// entry of every step.
    ///
    /// # Errors
    /// [`Error::Observer`] if a per-step observer fails,
    /// [`Error::Producer`] if the producer itself fails,
    /// [`Error::LockError`] if the hook list lock is poisoned.
    pub fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let site = self.hooks.site();
        let snapshot = self.hooks.snapshot()?;
        self.ensure_started(&snapshot);

        for entry in &snapshot {
            if let StepCallback::Before(callback) = &entry.callback {
                callback()
                    .map_err(|e| Error::observer_failure(site, HookKind::Before, entry.id, e))?;
            }
        }

        let stepped = {
            let producer = match &mut self.state {
                AdapterState::NotStarted(producer) | AdapterState::Delegating(producer) => producer,
            };
            producer
                .resume()
                .map_err(|e| Error::producer_failure(site, e))?
        };
        if !stepped {
            self.done = true;
            return Ok(false);
        }

        let value = match &self.state {
            AdapterState::NotStarted(producer) | AdapterState::Delegating(producer) => {
                producer.current()
            }
        };
        let Some(value) = value else {
            return Err(Error::producer_failure(
                site,
                "producer reported a value but its current slot is empty".into(),
            ));
        };
        for entry in &snapshot {
            if let StepCallback::After(callback) = &entry.callback {
                callback(value)
                    .map_err(|e| Error::observer_failure(site, HookKind::After, entry.id, e))?;
            }
        }
        Ok(true)
    }

    /// Applies the whole-wrap chain on the first step.
    ///
    /// Wraps fold in `(order, seq)` order, so the latest-registered wrap is
    /// the outermost producer. Once delegating, the chain is fixed for the
    /// life of the handle.
    fn ensure_started(&mut self, snapshot: &[HookEntry<StepCallback<T>>]) {
        if matches!(self.state, AdapterState::Delegating(_)) {
            return;
        }
        let placeholder = AdapterState::Delegating(Box::new(Exhausted::new()));
        if let AdapterState::NotStarted(original) = std::mem::replace(&mut self.state, placeholder)
        {
            let mut producer = original;
            for entry in snapshot {
                if let StepCallback::Wrap(wrap) = &entry.callback {
                    producer = wrap(producer);
                }
            }
            self.state = AdapterState::Delegating(producer);
        }
    }
}

impl<T: 'static> Resumable for StepAdapter<T> {
    type Item = T;

    fn resume(&mut self) -> std::result::Result<bool, BoxError> {
        self.step().map_err(BoxError::from)
    }

    fn current(&self) -> Option<&T> {
        if self.done {
            return None;
        }
        match &self.state {
            AdapterState::NotStarted(_) => None,
            AdapterState::Delegating(producer) => producer.current(),
        }
    }

    fn dispose(&mut self) {
        self.done = true;
        match &mut self.state {
            AdapterState::NotStarted(producer) | AdapterState::Delegating(producer) => {
                producer.dispose();
            }
        }
    }
}

impl<T: Clone + 'static> Iterator for StepAdapter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(true) => self.current().cloned().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lifts a producer factory into one whose handles dispatch through `hooks`.
///
/// The hook set is shared: observers attached after a handle was created
/// still apply to that handle's subsequent steps (whole-wraps excepted, which
/// bind at the handle's first resume).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use callweave::resume::{wrap_factory, IterProducer, StepHooks};
///
/// let hooks = Arc::new(StepHooks::new());
/// let factory = wrap_factory(Arc::clone(&hooks), |limit: u32| {
///     IterProducer::new(0..limit)
/// });
///
/// let mut handle = factory(3);
/// let values: Vec<u32> = handle.by_ref().collect::<Result<_, _>>()?;
/// assert_eq!(values, vec![0, 1, 2]);
/// # Ok::<(), callweave::Error>(())
/// ```
pub fn wrap_factory<Args, P, F>(
    hooks: Arc<StepHooks<P::Item>>,
    factory: F,
) -> impl Fn(Args) -> StepAdapter<P::Item>
where
    P: Resumable + Send + 'static,
    F: Fn(Args) -> P,
{
    move |args| StepAdapter::new(Arc::clone(&hooks), factory(args))
}
