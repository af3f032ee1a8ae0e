use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::target::TargetId;

/// Process-unique identity of a single registration.
///
/// Allocated from an atomic counter at attach time. The identity survives for
/// the life of the process and is never reused, so a handle kept around after
/// its registration was detached stays detectably stale instead of silently
/// aliasing a newer registration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

static NEXT_HOOK: AtomicU64 = AtomicU64::new(1);

impl HookId {
    /// Allocates the next process-unique registration identity
    pub(crate) fn next() -> Self {
        HookId(NEXT_HOOK.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identity value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookId({})", self.0)
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

/// Proof of a registration, returned by attach operations and consumed by detach.
///
/// The handle pins down both halves of the registration's address: the call
/// site it lives under and the unique identity of the registration itself.
/// Handles are `Copy`; dropping one does *not* detach the observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    target: TargetId,
    hook: HookId,
}

impl RegistrationHandle {
    pub(crate) fn new(target: TargetId, hook: HookId) -> Self {
        RegistrationHandle { target, hook }
    }

    /// The call site this registration is attached to
    #[must_use]
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// The unique identity of this registration
    #[must_use]
    pub fn hook(&self) -> HookId {
        self.hook
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hook, self.target)
    }
}
