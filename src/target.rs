//! Call-site identity.
//!
//! A [`TargetId`] names one interceptable operation. Identity is by value,
//! never by name: two distinct operations that happen to share a display name
//! must carry distinct identities, and the registry compares nothing else.
//! Hosts that already have stable operation identities (method tokens,
//! function addresses, dispatch table slots) mint `TargetId`s from those raw
//! values; hosts that do not can allocate process-unique identities with
//! [`TargetId::fresh`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an interceptable operation.
///
/// A 64-bit opaque value. The low half of the space is left to the host for
/// identities derived from its own call graph; [`TargetId::fresh`] allocates
/// from a reserved high range (`0x8000_0000_0000_0000` and up) so generated
/// identities never collide with host-minted ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u64);

/// Next synthetic identity handed out by [`TargetId::fresh`].
static NEXT_FRESH: AtomicU64 = AtomicU64::new(0x8000_0000_0000_0000);

impl TargetId {
    /// Creates a target identity from a raw 64-bit value
    #[must_use]
    pub fn new(value: u64) -> Self {
        TargetId(value)
    }

    /// Returns the raw identity value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Allocates a process-unique identity from the reserved synthetic range.
    ///
    /// Used for call sites that have no natural host identity, such as the
    /// synthetic resume-step sites created by
    /// [`StepHooks`](crate::resume::StepHooks).
    #[must_use]
    pub fn fresh() -> Self {
        TargetId(NEXT_FRESH.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns true if this identity came from the reserved synthetic range
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.0 >= 0x8000_0000_0000_0000
    }

    /// Returns true if this is a null identity (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for TargetId {
    fn from(value: u64) -> Self {
        TargetId(value)
    }
}

impl From<TargetId> for u64 {
    fn from(target: TargetId) -> Self {
        target.0
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TargetId(0x{:016x}, synthetic: {})",
            self.0,
            self.is_synthetic()
        )
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}
