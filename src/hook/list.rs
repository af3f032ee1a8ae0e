//! Ordered storage of hook registrations.
//!
//! One call site owns one `HookList`: a single vector of
//! `{kind, order, seq, callback}` entries kept sorted by `(order, seq)`.
//! All three interception kinds share the list; dispatch filters by kind
//! while walking it, which preserves the total order without per-kind
//! bookkeeping. The list itself is not synchronized — owners wrap it in the
//! lock appropriate for their concurrency model and clone a snapshot for the
//! duration of a dispatch.

use crate::hook::{HookId, HookKind};

/// Pointer-identity comparison for registered callbacks.
///
/// The duplicate-registration guard rejects attaching the *same instance*
/// twice with identical kind and order. Instance identity is the `Arc`
/// pointer behind the callback variant, so distinct closures with identical
/// behavior never collide.
pub(crate) trait CallbackIdentity {
    /// True if both callbacks are the same registered instance of the same kind
    fn same_instance(&self, other: &Self) -> bool;
}

/// One registration: interception kind, ordering position and the callback.
#[derive(Clone)]
pub(crate) struct HookEntry<C> {
    /// Unique registration identity
    pub id: HookId,
    /// When the callback runs relative to the core behavior
    pub kind: HookKind,
    /// Explicit order key; lower runs earlier, default 0
    pub order: i32,
    /// Registration sequence, breaks order-key ties
    pub seq: u64,
    /// The registered callback
    pub callback: C,
}

/// Ordered collection of hook registrations for one call site.
pub(crate) struct HookList<C> {
    entries: Vec<HookEntry<C>>,
    next_seq: u64,
}

impl<C> HookList<C> {
    pub(crate) fn new() -> Self {
        HookList {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: CallbackIdentity + Clone> HookList<C> {
    /// Inserts a registration at its `(order, seq)` position.
    ///
    /// Returns `None` if the same callback instance is already present with
    /// identical kind and order, otherwise the sequence number assigned to
    /// the new entry. A fresh sequence number is drawn on every successful
    /// insert, so an observer that was fully detached and re-attached sorts
    /// as if registered for the first time now.
    pub(crate) fn insert(
        &mut self,
        id: HookId,
        kind: HookKind,
        order: i32,
        callback: C,
    ) -> Option<u64> {
        let duplicate = self.entries.iter().any(|entry| {
            entry.kind == kind && entry.order == order && entry.callback.same_instance(&callback)
        });
        if duplicate {
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        // Entries are sorted by (order, seq); seq is monotone, so the insert
        // position is simply after every entry with order <= the new key.
        let position = self.entries.partition_point(|entry| entry.order <= order);
        self.entries.insert(
            position,
            HookEntry {
                id,
                kind,
                order,
                seq,
                callback,
            },
        );
        Some(seq)
    }

    /// Removes the registration with the given identity.
    ///
    /// Returns false if no such registration exists. Removal shifts nothing
    /// out of order: the survivors keep their relative positions.
    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// Clones the current entries for lock-free iteration during a dispatch.
    ///
    /// An invocation snapshots its observer list at entry; attach/detach
    /// racing with the invocation apply only to subsequent invocations.
    pub(crate) fn snapshot(&self) -> Vec<HookEntry<C>> {
        self.entries.clone()
    }
}
