//! Observer model shared by the call-site registry and the resume-step adapter.
//!
//! # Key Components
//!
//! - [`HookKind`] - When an observer runs relative to the intercepted operation
//! - [`HookId`] - Process-unique identity of a single registration
//! - [`RegistrationHandle`] - Proof of registration, returned by attach and consumed by detach
//! - `HookList` - Internal ordered container of `{kind, order, seq, callback}` entries
//!
//! # Ordering Model
//!
//! Every registration carries an explicit order key (default `0`) and a
//! monotone registration sequence number. Dispatch runs observers of a kind in
//! ascending `(order, seq)` order: the explicit key takes precedence, ties fall
//! back to registration order. Detaching one observer never reorders the
//! others, and re-attaching after a full detach resets the observer's position
//! to "now" because it receives a new sequence number.

mod handle;
mod kind;
pub(crate) mod list;

pub use handle::{HookId, RegistrationHandle};
pub use kind::HookKind;
