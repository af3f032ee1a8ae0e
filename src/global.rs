//! Optional process-wide default registry.
//!
//! The dispatcher never assumes a singleton: a [`HookRegistry`] is plain
//! caller-constructed state, passed by reference to whoever needs it. Hosts
//! that want one shared table anyway — typically plugin loaders where
//! unrelated components must find the same registry without wiring — can use
//! the lazily-created default here. It is dynamically typed ([`AnyArgs`] /
//! [`AnyValue`]), so observers downcast to the concrete types of the target
//! they attach to.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use callweave::{global, TargetId};
//!
//! let target = TargetId::fresh();
//! global::registry().attach_before(
//!     target,
//!     Arc::new(|args: &mut global::AnyArgs| {
//!         if let Some(count) = args.downcast_mut::<u32>() {
//!             *count += 1;
//!         }
//!         Ok(())
//!     }),
//! )?;
//!
//! let mut args: global::AnyArgs = Box::new(5_u32);
//! let result = global::registry().invoke(target, &mut args, |args| {
//!     let count = args.downcast_ref::<u32>().copied().unwrap_or_default();
//!     Ok(Box::new(count * 2) as global::AnyValue)
//! })?;
//! assert_eq!(result.downcast_ref::<u32>(), Some(&12));
//! # Ok::<(), callweave::Error>(())
//! ```

use std::any::Any;
use std::sync::OnceLock;

use crate::registry::HookRegistry;

/// Dynamically typed argument bundle for the default registry.
pub type AnyArgs = Box<dyn Any + Send + Sync>;

/// Dynamically typed result for the default registry.
pub type AnyValue = Box<dyn Any + Send + Sync>;

static DEFAULT: OnceLock<HookRegistry<AnyArgs, AnyValue>> = OnceLock::new();

/// The process-wide default registry, created on first use.
pub fn registry() -> &'static HookRegistry<AnyArgs, AnyValue> {
    DEFAULT.get_or_init(HookRegistry::new)
}
