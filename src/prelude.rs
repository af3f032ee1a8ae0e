//! # callweave Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the callweave library. Import this module to get quick
//! access to the essential types for call-site interception and resume-step
//! observation.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all callweave operations
pub use crate::Error;

/// The result type used throughout callweave
pub use crate::Result;

/// The boxed error type observers and core behaviors fail with
pub use crate::BoxError;

// ================================================================================================
// Identity and Registration
// ================================================================================================

/// Identity of an interceptable operation
pub use crate::target::TargetId;

/// Registration primitives: interception kinds, registration identity and handles
pub use crate::hook::{HookId, HookKind, RegistrationHandle};

// ================================================================================================
// Call-Site Registry
// ================================================================================================

/// The interceptable call-site registry and its callback signatures
pub use crate::registry::{AfterFn, BeforeFn, HookRegistry, ReplaceFn};

// ================================================================================================
// Resumable Computations
// ================================================================================================

/// The resumable producer contract, wrapping adapter and step hook set
pub use crate::resume::{
    wrap_factory, AfterStepFn, BeforeStepFn, BoxResumable, IterProducer, Resumable, StepAdapter,
    StepHooks, WrapFn,
};
