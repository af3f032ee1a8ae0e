// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # callweave
//!
//! A thread-safe framework for composable method interception. `callweave` lets multiple
//! independent components attach prefix, postfix and replacement behavior to the same target
//! operation with a reproducible total order, and extends the same observation model to
//! resumable (generator-style) computations, where the interesting boundary is not the call
//! that creates the producer but every resume step it performs afterwards.
//!
//! ## Features
//!
//! - **🧵 Concurrent registry** - Lock-free call-site lookup; registration changes never block
//!   in-flight invocations
//! - **📐 Deterministic composition** - Explicit order keys with registration-order tie-breaking,
//!   so dispatch is reproducible regardless of who attached what from where
//! - **🔁 Resume-step observation** - Per-step prefix/postfix observers and whole-sequence
//!   replacement for iterator-shaped computations
//! - **📸 Snapshot isolation** - Every invocation and every resume step dispatches against the
//!   observer list as it stood at entry
//! - **🛡️ Fail-fast errors** - Observer failures carry full context (target, kind, registration)
//!   and are never swallowed or retried
//!
//! ## Quick Start
//!
//! Add `callweave` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! callweave = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust
//! use std::sync::Arc;
//! use callweave::prelude::*;
//!
//! let registry: HookRegistry<u32, u32> = HookRegistry::new();
//! let target = TargetId::new(0x0600_0001);
//!
//! registry.attach_before(target, Arc::new(|args| {
//!     *args += 1;
//!     Ok(())
//! }))?;
//!
//! let result = registry.invoke(target, &mut 41, |args| Ok(*args))?;
//! assert_eq!(result, 42);
//! # Ok::<(), callweave::Error>(())
//! ```
//!
//! ### Observing a Resumable Computation
//!
//! Intercepting the factory that returns a producer observes a single call; the values flow
//! later, one resume at a time. The resume-step adapter attaches to those steps instead:
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use callweave::prelude::*;
//!
//! let hooks = Arc::new(StepHooks::new());
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! hooks.attach_after(Arc::new(move |value: &u32| {
//!     sink.lock().map_err(|e| e.to_string())?.push(*value);
//!     Ok(())
//! }))?;
//!
//! let factory = wrap_factory(Arc::clone(&hooks), |limit: u32| IterProducer::new(1..=limit));
//! let mut handle = factory(3);
//! while handle.step()? {}
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
//! # Ok::<(), callweave::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `callweave` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`target`] - Call-site identity ([`TargetId`])
//! - [`hook`] - The observer model: kinds, registration identity, handles
//! - [`registry`] - The interceptable call-site registry and composition dispatcher
//! - [`resume`] - The resumable-computation wrapping adapter
//! - [`global`] - An optional process-wide default registry
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ## Concurrency Model
//!
//! Dispatch is synchronous and call-stack-bound: every observer runs on the invoking thread,
//! with no background processing and no cancellation primitive. The registry itself is shared
//! state designed for concurrent use — attach and detach take a scoped exclusive lock only
//! around the list mutation, never around an invocation, and invocations snapshot their
//! observer list at entry. A registration change that races with an in-flight invocation
//! applies only to subsequent invocations.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with specific error context:
//!
//! ```rust
//! use std::sync::Arc;
//! use callweave::{Error, HookRegistry, TargetId};
//!
//! let registry: HookRegistry<u32, u32> = HookRegistry::new();
//! let observer: callweave::registry::BeforeFn<u32> = Arc::new(|_| Ok(()));
//! let target = TargetId::new(1);
//!
//! registry.attach_before(target, observer.clone())?;
//! match registry.attach_before(target, observer) {
//!     Err(Error::DuplicateRegistration { kind, order, .. }) => {
//!         println!("already attached as {kind} at order {order}");
//!     }
//!     other => println!("{other:?}"),
//! }
//! # Ok::<(), callweave::Error>(())
//! ```

mod error;

/// Call-site identity.
///
/// [`TargetId`] names one interceptable operation, by value rather than by
/// name.
pub mod target;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use callweave::prelude::*;
///
/// let registry: HookRegistry<u32, u32> = HookRegistry::new();
/// assert!(registry.is_empty());
/// ```
pub mod prelude;

/// Observer model shared by the call-site registry and the resume-step adapter.
///
/// Defines when observers run ([`HookKind`]), how registrations are identified
/// ([`HookId`], [`RegistrationHandle`]) and the ordering rules every hook
/// container in this crate follows.
pub mod hook;

/// Interceptable call-site registry and composition dispatcher.
///
/// [`HookRegistry`] is the shared table mapping [`TargetId`]s to their ordered
/// observer lists, with snapshot-isolated dispatch via
/// [`invoke`](HookRegistry::invoke).
pub mod registry;

/// Observation of resumable computations, one resume step at a time.
///
/// The [`resume::Resumable`] contract, the [`resume::StepHooks`] synthetic
/// call site and the [`resume::StepAdapter`] wrapping handle.
pub mod resume;

/// Optional process-wide default registry.
///
/// A lazily-created, dynamically typed [`HookRegistry`] for hosts that want
/// one shared table without wiring; explicit registries remain the primary
/// API.
pub mod global;

pub use error::{BoxError, Error, Result};
pub use hook::{HookId, HookKind, RegistrationHandle};
pub use registry::HookRegistry;
pub use target::TargetId;
