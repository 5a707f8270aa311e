//! Reactive Engine
//!
//! This module implements a fine-grained reactive system: signals, memos,
//! effects and the scopes that own them. It is the engine behind
//! [`NativeBackend`](crate::backend::NativeBackend); the facade never talks
//! to it directly.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes, and only when it is read.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects are used to synchronize reactive state with external systems.
//!
//! ## Scopes
//!
//! A Scope owns effects and cleanup callbacks. Disposing a scope stops its
//! effects and runs its cleanups.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.

mod config;
mod context;
mod effect;
mod error;
mod memo;
mod runtime;
mod scope;
mod signal;
mod subscriber;

pub use config::EngineConfig;
pub use context::{untracked, ReactiveContext};
pub use effect::{Effect, Reader};
pub use error::{EngineError, EngineResult};
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, ReactiveHandle, Runtime, UpdateGuard};
pub use scope::{on_cleanup, Cleanup, Scope, ScopeId};
pub use signal::Signal;
pub use subscriber::{SourceId, SubscriberId};
