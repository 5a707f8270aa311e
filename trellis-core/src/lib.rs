//! Trellis Core
//!
//! A uniform reactive value API over pluggable reactivity engines.
//!
//! Application code talks to a [`Facade`] and nothing else. The facade is
//! built from a [`Backend`](contract::Backend), which supplies the actual
//! signals, derived values, effects and scopes. Swapping engines means
//! swapping the backend passed to [`Facade::new`]; call sites stay the same.
//!
//! # Architecture
//!
//! - `contract`: the six operations a backend must provide
//! - `backend`: adapters from concrete engines onto the contract
//! - `facade`: the bound operations and the `Prop`/`Formula` value types
//! - `unionize`: optional field access over variant-shaped values
//! - `reactive`: the built-in fine-grained engine
//!
//! # Example
//!
//! ```rust
//! use trellis_core::backend::NativeBackend;
//! use trellis_core::{Facade, WatchOptions};
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//!
//! let rx = Facade::new(NativeBackend::new());
//! let seen = Arc::new(AtomicI32::new(0));
//!
//! let count = rx.use_prop(0);
//! rx.use_root(|| {
//!     let (count, seen) = (count.clone(), seen.clone());
//!     rx.do_watch(move || seen.store(count.get(), Ordering::SeqCst), WatchOptions::new());
//! });
//!
//! count.set(5);
//! assert_eq!(seen.load(Ordering::SeqCst), 5);
//! ```

pub mod backend;
pub mod contract;
pub mod error;
pub mod facade;
pub mod reactive;
pub mod unionize;

pub use error::{FacadeError, FacadeResult};
pub use facade::{do_now, exists, Exists, Facade, Formula, Prop, WatchOptions};
