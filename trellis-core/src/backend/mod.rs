//! Backend Adapters
//!
//! Each adapter maps one reactivity engine onto [`Backend`](crate::contract::Backend).
//!
//! - [`NativeBackend`]: the engine in [`crate::reactive`].
//! - [`InertBackend`]: no reactivity at all. Values are plain cells and
//!   effects run once. Useful for one-shot evaluation.

mod inert;
mod native;

pub use inert::InertBackend;
pub use native::NativeBackend;
