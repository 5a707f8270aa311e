//! Backend Contract
//!
//! The six operations a host reactivity engine must supply before the
//! facade can run on it. Everything reactive (dependency tracking,
//! invalidation, effect scheduling, disposal timing) happens behind this
//! trait; the facade only forwards to it.
//!
//! | Operation              | Produces            |
//! |------------------------|---------------------|
//! | `create_root`          | whatever `f` returns |
//! | `create_signal`        | [`SignalParts`]     |
//! | `create_computed`      | [`ComputedParts`]   |
//! | `create_auto_effect`   | nothing             |
//! | `create_manual_effect` | nothing             |
//! | `on_dispose`           | nothing             |
//!
//! Errors raised by a backend (for instance a panic from a read outside any
//! tracking context) pass through the facade untouched.

use std::fmt;
use std::sync::Arc;

/// Computation behind a derived value.
pub type ComputeFn<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Body of an effect.
pub type EffectFn = Box<dyn Fn() + Send + Sync>;

/// Teardown callback.
pub type CleanupFn = Box<dyn FnOnce() + Send>;

/// The `{get, set}` pair a backend hands out for a mutable signal.
///
/// `get` is a tracked read; `set` stores the value and notifies dependents.
pub struct SignalParts<T> {
    pub get: Arc<dyn Fn() -> T + Send + Sync>,
    pub set: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> SignalParts<T> {
    pub fn new(
        get: impl Fn() -> T + Send + Sync + 'static,
        set: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

impl<T> Clone for SignalParts<T> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

/// The `{get}` accessor a backend hands out for a derived value.
pub struct ComputedParts<T> {
    pub get: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> ComputedParts<T> {
    pub fn new(get: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self { get: Arc::new(get) }
    }
}

impl<T> Clone for ComputedParts<T> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
        }
    }
}

/// Something whose value can be read under tracking.
///
/// Manual effects use this to subscribe to a fixed list of values without
/// caring about their types.
pub trait Track: Send + Sync {
    /// Perform a tracked read and discard the value.
    fn track(&self);
}

/// An effect that follows an explicit list of values.
pub struct ManualEffect {
    /// Values whose changes re-run `run`. Fixed at registration.
    pub on: Vec<Arc<dyn Track>>,
    pub run: EffectFn,
}

impl fmt::Debug for ManualEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualEffect")
            .field("on", &self.on.len())
            .finish_non_exhaustive()
    }
}

/// A host reactivity engine.
///
/// Implementations translate a specific engine's native API into these six
/// operations. See [`crate::backend`] for the ones shipped with this crate.
pub trait Backend: Send + Sync + 'static {
    /// Run `f` inside a fresh disposable scope and return its result.
    fn create_root<R>(&self, f: impl FnOnce() -> R) -> R;

    /// Create a mutable signal holding `initial`.
    fn create_signal<T>(&self, initial: T) -> SignalParts<T>
    where
        T: Clone + Send + Sync + 'static;

    /// Create a derived value computed by `compute`.
    ///
    /// Engines may compare successive values to skip dependents when a
    /// recomputation yields the same value.
    fn create_computed<T>(&self, compute: ComputeFn<T>) -> ComputedParts<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static;

    /// Run `run` now and again whenever anything it read last time changes.
    fn create_auto_effect(&self, run: EffectFn);

    /// Run `effect.run` now and again whenever a value in `effect.on` changes.
    fn create_manual_effect(&self, effect: ManualEffect);

    /// Register `cleanup` to run when the current scope is torn down.
    fn on_dispose(&self, cleanup: CleanupFn);
}
