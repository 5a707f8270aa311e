//! A backend with no reactivity.
//!
//! Signals are plain shared cells, derived values recompute on every read,
//! effects run exactly once and dispose callbacks are dropped. Code written
//! against the facade runs unchanged; it just never reacts.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::contract::{
    Backend, CleanupFn, ComputeFn, ComputedParts, EffectFn, ManualEffect, SignalParts,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct InertBackend;

impl InertBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for InertBackend {
    fn create_root<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }

    fn create_signal<T>(&self, initial: T) -> SignalParts<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cell = Arc::new(RwLock::new(initial));
        let reader = Arc::clone(&cell);
        SignalParts::new(move || reader.read().clone(), move |value| *cell.write() = value)
    }

    fn create_computed<T>(&self, compute: ComputeFn<T>) -> ComputedParts<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        ComputedParts::new(compute)
    }

    fn create_auto_effect(&self, run: EffectFn) {
        run();
    }

    fn create_manual_effect(&self, effect: ManualEffect) {
        (effect.run)();
    }

    fn on_dispose(&self, _cleanup: CleanupFn) {
        tracing::trace!("inert backend dropped a dispose callback");
    }
}
