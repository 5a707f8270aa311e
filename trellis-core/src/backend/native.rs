//! Adapter for the built-in reactive engine.

use crate::contract::{
    Backend, CleanupFn, ComputeFn, ComputedParts, EffectFn, ManualEffect, SignalParts,
};
use crate::reactive::{on_cleanup, Effect, EngineConfig, Memo, Reader, Runtime, Scope, Signal};

/// [`Backend`] over [`crate::reactive`].
///
/// Roots created through this backend stay alive until their [`Scope`] is
/// disposed; code running inside a root can get at it with
/// [`Scope::current`]. A root nobody disposes is kept in the global root
/// table for the rest of the process; [`Scope::live_roots`] reports how many
/// there are.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Install `config` process-wide and return the backend.
    pub fn with_config(config: EngineConfig) -> Self {
        Runtime::configure(config);
        Self
    }
}

impl Backend for NativeBackend {
    fn create_root<R>(&self, f: impl FnOnce() -> R) -> R {
        Scope::root().enter(f)
    }

    fn create_signal<T>(&self, initial: T) -> SignalParts<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let signal = Signal::new(initial);
        let reader = signal.clone();
        SignalParts::new(move || reader.get(), move |value| signal.set(value))
    }

    fn create_computed<T>(&self, compute: ComputeFn<T>) -> ComputedParts<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let memo = Memo::new(compute);
        ComputedParts::new(move || memo.get())
    }

    fn create_auto_effect(&self, run: EffectFn) {
        Effect::new(run);
    }

    fn create_manual_effect(&self, effect: ManualEffect) {
        let readers = effect.on.into_iter().map(|source| -> Reader {
            Box::new(move || source.track())
        });
        Effect::new_manual(readers, effect.run);
    }

    fn on_dispose(&self, cleanup: CleanupFn) {
        on_cleanup(cleanup);
    }
}
