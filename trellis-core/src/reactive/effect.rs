//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is scheduled to re-run.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution.
//!
//! # Tracking Modes
//!
//! - **Auto**: every source read while the body runs becomes a dependency.
//! - **Manual**: a fixed list of readers is run under tracking, then the body
//!   runs untracked. The list is fixed at creation.
//!
//! # Cleanup
//!
//! Each effect owns a [`Scope`]. Cleanups registered and effects created while
//! the body runs belong to that scope and are torn down before the next run
//! and when the effect is disposed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::error::EngineResult;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::scope::{Scope, ScopeInner};
use super::subscriber::SubscriberId;

/// A closure that performs one tracked read and discards the value.
pub type Reader = Box<dyn Fn() + Send + Sync>;

enum Tracking {
    Auto,
    Manual(SmallVec<[Reader; 4]>),
}

struct EffectInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    tracking: Tracking,
    scope: Scope,
    owner: OnceLock<Weak<ScopeInner>>,
    disposed: AtomicBool,
    // Set when a scheduled run was refused
    missed_update: AtomicBool,
    run_count: AtomicUsize,
    handle: OnceLock<ReactiveHandle>,
}

/// A side-effecting computation that runs when dependencies change.
///
/// Effects are owned by the scope that was current when they were created.
/// Clones share state.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let reader = count.clone();
/// Effect::new(move || {
///     println!("Count is: {}", reader.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new auto-tracked effect.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::build(Box::new(run), Tracking::Auto);
        effect.execute();
        effect
    }

    /// Create an effect that re-runs only when one of `on` changes.
    ///
    /// Each reader is called under tracking before the body; the body itself
    /// runs untracked. The function runs immediately.
    pub fn new_manual<F, I>(on: I, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        I: IntoIterator<Item = Reader>,
    {
        let effect = Self::build(Box::new(run), Tracking::Manual(on.into_iter().collect()));
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    ///
    /// Useful for cases where you want to control when the effect first runs.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(Box::new(run), Tracking::Auto)
    }

    fn build(run: Box<dyn Fn() + Send + Sync>, tracking: Tracking) -> Self {
        let inner = Arc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run,
            tracking,
            scope: Scope::for_effect(),
            owner: OnceLock::new(),
            disposed: AtomicBool::new(false),
            missed_update: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
            handle: OnceLock::new(),
        });

        let handle = Runtime::register(inner.clone());
        let _ = inner.handle.set(handle);

        let owner = Scope::current_or_detached("effect");
        let _ = inner.owner.set(owner.downgrade());

        let effect = Self { inner };
        owner.adopt(effect.clone());
        effect
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Execute the effect function.
    ///
    /// Failures (the update-depth limit) are logged, not returned.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Execute the effect function, reporting why it could not run.
    pub fn try_execute(&self) -> EngineResult<()> {
        self.inner.try_execute()
    }

    /// Schedule the effect to re-run.
    ///
    /// Called when a dependency changes. Effects run synchronously.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Dispose the effect.
    ///
    /// After disposal, the effect will not run again. Everything it owns is
    /// torn down.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of sources read during the last run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }

    /// Whether this effect follows a fixed list of sources.
    pub fn is_manual(&self) -> bool {
        matches!(self.inner.tracking, Tracking::Manual(_))
    }
}

impl EffectInner {
    fn execute(&self) {
        if let Err(err) = self.try_execute() {
            tracing::error!(effect = %self.subscriber_id, %err, "effect run skipped");
        }
    }

    fn try_execute(&self) -> EngineResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _update = match Runtime::enter_update() {
            Ok(guard) => guard,
            Err(err) => {
                self.missed_update.store(true, Ordering::SeqCst);
                return Err(err);
            }
        };
        self.missed_update.store(false, Ordering::SeqCst);

        // Tear down what the previous run created
        self.scope.reset();
        Runtime::clear_dependencies(self.subscriber_id);

        let _ctx = ReactiveContext::enter(self.subscriber_id);
        match &self.tracking {
            Tracking::Auto => self.scope.run(|| (self.run)())?,
            Tracking::Manual(readers) => {
                for read in readers {
                    read();
                }
                let _untracked = ReactiveContext::enter_untracked();
                self.scope.run(|| (self.run)())?
            }
        }

        let runs = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(effect = %self.subscriber_id, runs, "effect ran");
        Ok(())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scope.dispose();
        Runtime::clear_dependencies(self.subscriber_id);

        if let Some(owner) = self.owner.get().and_then(Weak::upgrade) {
            Scope::from_inner(owner).release(self.subscriber_id);
        }
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {}

    fn missed_update(&self) -> bool {
        self.missed_update.load(Ordering::SeqCst)
    }

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("manual", &self.is_manual())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{on_cleanup, Signal};
    use std::sync::atomic::AtomicI32;

    fn counter() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn effect_runs_on_creation() {
        let (run_count, run_count_clone) = counter();

        let _effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let (run_count, run_count_clone) = counter();

        let effect = Effect::new_lazy(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_signal_changes() {
        let (run_count, run_count_clone) = counter();
        let signal = Signal::new(0);
        let reader = signal.clone();

        let effect = Effect::new(move || {
            reader.get();
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(effect.dependency_count(), 1);

        signal.set(1);
        signal.set(2);
        assert_eq!(run_count.load(Ordering::SeqCst), 3);

        effect.dispose();
    }

    #[test]
    fn effect_dependencies_follow_last_run() {
        let flag = Signal::new(true);
        let a = Signal::new(0);
        let b = Signal::new(0);
        let (run_count, run_count_clone) = counter();

        let (flag_r, a_r, b_r) = (flag.clone(), a.clone(), b.clone());
        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
            if flag_r.get() {
                a_r.get();
            } else {
                b_r.get();
            }
        });

        b.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        flag.set(false);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);

        a.set(1);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);

        b.set(2);
        assert_eq!(run_count.load(Ordering::SeqCst), 3);

        effect.dispose();
    }

    #[test]
    fn manual_effect_ignores_unlisted_reads() {
        let a = Signal::new(0);
        let b = Signal::new(0);
        let (run_count, run_count_clone) = counter();

        let (a_r, b_r) = (a.clone(), b.clone());
        let watched: Reader = Box::new(move || {
            a_r.get();
        });
        let effect = Effect::new_manual([watched], move || {
            b_r.get();
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(effect.is_manual());
        assert_eq!(effect.dependency_count(), 1);

        b.set(5);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        a.set(5);
        assert_eq!(run_count.load(Ordering::SeqCst), 2);

        effect.dispose();
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let (run_count, run_count_clone) = counter();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        effect.dispose();
        assert!(effect.is_disposed());

        effect.schedule();
        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let signal = Signal::new(0);
        let (cleanups, cleanups_clone) = counter();

        let reader = signal.clone();
        let effect = Effect::new(move || {
            reader.get();
            let cleanups = cleanups_clone.clone();
            on_cleanup(move || {
                cleanups.fetch_add(1, Ordering::SeqCst);
            });
        });
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        signal.set(1);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_effect_is_replaced_on_rerun() {
        let outer_signal = Signal::new(0);
        let inner_signal = Signal::new(0);
        let (inner_runs, inner_runs_clone) = counter();

        let (outer_r, inner_r) = (outer_signal.clone(), inner_signal.clone());
        let effect = Effect::new(move || {
            outer_r.get();
            let inner_r = inner_r.clone();
            let inner_runs = inner_runs_clone.clone();
            Effect::new(move || {
                inner_r.get();
                inner_runs.fetch_add(1, Ordering::SeqCst);
            });
        });
        assert_eq!(inner_runs.load(Ordering::SeqCst), 1);

        // Re-running the outer effect disposes the old inner one
        outer_signal.set(1);
        assert_eq!(inner_runs.load(Ordering::SeqCst), 2);

        inner_signal.set(1);
        assert_eq!(inner_runs.load(Ordering::SeqCst), 3);

        effect.dispose();
        inner_signal.set(2);
        assert_eq!(inner_runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn self_triggering_effect_is_bounded() {
        let signal = Signal::new(0);
        let writer = signal.clone();

        let effect = Effect::new(move || {
            let next = writer.get() + 1;
            writer.set(next);
        });

        let max = Runtime::config().max_update_depth as i32;
        assert_eq!(signal.get_untracked(), max);
        effect.dispose();
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());

        effect1.execute();
        assert_eq!(effect1.run_count(), 2);
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
