//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a dependency changes, the memo is marked "maybe dirty" and passes
//!    the notification on to its own dependents.
//!
//! 4. On next access, the memo recomputes, recording fresh dependencies.
//!
//! 5. If the recomputed value equals the cached one, the memo's version does
//!    not move, and effects reached only through this memo are not re-run.
//!
//! Memos that are never read stay dirty; no work is wasted on them.
//!
//! # Thread Safety
//!
//! The cached value and dirty state are protected by locks. The computation
//! runs with no lock held, so it may read other memos freely.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::subscriber::{SourceId, SubscriberId};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

struct MemoInner<T> {
    source_id: SourceId,
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: RwLock<MemoState>,
    version: AtomicU64,
    handle: OnceLock<ReactiveHandle>,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// The `PartialEq` bound lets the memo tell when a recomputation produced
/// the same value, so dependents are not disturbed for nothing.
pub struct Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            source_id: SourceId::new(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: RwLock::new(MemoState::Dirty),
            version: AtomicU64::new(0),
            handle: OnceLock::new(),
        });

        let handle = Runtime::register(inner.clone());
        let _ = inner.handle.set(handle);

        Self { inner }
    }

    /// Get the memo's unique source ID.
    pub fn id(&self) -> SourceId {
        self.inner.source_id
    }

    /// Get the subscriber ID for this memo.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// If called within a reactive context, the current computation becomes
    /// a dependent of this memo.
    pub fn get(&self) -> T {
        if let Some(current_subscriber) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.source_id);
            Runtime::add_dependency(self.inner.source_id, current_subscriber);
        }

        let state = *self.inner.state.read();
        if state == MemoState::Clean {
            if let Some(value) = self.inner.value.read().as_ref() {
                return value.clone();
            }
        }

        self.inner.recompute()
    }

    /// Number of times the cached value has changed.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Mark the memo as potentially needing recomputation.
    pub fn mark_maybe_dirty(&self) {
        self.inner.mark_maybe_dirty();
    }

    /// Mark the memo as definitely needing recomputation and notify its
    /// dependents.
    pub fn mark_dirty(&self) {
        *self.inner.state.write() = MemoState::Dirty;
        Runtime::notify_source_change(self.inner.source_id);
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.read()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.source_id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Run the computation within a reactive context to track dependencies.
    ///
    /// The version moves only if the new value differs from the cached one.
    fn recompute(&self) -> T {
        Runtime::clear_dependencies(self.subscriber_id);

        let new_value = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.compute)()
        };

        let changed = {
            let mut value = self.value.write();
            let changed = value.as_ref() != Some(&new_value);
            if changed {
                *value = Some(new_value.clone());
            }
            changed
        };
        if changed {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        *self.state.write() = MemoState::Clean;
        tracing::trace!(memo = %self.source_id, changed, "memo recomputed");

        new_value
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn source_id(&self) -> Option<SourceId> {
        Some(self.source_id)
    }

    fn mark_maybe_dirty(&self) {
        let mut state = self.state.write();
        if *state == MemoState::Clean {
            *state = MemoState::MaybeDirty;
        }
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn refresh(&self) -> u64 {
        if *self.state.read() != MemoState::Clean {
            self.recompute();
        }
        self.version.load(Ordering::SeqCst)
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source_id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
