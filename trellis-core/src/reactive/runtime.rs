//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It manages the dependency graph and schedules updates when
//! sources change.
//!
//! # How It Works
//!
//! 1. When a memo or effect is created, it registers with the runtime.
//!
//! 2. When a memo or effect reads a source, the runtime records the edge.
//!
//! 3. When a source's value changes, the runtime:
//!    a. Finds all dependent memos/effects
//!    b. Marks memos stale and follows their own dependents
//!    c. Collects every effect reached, each once
//!    d. Skips effects reached only through memos whose values came out
//!       unchanged, and runs the rest
//!
//! # Thread Safety
//!
//! The tracking context is thread-local; the registry and edge table are
//! global so that sources can be shared across threads. No lock is held
//! while user code (memo computations, effect bodies) runs.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use super::config::EngineConfig;
use super::context::ReactiveContext;
use super::error::{EngineError, EngineResult};
use super::subscriber::{SourceId, SubscriberId};

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// The source this reactive value exposes to its own dependents.
    ///
    /// Memos are both subscribers and sources; effects are only subscribers.
    fn source_id(&self) -> Option<SourceId> {
        None
    }

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Version of the cached value. It changes only when the value does.
    fn version(&self) -> u64 {
        0
    }

    /// Bring a lazy value up to date and return its version.
    fn refresh(&self) -> u64 {
        self.version()
    }

    /// Whether this effect skipped a run it was scheduled for.
    ///
    /// Such an effect re-runs on the next change that reaches it, even if no
    /// memo it reads ends up with a new value.
    fn missed_update(&self) -> bool {
        false
    }

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
    source_id: Option<SourceId>,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
        if let Some(source_id) = self.source_id {
            Runtime::remove_source(source_id);
        }
    }
}

/// Dependency edges, kept in both directions.
#[derive(Default)]
struct Edges {
    by_source: HashMap<SourceId, IndexSet<SubscriberId>>,
    by_subscriber: HashMap<SubscriberId, IndexSet<SourceId>>,
}

/// The global reactive runtime.
///
/// This is a singleton that manages all reactive values in the application.
pub struct Runtime;

// Maps subscriber IDs to weak references to avoid preventing cleanup.
static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>>> = OnceLock::new();
static EDGES: OnceLock<RwLock<Edges>> = OnceLock::new();
static CONFIG: OnceLock<RwLock<EngineConfig>> = OnceLock::new();

thread_local! {
    static UPDATE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn get_registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn get_edges() -> &'static RwLock<Edges> {
    EDGES.get_or_init(|| RwLock::new(Edges::default()))
}

fn get_config() -> &'static RwLock<EngineConfig> {
    CONFIG.get_or_init(|| RwLock::new(EngineConfig::default()))
}

/// Marks one level of nested effect execution. Dropping it steps back out.
pub struct UpdateGuard {
    _private: (),
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        UPDATE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl Runtime {
    /// Install a process-wide engine configuration.
    pub fn configure(config: EngineConfig) {
        tracing::debug!(?config, "reactive engine configured");
        *get_config().write() = config;
    }

    /// The configuration currently in effect.
    pub fn config() -> EngineConfig {
        get_config().read().clone()
    }

    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();
        let source_id = reactive.source_id();

        get_registry().write().insert(id, Arc::downgrade(&reactive));

        ReactiveHandle {
            subscriber_id: id,
            source_id,
        }
    }

    fn unregister(id: SubscriberId) {
        get_registry().write().remove(&id);
        Self::clear_dependencies(id);
    }

    /// Forget every edge that starts at `source_id`.
    ///
    /// Called when the last handle to a signal or memo goes away.
    pub fn remove_source(source_id: SourceId) {
        let mut edges = get_edges().write();
        if let Some(subscribers) = edges.by_source.remove(&source_id) {
            for subscriber in subscribers {
                if let Some(sources) = edges.by_subscriber.get_mut(&subscriber) {
                    sources.shift_remove(&source_id);
                }
            }
        }
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    /// Recording the same edge twice has no effect.
    pub fn add_dependency(source_id: SourceId, subscriber_id: SubscriberId) {
        let mut edges = get_edges().write();
        edges
            .by_source
            .entry(source_id)
            .or_default()
            .insert(subscriber_id);
        edges
            .by_subscriber
            .entry(subscriber_id)
            .or_default()
            .insert(source_id);
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let mut edges = get_edges().write();
        if let Some(sources) = edges.by_subscriber.remove(&subscriber_id) {
            for source in sources {
                if let Some(subscribers) = edges.by_source.get_mut(&source) {
                    subscribers.shift_remove(&subscriber_id);
                    if subscribers.is_empty() {
                        edges.by_source.remove(&source);
                    }
                }
            }
        }
    }

    /// Number of live subscribers reading `source_id`.
    pub fn subscriber_count(source_id: SourceId) -> usize {
        get_edges()
            .read()
            .by_source
            .get(&source_id)
            .map_or(0, IndexSet::len)
    }

    /// Number of sources `subscriber_id` read during its last run.
    pub fn dependency_count(subscriber_id: SubscriberId) -> usize {
        get_edges()
            .read()
            .by_subscriber
            .get(&subscriber_id)
            .map_or(0, IndexSet::len)
    }

    /// Resolve the live subscribers of a source. No lock is held on return.
    fn subscribers_of(source_id: SourceId) -> Vec<Arc<dyn Reactive>> {
        let ids: Vec<SubscriberId> = {
            let edges = get_edges().read();
            match edges.by_source.get(&source_id) {
                Some(subscribers) => subscribers.iter().copied().collect(),
                None => return Vec::new(),
            }
        };

        let registry = get_registry().read();
        ids.into_iter()
            .filter_map(|id| registry.get(&id).and_then(Weak::upgrade))
            .collect()
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism. Memos pass the
    /// notification on to their own dependents whether or not they were
    /// already stale. Every effect reached is considered once, in the order
    /// it subscribed. An effect that reads `source_id` itself always runs;
    /// one reached only through memos runs if one of those memos recomputes
    /// to a different value.
    pub fn notify_source_change(source_id: SourceId) {
        // Effects reached, and whether they read `source_id` directly
        let mut effects: IndexMap<SubscriberId, (Arc<dyn Reactive>, bool)> = IndexMap::new();
        // Memos reached, with the version each held before this change
        let mut memos: HashMap<SourceId, (Arc<dyn Reactive>, u64)> = HashMap::new();
        let mut visited: HashSet<SourceId> = HashSet::from([source_id]);
        let mut pending = vec![source_id];

        while let Some(source) = pending.pop() {
            let direct = source == source_id;
            for reactive in Self::subscribers_of(source) {
                if reactive.is_eager() {
                    let entry = effects
                        .entry(reactive.subscriber_id())
                        .or_insert_with(|| (reactive, false));
                    entry.1 |= direct;
                    continue;
                }

                reactive.mark_maybe_dirty();
                if let Some(next) = reactive.source_id() {
                    if visited.insert(next) {
                        let version = reactive.version();
                        memos.insert(next, (reactive, version));
                        pending.push(next);
                    }
                }
            }
        }

        if effects.is_empty() {
            return;
        }

        // Decide for every effect before running any of them, so that one
        // effect reading a memo does not hide the change from the next.
        let to_run: Vec<Arc<dyn Reactive>> = effects
            .into_values()
            .filter(|(effect, direct)| {
                *direct
                    || effect.missed_update()
                    || Self::reads_changed_memo(effect.subscriber_id(), &memos)
            })
            .map(|(effect, _)| effect)
            .collect();

        tracing::trace!(%source_id, effects = to_run.len(), "propagating change");

        for effect in to_run {
            effect.schedule();
        }
    }

    /// Whether any memo in `memos` that `subscriber_id` reads now holds a
    /// different value than before the change.
    fn reads_changed_memo(
        subscriber_id: SubscriberId,
        memos: &HashMap<SourceId, (Arc<dyn Reactive>, u64)>,
    ) -> bool {
        let sources: Vec<SourceId> = get_edges()
            .read()
            .by_subscriber
            .get(&subscriber_id)
            .map(|sources| sources.iter().copied().collect())
            .unwrap_or_default();

        sources.into_iter().any(|source| match memos.get(&source) {
            Some((memo, before)) => memo.refresh() != *before,
            None => false,
        })
    }

    /// Step one level deeper into nested effect execution.
    ///
    /// Fails once the configured `max_update_depth` is reached.
    pub fn enter_update() -> EngineResult<UpdateGuard> {
        let max = get_config().read().max_update_depth;
        UPDATE_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max {
                return Err(EngineError::UpdateDepthExceeded { depth: current });
            }
            depth.set(current + 1);
            Ok(UpdateGuard { _private: () })
        })
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

    struct MockReactive {
        id: SubscriberId,
        source: Option<SourceId>,
        dirty: AtomicBool,
        scheduled: AtomicI32,
        eager: bool,
        // Whether a refresh produces a new value
        changes: bool,
        version: AtomicU64,
    }

    impl MockReactive {
        fn new(eager: bool) -> Arc<Self> {
            Self::build(eager, true)
        }

        fn unchanging_memo() -> Arc<Self> {
            Self::build(false, false)
        }

        fn build(eager: bool, changes: bool) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                source: if eager { None } else { Some(SourceId::new()) },
                dirty: AtomicBool::new(false),
                scheduled: AtomicI32::new(0),
                eager,
                changes,
                version: AtomicU64::new(0),
            })
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn source_id(&self) -> Option<SourceId> {
            self.source
        }

        fn mark_maybe_dirty(&self) {
            self.dirty.store(true, Ordering::SeqCst);
        }

        fn version(&self) -> u64 {
            self.version.load(Ordering::SeqCst)
        }

        fn refresh(&self) -> u64 {
            if self.changes && self.dirty.swap(false, Ordering::SeqCst) {
                self.version.fetch_add(1, Ordering::SeqCst) + 1
            } else {
                self.version()
            }
        }

        fn schedule(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;

        let handle = Runtime::register(reactive);
        assert!(get_registry().read().contains_key(&id));

        drop(handle);
        assert!(!get_registry().read().contains_key(&id));
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(source, effect.id);

        Runtime::notify_source_change(source);

        assert!(memo.dirty.load(Ordering::SeqCst));

        // Only the effect is eager
        assert_eq!(memo.scheduled.load(Ordering::SeqCst), 0);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn change_propagates_through_memos() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);

        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stale_memo_still_passes_changes_on() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        // Already stale before the change arrives
        memo.mark_maybe_dirty();
        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unchanged_memo_does_not_reach_effect() {
        let memo = MockReactive::unchanging_memo();
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);
        assert!(memo.dirty.load(Ordering::SeqCst));
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn memo_cycle_terminates() {
        let first = MockReactive::new(false);
        let second = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _handles = [
            Runtime::register(first.clone()),
            Runtime::register(second.clone()),
            Runtime::register(effect.clone()),
        ];

        Runtime::add_dependency(source, first.id);
        Runtime::add_dependency(first.source.unwrap(), second.id);
        Runtime::add_dependency(second.source.unwrap(), first.id);
        Runtime::add_dependency(second.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reached_twice_runs_once() {
        let effect = MockReactive::new(true);
        let memo = MockReactive::new(false);
        let source = SourceId::new();

        let _effect_handle = Runtime::register(effect.clone());
        let _memo_handle = Runtime::register(memo.clone());

        Runtime::add_dependency(source, effect.id);
        Runtime::add_dependency(source, effect.id);
        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_clears_dependencies() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;
        let source = SourceId::new();

        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, id);
        assert_eq!(Runtime::subscriber_count(source), 1);
        assert_eq!(Runtime::dependency_count(id), 1);

        Runtime::clear_dependencies(id);
        assert_eq!(Runtime::subscriber_count(source), 0);
        assert_eq!(Runtime::dependency_count(id), 0);
    }

    #[test]
    fn removed_source_drops_its_edges() {
        let reactive = MockReactive::new(true);
        let source = SourceId::new();
        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, reactive.id);
        Runtime::remove_source(source);

        assert_eq!(Runtime::subscriber_count(source), 0);
        assert_eq!(Runtime::dependency_count(reactive.id), 0);
    }

    #[test]
    fn update_depth_is_bounded() {
        let max = Runtime::config().max_update_depth;
        let mut guards = Vec::new();
        for _ in 0..max {
            guards.push(Runtime::enter_update().unwrap());
        }

        assert_eq!(
            Runtime::enter_update().err(),
            Some(EngineError::UpdateDepthExceeded { depth: max })
        );

        guards.pop();
        assert!(Runtime::enter_update().is_ok());
    }
}
