//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, the runtime notifies all subscribers.
//!
//! 3. Notifications trigger re-execution of dependent effects and mark
//!    dependent memos stale.
//!
//! # Thread Safety
//!
//! Signals are thread-safe. The value is protected by a RwLock and clones
//! share the same cell.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::SourceId;

struct SignalInner<T> {
    id: SourceId,
    value: RwLock<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::remove_source(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    fn track(&self) {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.id);
            Runtime::add_dependency(self.inner.id, subscriber_id);
        }
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.read().clone()
    }

    /// Read the current value and pass it to `f`, tracking the read.
    ///
    /// `f` sees a copy, so it may write this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        tracing::trace!(signal = %self.inner.id, "signal set");
        Runtime::notify_source_change(self.inner.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current));
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
