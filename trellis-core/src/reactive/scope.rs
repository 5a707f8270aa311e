//! Ownership Scopes
//!
//! A scope owns the effects created while it is current and the cleanup
//! callbacks registered while it is current. Disposing a scope disposes
//! those effects and runs those cleanups.
//!
//! Scopes form a tree through effects: every effect has its own scope,
//! which is current while the effect body runs. Anything the body creates
//! belongs to the effect and is torn down before the effect runs again.
//!
//! Root scopes are kept alive by a global table until they are disposed,
//! so effects inside a root keep running after the code that created the
//! root has returned. Work created with no scope current lands in the
//! detached scope, which is never disposed.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::effect::Effect;
use super::error::{EngineError, EngineResult};
use super::runtime::Runtime;
use super::subscriber::SubscriberId;

/// A callback run when its scope is torn down.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// Unique identifier for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Root,
    Effect,
    Detached,
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    kind: ScopeKind,
    effects: Mutex<Vec<Effect>>,
    cleanups: Mutex<Vec<Cleanup>>,
    disposed: AtomicBool,
}

/// A disposable ownership boundary for effects and cleanups.
///
/// Cloning a scope yields another handle to the same scope.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

static ROOTS: OnceLock<DashMap<ScopeId, Scope>> = OnceLock::new();
static DETACHED: OnceLock<Scope> = OnceLock::new();

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

fn get_roots() -> &'static DashMap<ScopeId, Scope> {
    ROOTS.get_or_init(DashMap::new)
}

/// Pops the scope stack when dropped, even if the scoped code panics.
struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Scope {
    fn with_kind(kind: ScopeKind) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: ScopeId::new(),
                kind,
                effects: Mutex::new(Vec::new()),
                cleanups: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Create a root scope.
    ///
    /// The root stays alive until [`Scope::dispose`] is called on it.
    pub fn root() -> Self {
        let scope = Self::with_kind(ScopeKind::Root);
        let roots = get_roots();
        roots.insert(scope.id(), scope.clone());
        tracing::debug!(scope = %scope.id(), live_roots = roots.len(), "root scope created");
        scope
    }

    pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
        Arc::downgrade(&self.inner)
    }

    /// Scope owned by a single effect.
    pub(crate) fn for_effect() -> Self {
        Self::with_kind(ScopeKind::Effect)
    }

    /// The scope that owns work created outside every other scope.
    pub fn detached() -> Self {
        DETACHED
            .get_or_init(|| Self::with_kind(ScopeKind::Detached))
            .clone()
    }

    /// The innermost scope on this thread, if any.
    pub fn current() -> Option<Self> {
        SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// The current scope, falling back to the detached one.
    ///
    /// `what` names the thing being attached, for the warning.
    pub(crate) fn current_or_detached(what: &str) -> Self {
        match Self::current() {
            Some(scope) => scope,
            None => {
                if Runtime::config().warn_detached {
                    tracing::warn!("{what} created outside any scope; it will never be disposed");
                }
                Self::detached()
            }
        }
    }

    /// Number of root scopes that have not been disposed.
    pub fn live_roots() -> usize {
        get_roots().len()
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn is_root(&self) -> bool {
        self.inner.kind == ScopeKind::Root
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Run `f` with this scope as the current scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> EngineResult<R> {
        if self.is_disposed() {
            return Err(EngineError::ScopeDisposed(self.id()));
        }
        Ok(self.enter(f))
    }

    /// Like [`Scope::run`], for callers that already know the scope is live.
    pub(crate) fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = StackGuard;
        f()
    }

    /// Register a callback to run when this scope is disposed.
    ///
    /// If the scope is already gone the callback runs immediately.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            tracing::debug!(scope = %self.id(), "cleanup registered on disposed scope; running now");
            cleanup();
            return;
        }
        self.inner.cleanups.lock().push(Box::new(cleanup));
    }

    pub(crate) fn adopt(&self, effect: Effect) {
        if self.is_disposed() {
            effect.dispose();
            return;
        }
        self.inner.effects.lock().push(effect);
    }

    /// Stop owning the effect `id`. Called when that effect is disposed on
    /// its own, so long-lived scopes do not hold on to dead effects.
    pub(crate) fn release(&self, id: SubscriberId) {
        let released = {
            let mut effects = self.inner.effects.lock();
            effects
                .iter()
                .position(|effect| effect.id() == id)
                .map(|index| effects.remove(index))
        };
        // Dropped here, with the lock released
        drop(released);
    }

    #[cfg(test)]
    pub(crate) fn owns(&self, id: SubscriberId) -> bool {
        self.inner.effects.lock().iter().any(|effect| effect.id() == id)
    }

    /// Number of effects currently owned by this scope.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.lock().len()
    }

    /// Tear down everything owned so far but keep the scope usable.
    ///
    /// Owned effects go first, then cleanups in reverse registration order.
    pub(crate) fn reset(&self) {
        let effects = std::mem::take(&mut *self.inner.effects.lock());
        for effect in effects {
            effect.dispose();
        }

        let cleanups = std::mem::take(&mut *self.inner.cleanups.lock());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    /// Dispose this scope. Calling this more than once has no effect.
    ///
    /// The detached scope cannot be disposed.
    pub fn dispose(&self) {
        if self.inner.kind == ScopeKind::Detached {
            tracing::warn!("the detached scope cannot be disposed");
            return;
        }
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.reset();

        if self.is_root() {
            get_roots().remove(&self.id());
            tracing::debug!(scope = %self.id(), "root scope disposed");
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("effect_count", &self.effect_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Register a cleanup on the current scope.
pub fn on_cleanup(cleanup: impl FnOnce() + Send + 'static) {
    Scope::current_or_detached("cleanup").on_cleanup(cleanup);
}
