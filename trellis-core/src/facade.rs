//! Reactive Facade
//!
//! One small vocabulary over any [`Backend`]:
//!
//! - [`Facade::use_root`] runs code inside a disposable scope
//! - [`Facade::use_prop`] creates a mutable value
//! - [`Facade::use_formula`] creates a derived value
//! - [`Facade::do_watch`] registers an effect
//! - [`Facade::on_dispose`] registers a teardown callback
//! - [`do_now`] and [`exists`] are plain helpers
//!
//! The facade keeps no state besides the backend it was built with. Every
//! reactive guarantee (when effects re-run, how derived values are cached,
//! what happens on disposal) is whatever the backend provides.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::backend::NativeBackend;
//! use trellis_core::Facade;
//!
//! let rx = Facade::new(NativeBackend::new());
//!
//! let counter = rx.use_prop(0);
//! let doubled = {
//!     let counter = counter.clone();
//!     rx.use_formula(move || counter.get() * 2)
//! };
//!
//! assert_eq!(doubled.get(), 0);
//! counter.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::contract::{Backend, ComputedParts, ManualEffect, SignalParts, Track};
use crate::error::{FacadeError, FacadeResult};

/// The bound set of facade operations.
///
/// Cloning is cheap; clones share the backend.
pub struct Facade<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Facade<B> {
    /// Bind the facade to `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Bind the facade to a backend that is already shared.
    pub fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `f` inside a new root scope and return what it returns.
    ///
    /// How long the root lives is up to the backend. On
    /// [`NativeBackend`](crate::backend::NativeBackend) it lives until its
    /// [`Scope`](crate::reactive::Scope) is disposed; grab it inside `f`
    /// with [`Scope::current`](crate::reactive::Scope::current), or it is
    /// kept for the rest of the process.
    pub fn use_root<R>(&self, f: impl FnOnce() -> R) -> R {
        self.backend.create_root(f)
    }

    /// Create a mutable reactive value.
    pub fn use_prop<T>(&self, initial: T) -> Prop<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Prop {
            parts: self.backend.create_signal(initial),
        }
    }

    /// Create a read-only derived value.
    ///
    /// Writes to the returned formula are discarded. A recomputation that
    /// yields an equal value does not re-run watchers on engines that
    /// compare values, such as [`NativeBackend`](crate::backend::NativeBackend).
    pub fn use_formula<T>(&self, compute: impl Fn() -> T + Send + Sync + 'static) -> Formula<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Formula {
            parts: self.backend.create_computed(Box::new(compute)),
            setter: None,
        }
    }

    /// Create a derived value whose writes go to `setter`.
    ///
    /// The written type `S` defaults to the computed type but can differ.
    pub fn use_formula_with_setter<T, S>(
        &self,
        compute: impl Fn() -> T + Send + Sync + 'static,
        setter: impl Fn(S) + Send + Sync + 'static,
    ) -> Formula<T, S>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Formula {
            parts: self.backend.create_computed(Box::new(compute)),
            setter: Some(Arc::new(setter)),
        }
    }

    /// Call `f` right away and return its result.
    pub fn do_now<R>(&self, f: impl FnOnce() -> R) -> R {
        do_now(f)
    }

    /// Register an effect.
    ///
    /// `f` runs once immediately. With no `on` list it re-runs whenever
    /// anything it read during its last run changes. With an `on` list
    /// (even an empty one) it re-runs only when a listed value changes.
    pub fn do_watch(&self, f: impl Fn() + Send + Sync + 'static, options: WatchOptions) {
        match options.on {
            Some(on) => self.backend.create_manual_effect(ManualEffect {
                on,
                run: Box::new(f),
            }),
            None => self.backend.create_auto_effect(Box::new(f)),
        }
    }

    /// Register `f` to run when the current scope is torn down.
    pub fn on_dispose(&self, f: impl FnOnce() + Send + 'static) {
        self.backend.on_dispose(Box::new(f));
    }

    /// See [`exists`].
    pub fn exists<T: Exists + ?Sized>(&self, value: &T) -> bool {
        exists(value)
    }
}

impl<B: Backend> Clone for Facade<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend + fmt::Debug> fmt::Debug for Facade<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facade")
            .field("backend", &self.backend)
            .finish()
    }
}

/// A mutable reactive value.
///
/// Clones refer to the same value.
pub struct Prop<T> {
    parts: SignalParts<T>,
}

impl<T> Prop<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Read the value. Tracked.
    pub fn get(&self) -> T {
        (self.parts.get)()
    }

    /// Read the value and pass it to `f`. Tracked.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Store a new value and notify dependents.
    ///
    /// Anything convertible into `T` is accepted.
    pub fn set(&self, value: impl Into<T>) {
        (self.parts.set)(value.into());
    }
}

impl<T> Clone for Prop<T> {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
        }
    }
}

impl<T> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reading the value here would register a dependency.
        f.debug_struct("Prop").finish_non_exhaustive()
    }
}

impl<T> Track for Prop<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn track(&self) {
        let _ = self.get();
    }
}

/// A derived reactive value, optionally writable through a setter.
pub struct Formula<T, S = T> {
    parts: ComputedParts<T>,
    setter: Option<Arc<dyn Fn(S) + Send + Sync>>,
}

impl<T, S> Formula<T, S>
where
    T: Clone + Send + Sync + 'static,
{
    /// Read the derived value. Tracked.
    pub fn get(&self) -> T {
        (self.parts.get)()
    }

    /// Read the derived value and pass it to `f`. Tracked.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Forward `value` to the setter.
    ///
    /// Without a setter the write is silently discarded.
    pub fn set(&self, value: S) {
        if self.try_set(value).is_err() {
            tracing::trace!("write to read-only formula discarded");
        }
    }

    /// Forward `value` to the setter, or report that there is none.
    pub fn try_set(&self, value: S) -> FacadeResult<()> {
        match &self.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => Err(FacadeError::ReadOnlyFormula),
        }
    }

    /// Whether writes reach a setter.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl<T, S> Clone for Formula<T, S> {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T, S> fmt::Debug for Formula<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("writable", &self.setter.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, S> Track for Formula<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: 'static,
{
    fn track(&self) {
        let _ = self.get();
    }
}

/// Options for [`Facade::do_watch`].
#[derive(Clone, Default)]
pub struct WatchOptions {
    on: Option<Vec<Arc<dyn Track>>>,
}

impl WatchOptions {
    /// Auto-tracking, no explicit sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `source` explicitly. Switches the effect to manual tracking.
    pub fn on<W>(mut self, source: &W) -> Self
    where
        W: Track + Clone + 'static,
    {
        self.on
            .get_or_insert_with(Vec::new)
            .push(Arc::new(source.clone()));
        self
    }

    /// Watch exactly `sources`. An empty list still means manual tracking.
    pub fn on_sources(sources: impl IntoIterator<Item = Arc<dyn Track>>) -> Self {
        Self {
            on: Some(sources.into_iter().collect()),
        }
    }

    /// Whether these options select manual tracking.
    pub fn is_manual(&self) -> bool {
        self.on.is_some()
    }
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("on", &self.on.as_ref().map(Vec::len))
            .finish()
    }
}

/// Call `f` right away and return its result.
pub fn do_now<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Values that may be missing.
pub trait Exists {
    /// `false` only for the type's "missing" sentinel.
    fn exists(&self) -> bool;
}

impl<T> Exists for Option<T> {
    fn exists(&self) -> bool {
        self.is_some()
    }
}

impl<T: ?Sized> Exists for *const T {
    fn exists(&self) -> bool {
        !self.is_null()
    }
}

impl<T: ?Sized> Exists for *mut T {
    fn exists(&self) -> bool {
        !self.is_null()
    }
}

impl Exists for serde_json::Value {
    fn exists(&self) -> bool {
        !self.is_null()
    }
}

impl<T: Exists + ?Sized> Exists for &T {
    fn exists(&self) -> bool {
        (**self).exists()
    }
}

/// `true` unless `value` is its type's "missing" sentinel.
///
/// `None`, null pointers and JSON `null` are missing. `Some(0)`,
/// `Some("")` and `Some(false)` all exist.
pub fn exists<T: Exists + ?Sized>(value: &T) -> bool {
    value.exists()
}
