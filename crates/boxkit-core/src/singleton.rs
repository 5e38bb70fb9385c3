//! Lazily constructed, process-shared instances.
//!
//! [`Singleton`] is a single slot guarded by double-checked locking: readers
//! take a shared read lock, and only a caller that finds the slot empty takes
//! the init mutex, re-checks, and runs the constructor. [`SingletonRegistry`]
//! keeps one slot per Rust type so unrelated components can share state
//! (connection pools, the blocking runtime) without threading handles around.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

/// A lazily initialised shared instance of `T`.
pub struct Singleton<T> {
    instance: RwLock<Option<Arc<T>>>,
    init_lock: Mutex<()>,
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Singleton<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Singleton")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl<T> Singleton<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            instance: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// The instance, if it has been constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.instance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.get().is_some()
    }

    /// Return the instance, constructing it with `init` on first use.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        match self.get_or_try_init(|| Ok::<T, Infallible>(init())) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    ///
    /// A failed constructor leaves the slot empty so a later call can retry.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        if let Some(existing) = self.get() {
            return Ok(existing);
        }

        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished construction while we waited.
        if let Some(existing) = self.get() {
            return Ok(existing);
        }

        let instance = Arc::new(init()?);
        *self
            .instance
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&instance));
        Ok(instance)
    }
}

// ============================================================================
// Registry
// ============================================================================

type Slot = Arc<dyn Any + Send + Sync>;

static GLOBAL_REGISTRY: LazyLock<SingletonRegistry> = LazyLock::new(SingletonRegistry::new);

/// One [`Singleton`] slot per Rust type.
#[derive(Default)]
pub struct SingletonRegistry {
    slots: Mutex<HashMap<TypeId, Slot>>,
}

impl SingletonRegistry {
    /// Create an empty registry. Most callers want [`global`](Self::global).
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    /// Fetch (or create) the slot for `T`.
    ///
    /// The map lock is released before the caller touches the slot, so a
    /// constructor may request other singletons from the same registry.
    fn slot<T: Send + Sync + 'static>(&self) -> Arc<Singleton<T>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                slots
                    .entry(TypeId::of::<T>())
                    .or_insert_with(|| Arc::new(Singleton::<T>::new()) as Slot),
            )
        };

        match slot.downcast::<Singleton<T>>() {
            Ok(slot) => slot,
            Err(_) => unreachable!("registry slots are keyed by TypeId"),
        }
    }

    /// The instance of `T`, if one has been constructed.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.slot::<T>().get()
    }

    /// Return the shared `T`, constructing it with `init` on first use.
    pub fn get_or_init<T: Send + Sync + 'static>(&self, init: impl FnOnce() -> T) -> Arc<T> {
        self.slot::<T>().get_or_init(init)
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    pub fn get_or_try_init<T: Send + Sync + 'static, E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        self.slot::<T>().get_or_try_init(init)
    }
}
