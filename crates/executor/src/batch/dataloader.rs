use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt,
    hash::Hash,
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};

use super::Lazy;
use crate::{FieldError, Resolved};

/// Fetches many keys at once.
pub trait Loader<K>: 'static {
    type Value: Clone + Into<Resolved>;
    type Error: fmt::Display;

    /// Keys missing from the returned map resolve to `null`.
    fn load(&self, keys: &[K]) -> Result<HashMap<K, Self::Value>, Self::Error>;
}

type CacheEntry<V> = Result<Option<V>, FieldError>;

/// Request-scoped handle on a [`Loader`], obtained with [`Dataloader::with`].
pub struct Source<K, L: Loader<K>> {
    inner: Rc<SourceInner<K, L>>,
}

impl<K, L: Loader<K>> Clone for Source<K, L> {
    fn clone(&self) -> Self {
        Source {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct SourceInner<K, L: Loader<K>> {
    loader: L,
    pending: RefCell<IndexSet<K>>,
    cache: RefCell<HashMap<K, CacheEntry<L::Value>>>,
}

impl<K, L> Source<K, L>
where
    K: Clone + Eq + Hash + 'static,
    L: Loader<K>,
{
    /// Registers `key` for the next batch. Cached keys are ready immediately.
    pub fn load(&self, key: K) -> Lazy {
        if let Some(cached) = self.inner.cached(&key) {
            return Lazy::ready(cached);
        }
        self.inner.pending.borrow_mut().insert(key.clone());
        let inner = Rc::clone(&self.inner);
        Lazy::new(move || inner.fetch(key))
    }

    pub fn load_many(&self, keys: impl IntoIterator<Item = K>) -> Resolved {
        Resolved::List(keys.into_iter().map(|key| Resolved::Lazy(self.load(key))).collect())
    }

    /// Stores a value for `key` without calling the loader.
    pub fn prime(&self, key: K, value: L::Value) {
        self.inner.pending.borrow_mut().shift_remove(&key);
        self.inner.cache.borrow_mut().insert(key, Ok(Some(value)));
    }

    pub fn run_pending(&self) -> bool {
        self.inner.run_batch()
    }
}

impl<K, L> SourceInner<K, L>
where
    K: Clone + Eq + Hash + 'static,
    L: Loader<K>,
{
    fn cached(&self, key: &K) -> Option<Resolved> {
        self.cache.borrow().get(key).map(|entry| match entry {
            Ok(Some(value)) => value.clone().into(),
            Ok(None) => Resolved::null(),
            Err(error) => Resolved::Error(error.clone()),
        })
    }

    fn fetch(&self, key: K) -> Resolved {
        if let Some(cached) = self.cached(&key) {
            return cached;
        }
        // The cache may have been cleared since the key was registered.
        self.pending.borrow_mut().insert(key.clone());
        self.run_batch();
        self.cached(&key).unwrap_or_else(Resolved::null)
    }

    fn run_batch(&self) -> bool {
        let keys: Vec<K> = std::mem::take(&mut *self.pending.borrow_mut()).into_iter().collect();
        if keys.is_empty() {
            return false;
        }

        tracing::debug!(loader = std::any::type_name::<L>(), keys = keys.len(), "running batch");

        let outcome = self.loader.load(&keys);
        let mut cache = self.cache.borrow_mut();
        match outcome {
            Ok(mut values) => {
                for key in keys {
                    let value = values.remove(&key);
                    cache.insert(key, Ok(value));
                }
            }
            Err(err) => {
                let error = FieldError::new(err.to_string());
                for key in keys {
                    cache.insert(key, Err(error.clone()));
                }
            }
        }
        true
    }
}

trait ErasedSource {
    fn run_pending(&self) -> bool;
    fn clear_cache(&self);
}

impl<K, L> ErasedSource for SourceInner<K, L>
where
    K: Clone + Eq + Hash + 'static,
    L: Loader<K>,
{
    fn run_pending(&self) -> bool {
        self.run_batch()
    }

    fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

struct RegisteredSource {
    any: Rc<dyn Any>,
    erased: Rc<dyn ErasedSource>,
}

/// Per-request registry of batch sources, one per key and loader type.
#[derive(Default)]
pub struct Dataloader {
    sources: RefCell<IndexMap<TypeId, RegisteredSource>>,
}

impl Dataloader {
    /// Returns the source of this loader type, creating it with `init` on first use.
    pub fn with<K, L>(&self, init: impl FnOnce() -> L) -> Source<K, L>
    where
        K: Clone + Eq + Hash + 'static,
        L: Loader<K>,
    {
        let type_id = TypeId::of::<SourceInner<K, L>>();
        if let Some(registered) = self.sources.borrow().get(&type_id) {
            if let Ok(inner) = Rc::clone(&registered.any).downcast::<SourceInner<K, L>>() {
                return Source { inner };
            }
        }

        let inner = Rc::new(SourceInner {
            loader: init(),
            pending: RefCell::new(IndexSet::new()),
            cache: RefCell::new(HashMap::new()),
        });
        self.sources.borrow_mut().insert(
            type_id,
            RegisteredSource {
                any: inner.clone(),
                erased: inner.clone(),
            },
        );
        Source { inner }
    }

    /// Runs one batch for every source with registered keys. Returns whether any batch ran.
    pub fn run_pending(&self) -> bool {
        let sources = self.erased_sources();
        let mut ran = false;
        for source in sources {
            ran |= source.run_pending();
        }
        ran
    }

    pub fn clear_cache(&self) {
        for source in self.erased_sources() {
            source.clear_cache();
        }
    }

    // Collected first so loaders never run while the registry is borrowed.
    fn erased_sources(&self) -> Vec<Rc<dyn ErasedSource>> {
        self.sources
            .borrow()
            .values()
            .map(|registered| Rc::clone(&registered.erased))
            .collect()
    }
}

impl fmt::Debug for Dataloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataloader")
            .field("sources", &self.sources.borrow().len())
            .finish()
    }
}
