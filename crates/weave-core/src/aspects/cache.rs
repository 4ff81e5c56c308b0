//! Caching aspect
//!
//! Outermost wrapper of any chain it joins: it enters first and exits last,
//! so it stores the result after every other aspect has had its say. On a
//! hit it short-circuits the call with the stored value.

use crate::aspect::Aspect;
use crate::context::{MethodContext, ReturnValue};
use crate::errors::AspectError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Storage consulted by [`CacheAspect`]
pub trait CacheStore: Send + Sync + 'static {
    /// Stored value for `key`
    fn get(&self, key: &str) -> Option<ReturnValue>;

    /// Store `value` under `key`
    fn store(&self, key: &str, value: ReturnValue);

    /// Called after a hit, for stores that refresh expiry
    fn touch(&self, key: &str, value: &ReturnValue) {
        let _ = (key, value);
    }
}

/// In-process store backed by a hash map
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, ReturnValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `key` is stored
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Lookups that found a value
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<ReturnValue> {
        let found = self.entries.read().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn store(&self, key: &str, value: ReturnValue) {
        self.entries.write().insert(key.to_string(), value);
    }
}

impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn get(&self, key: &str) -> Option<ReturnValue> {
        (**self).get(key)
    }

    fn store(&self, key: &str, value: ReturnValue) {
        (**self).store(key, value);
    }

    fn touch(&self, key: &str, value: &ReturnValue) {
        (**self).touch(key, value);
    }
}

/// Key and hit flag carried from `on_enter` to `on_exit`
#[derive(Debug, Clone)]
struct Probe {
    key: String,
    hit: bool,
}

/// Caches method results by receiver type, method and argument values
pub struct CacheAspect<S: CacheStore = MemoryCacheStore> {
    store: Arc<S>,
}

impl CacheAspect<MemoryCacheStore> {
    /// Cache backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }
}

impl<S: CacheStore> CacheAspect<S> {
    /// Cache backed by `store`
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Deterministic key for a call: `Type.method|name:value|name:value`.
///
/// Values use their canonical rendering, so structurally equal arguments map
/// to the same key across calls.
pub fn cache_key(ctx: &MethodContext<'_>) -> String {
    let mut key = format!("{}.{}", ctx.receiver_short_type(), ctx.method_name());
    for param in ctx.parameters() {
        key.push('|');
        key.push_str(param.name());
        key.push(':');
        key.push_str(&param.canonical());
    }
    key
}

impl<S: CacheStore> Aspect for CacheAspect<S> {
    fn name(&self) -> &str {
        "cache"
    }

    fn enter_priority(&self) -> i32 {
        i32::MIN + 1
    }

    fn exit_priority(&self) -> i32 {
        i32::MAX - 1
    }

    fn on_enter(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let key = cache_key(ctx);
        let hit = match self.store.get(&key) {
            Some(value) => {
                ctx.set_result_value(value);
                true
            }
            None => false,
        };
        trace!(key = %key, hit, "Cache lookup");
        ctx.stash(Probe { key, hit });
        Ok(())
    }

    fn on_exit(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let Some(probe) = ctx.unstash::<Probe>() else {
            return Ok(());
        };
        let Some(value) = ctx.result_value().cloned() else {
            return Ok(());
        };

        if probe.hit {
            self.store.touch(&probe.key, &value);
        } else if !value.is::<()>() {
            self.store.store(&probe.key, value);
        }
        Ok(())
    }
}
