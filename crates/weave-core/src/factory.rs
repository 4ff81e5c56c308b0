//! Substitute factory
//!
//! Public entry point of the weaving system. Hands out proxies for real
//! objects and caches the synthesized weaving of each contract type so the
//! builder runs once per contract.
//!
//! The cache is single-flight: concurrent first requests for the same
//! contract share one cell, one caller synthesizes and the others block until
//! the result is published. Failures are cached as well and re-raised on every
//! later request until the entry is cleared.

use crate::aspect::{Aspect, SharedAspect};
use crate::builder::{ProxyBuilder, Weaving};
use crate::config::WeaveConfig;
use crate::contract::{Contract, ProxyType};
use crate::errors::{Result, SynthesisError};
use crate::registry::AspectRegistry;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

type CacheCell = Arc<OnceCell<std::result::Result<Arc<Weaving>, SynthesisError>>>;

/// Creates proxies and owns the weaving cache
pub struct AspectFactory {
    config: WeaveConfig,
    builder: ProxyBuilder,
    registry: Arc<AspectRegistry>,
    cache: Mutex<HashMap<TypeId, CacheCell>>,
    syntheses: AtomicUsize,
}

impl Default for AspectFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AspectFactory {
    /// Factory with default configuration and an empty registry
    pub fn new() -> Self {
        Self::with_config(WeaveConfig::default())
    }

    /// Factory with the given configuration and an empty registry
    pub fn with_config(config: WeaveConfig) -> Self {
        Self::with_registry(config, Arc::new(AspectRegistry::new()))
    }

    /// Factory sharing an existing registry
    pub fn with_registry(config: WeaveConfig, registry: Arc<AspectRegistry>) -> Self {
        Self {
            builder: ProxyBuilder::new(config.clone()),
            config,
            registry,
            cache: Mutex::new(HashMap::new()),
            syntheses: AtomicUsize::new(0),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Registry read at synthesis
    pub fn registry(&self) -> &Arc<AspectRegistry> {
        &self.registry
    }

    /// Apply `aspect` to every method of contracts synthesized from now on
    pub fn register_global_aspect(&self, aspect: impl Aspect) {
        self.registry.register_global(Arc::new(aspect));
    }

    /// Apply an already shared aspect globally
    pub fn register_shared_aspect(&self, aspect: SharedAspect) {
        self.registry.register_global(aspect);
    }

    /// Empty the global aspect list
    pub fn clear_global_aspects(&self) {
        self.registry.clear_globals();
    }

    /// Number of global aspects
    pub fn global_aspect_count(&self) -> usize {
        self.registry.global_count()
    }

    /// Attach `aspect` to one method of contract `C`
    pub fn attach<C: Contract + ?Sized>(&self, method: impl Into<String>, aspect: impl Aspect) {
        self.registry.attach::<C>(method, Arc::new(aspect));
    }

    /// Wrap `real` in the proxy for contract `C`, synthesizing on first use
    pub fn create<C: Contract + ?Sized>(&self, real: Arc<C>) -> Result<Arc<C>> {
        Ok(self.proxy_type::<C>()?.construct(real))
    }

    /// The synthesized proxy type for contract `C`
    pub fn proxy_type<C: Contract + ?Sized>(&self) -> Result<ProxyType<C>> {
        let weaving = self.weaving::<C>()?;
        let passthrough = self.config.identity_passthrough && weaving.is_unwoven();
        Ok(ProxyType::new(weaving, passthrough))
    }

    /// The cached weaving for contract `C`, synthesizing on first use
    pub fn weaving<C: Contract + ?Sized>(&self) -> Result<Arc<Weaving>> {
        let cell = {
            let mut cache = self.cache.lock();
            cache.entry(TypeId::of::<C>()).or_default().clone()
        };

        if let Some(cached) = cell.get() {
            trace!(contract = std::any::type_name::<C>(), "Weaving cache hit");
            return cached.clone();
        }

        cell.get_or_init(|| self.synthesize::<C>()).clone()
    }

    /// Drop the cached weaving of contract `C`.
    ///
    /// The next request re-synthesizes with the registry as it is then.
    /// Proxies created earlier keep their weaving.
    pub fn clear_cache<C: Contract + ?Sized>(&self) {
        if self.cache.lock().remove(&TypeId::of::<C>()).is_some() {
            debug!(
                contract = std::any::type_name::<C>(),
                "Evicted cached weaving"
            );
        }
    }

    /// Drop every cached weaving
    pub fn clear_all_caches(&self) {
        let mut cache = self.cache.lock();
        debug!(evicted = cache.len(), "Evicted all cached weavings");
        cache.clear();
    }

    /// Number of syntheses performed by this factory
    pub fn synthesis_count(&self) -> usize {
        self.syntheses.load(Ordering::SeqCst)
    }

    fn synthesize<C: Contract + ?Sized>(&self) -> std::result::Result<Arc<Weaving>, SynthesisError> {
        self.syntheses.fetch_add(1, Ordering::SeqCst);
        let contract = std::any::type_name::<C>();
        let attachments = self.registry.attachments::<C>();
        let globals = self.registry.globals();

        // Panics are cached like any other failure
        let built = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.builder
                .synthesize(C::descriptor(), &attachments, &globals)
        }))
        .unwrap_or_else(|payload| {
            Err(SynthesisError::panicked(contract, panic_message(payload.as_ref())))
        });

        match built {
            Ok(weaving) => Ok(Arc::new(weaving)),
            Err(err) => {
                warn!(
                    contract,
                    error = %err,
                    "Weaving synthesis failed; failure cached"
                );
                Err(err)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl std::fmt::Debug for AspectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectFactory")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cached_contracts", &self.cache.lock().len())
            .field("syntheses", &self.synthesis_count())
            .finish()
    }
}
