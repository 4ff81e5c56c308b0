//! Aspect registry
//!
//! Holds the aspects that are not declared on contract methods: the global
//! list applied to every method of every contract, and the explicit
//! per-method attachment table. Both are read only when a contract's weaving
//! is synthesized. Register and clear before the first use of any affected
//! contract; changes never reach weavings that already exist.

use crate::aspect::SharedAspect;
use crate::builder::Attachment;
use crate::contract::Contract;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use tracing::debug;

/// Global aspects and per-method attachments
#[derive(Default)]
pub struct AspectRegistry {
    globals: RwLock<Vec<SharedAspect>>,
    attachments: RwLock<HashMap<TypeId, Vec<Attachment>>>,
}

impl AspectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an aspect to the global list
    pub fn register_global(&self, aspect: SharedAspect) {
        debug!(aspect = aspect.name(), "Registered global aspect");
        self.globals.write().push(aspect);
    }

    /// Empty the global list
    pub fn clear_globals(&self) {
        let mut globals = self.globals.write();
        debug!(removed = globals.len(), "Cleared global aspects");
        globals.clear();
    }

    /// Snapshot of the global list in registration order
    pub fn globals(&self) -> Vec<SharedAspect> {
        self.globals.read().clone()
    }

    /// Number of global aspects
    pub fn global_count(&self) -> usize {
        self.globals.read().len()
    }

    /// Attach an aspect to one method of contract `C`
    pub fn attach<C: Contract + ?Sized>(&self, method: impl Into<String>, aspect: SharedAspect) {
        let method = method.into();
        debug!(
            contract = std::any::type_name::<C>(),
            method = %method,
            aspect = aspect.name(),
            "Attached method aspect"
        );
        self.attachments
            .write()
            .entry(TypeId::of::<C>())
            .or_default()
            .push(Attachment { method, aspect });
    }

    /// Attachments registered for contract `C`
    pub fn attachments<C: Contract + ?Sized>(&self) -> Vec<Attachment> {
        self.attachments
            .read()
            .get(&TypeId::of::<C>())
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every attachment of contract `C`
    pub fn clear_attachments<C: Contract + ?Sized>(&self) {
        self.attachments.write().remove(&TypeId::of::<C>());
    }
}

impl std::fmt::Debug for AspectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectRegistry")
            .field(
                "globals",
                &self
                    .globals
                    .read()
                    .iter()
                    .map(|a| a.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("attached_contracts", &self.attachments.read().len())
            .finish()
    }
}
