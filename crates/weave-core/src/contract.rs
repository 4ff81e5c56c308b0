//! Contracts and synthesized proxy types
//!
//! A contract is a trait object type (`dyn Trait`) that knows its own
//! descriptor and how to wrap a real object in its forwarding proxy.
//! `#[contract]` implements this for annotated traits; hand-written impls
//! follow the same pattern.

use crate::builder::Weaving;
use crate::descriptor::ContractDescriptor;
use std::marker::PhantomData;
use std::sync::Arc;

/// A weavable contract, implemented for `dyn Trait`
pub trait Contract: 'static {
    /// Static shape of the contract, including method-declared aspects
    fn descriptor() -> ContractDescriptor;

    /// Wrap `real` in the forwarding proxy driven by `weaving`
    fn weave(real: Arc<Self>, weaving: Arc<Weaving>) -> Arc<Self>;
}

/// Synthesized proxy type for a contract.
///
/// Lets callers build the real object through its own constructor and wrap
/// it afterwards, instead of handing an already-built instance to
/// [`AspectFactory::create`](crate::AspectFactory::create).
pub struct ProxyType<C: Contract + ?Sized> {
    weaving: Arc<Weaving>,
    passthrough: bool,
    _contract: PhantomData<fn() -> Arc<C>>,
}

impl<C: Contract + ?Sized> ProxyType<C> {
    pub(crate) fn new(weaving: Arc<Weaving>, passthrough: bool) -> Self {
        Self {
            weaving,
            passthrough,
            _contract: PhantomData,
        }
    }

    /// Weaving shared by every instance of this proxy type
    pub fn weaving(&self) -> &Arc<Weaving> {
        &self.weaving
    }

    /// Whether instances are the real objects themselves
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Wrap an existing real object
    pub fn construct(&self, real: Arc<C>) -> Arc<C> {
        if self.passthrough {
            real
        } else {
            C::weave(real, self.weaving.clone())
        }
    }

    /// Build the real object with `build` and wrap it
    pub fn construct_with<F>(&self, build: F) -> Arc<C>
    where
        F: FnOnce() -> Arc<C>,
    {
        self.construct(build())
    }
}

impl<C: Contract + ?Sized> Clone for ProxyType<C> {
    fn clone(&self) -> Self {
        Self {
            weaving: self.weaving.clone(),
            passthrough: self.passthrough,
            _contract: PhantomData,
        }
    }
}

impl<C: Contract + ?Sized> std::fmt::Debug for ProxyType<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyType")
            .field("contract", &self.weaving.contract().qualified_name())
            .field("weaving_id", &self.weaving.id())
            .field("passthrough", &self.passthrough)
            .finish()
    }
}
