//! Method invocation context
//!
//! One context is built per woven call and handed to every hook of the chain.
//! It carries the method identity, the real receiver, the captured arguments
//! in declaration order, the result slot and per-call scratch state.

use crate::descriptor::{MethodDescriptor, ParamDescriptor, ParamMode};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Type-erased value held in the result slot or a cache store
pub type ReturnValue = Arc<dyn Any + Send + Sync>;

/// Captured argument value
pub trait ArgumentValue: Any + Debug + Send + Sync {
    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Debug + Send + Sync> ArgumentValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Box an argument for a context
pub fn capture<T: Any + Debug + Send + Sync>(value: T) -> Box<dyn ArgumentValue> {
    Box::new(value)
}

/// One declared parameter with the value supplied for this call
pub struct Parameter<'a> {
    descriptor: &'a ParamDescriptor,
    value: Box<dyn ArgumentValue>,
}

impl<'a> Parameter<'a> {
    /// Pair a declaration with its value
    pub fn new(descriptor: &'a ParamDescriptor, value: Box<dyn ArgumentValue>) -> Self {
        Self { descriptor, value }
    }

    /// Declared name
    pub fn name(&self) -> &'a str {
        self.descriptor.name()
    }

    /// Declared type
    pub fn type_name(&self) -> &'a str {
        self.descriptor.type_name()
    }

    /// Passing mode
    pub fn mode(&self) -> ParamMode {
        self.descriptor.mode()
    }

    /// Typed view of the value
    pub fn value<T: Any>(&self) -> Option<&T> {
        (*self.value).as_any().downcast_ref::<T>()
    }

    /// Type-erased value
    pub fn raw(&self) -> &dyn ArgumentValue {
        &*self.value
    }

    /// Canonical rendering used for cache keys.
    ///
    /// Uses the `Debug` form, so sequences render element by element and two
    /// structurally equal collections render identically.
    pub fn canonical(&self) -> String {
        format!("{:?}", self.value)
    }
}

impl Debug for Parameter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name())
            .field("type", &self.type_name())
            .field("value", &self.value)
            .finish()
    }
}

/// Type-keyed values shared between all aspects of one call
#[derive(Default)]
pub struct Extensions {
    entries: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Extensions {
    /// Insert a value, returning the previous one of the same type
    pub fn insert<T: Any + Send>(&mut self, value: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    /// Borrow a value
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutably borrow a value
    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove a value
    pub fn remove<T: Any + Send>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const NO_SLOT: usize = usize::MAX;

/// Per-call state handed to every hook
pub struct MethodContext<'a> {
    contract: &'a str,
    method: &'a MethodDescriptor,
    receiver: &'a dyn Any,
    receiver_type: &'static str,
    parameters: Vec<Parameter<'a>>,
    result: Option<ReturnValue>,
    invoked: bool,
    slot: usize,
    scratch: HashMap<(usize, TypeId), Box<dyn Any + Send>>,
    extensions: Extensions,
}

impl<'a> MethodContext<'a> {
    /// Build the context for one call.
    ///
    /// `values` are the captured arguments in declaration order.
    ///
    /// # Panics
    ///
    /// Panics if `values` and the method's parameter list differ in length.
    pub fn new(
        contract: &'a str,
        method: &'a MethodDescriptor,
        receiver: &'a dyn Any,
        receiver_type: &'static str,
        values: Vec<Box<dyn ArgumentValue>>,
    ) -> Self {
        assert_eq!(
            method.params().len(),
            values.len(),
            "argument count mismatch for {contract}.{}",
            method.name()
        );
        let parameters = method
            .params()
            .iter()
            .zip(values)
            .map(|(descriptor, value)| Parameter::new(descriptor, value))
            .collect();

        Self {
            contract,
            method,
            receiver,
            receiver_type,
            parameters,
            result: None,
            invoked: false,
            slot: NO_SLOT,
            scratch: HashMap::new(),
            extensions: Extensions::default(),
        }
    }

    /// Contract name
    pub fn contract(&self) -> &'a str {
        self.contract
    }

    /// Method being called
    pub fn method(&self) -> &'a MethodDescriptor {
        self.method
    }

    /// Method name
    pub fn method_name(&self) -> &'a str {
        self.method.name()
    }

    /// The real receiver.
    ///
    /// Generated proxies pass their `Arc<dyn Contract>` handle, so aspects can
    /// downcast to `Arc<dyn Contract>` when they know the contract.
    pub fn receiver(&self) -> &'a dyn Any {
        self.receiver
    }

    /// Full type name of the real receiver
    pub fn receiver_type(&self) -> &'static str {
        self.receiver_type
    }

    /// Receiver type name without module path or generic arguments
    pub fn receiver_short_type(&self) -> &'static str {
        short_type_name(self.receiver_type)
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[Parameter<'a>] {
        &self.parameters
    }

    /// Find a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter<'a>> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Whether the result slot has been written
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Type-erased result
    pub fn result_value(&self) -> Option<&ReturnValue> {
        self.result.as_ref()
    }

    /// Typed view of the result
    pub fn result<T: Any>(&self) -> Option<&T> {
        self.result.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Write the result slot.
    ///
    /// Before the real call this short-circuits it.
    pub fn set_result<T: Any + Send + Sync>(&mut self, value: T) {
        self.result = Some(Arc::new(value));
    }

    /// Write an already type-erased result
    pub fn set_result_value(&mut self, value: ReturnValue) {
        self.result = Some(value);
    }

    /// Empty the result slot
    pub fn clear_result(&mut self) -> Option<ReturnValue> {
        self.result.take()
    }

    /// Whether the real method ran for this call
    pub fn real_call_invoked(&self) -> bool {
        self.invoked
    }

    /// Whether an enter hook supplied the result instead of the real method
    pub fn short_circuited(&self) -> bool {
        !self.invoked && self.result.is_some()
    }

    /// Keep a value for the aspect currently running, for its own later hooks
    pub fn stash<T: Any + Send>(&mut self, value: T) {
        self.scratch
            .insert((self.slot, TypeId::of::<T>()), Box::new(value));
    }

    /// Borrow a value stashed by the aspect currently running
    pub fn stashed<T: Any + Send>(&self) -> Option<&T> {
        self.scratch
            .get(&(self.slot, TypeId::of::<T>()))
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Take back a value stashed by the aspect currently running
    pub fn unstash<T: Any + Send>(&mut self) -> Option<T> {
        self.scratch
            .remove(&(self.slot, TypeId::of::<T>()))
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Values shared between all aspects of this call
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to the shared values
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn focus(&mut self, slot: usize) {
        self.slot = slot;
    }

    pub(crate) fn unfocus(&mut self) {
        self.slot = NO_SLOT;
    }

    pub(crate) fn record_real_result(&mut self, value: ReturnValue) {
        self.invoked = true;
        self.result = Some(value);
    }
}

impl Debug for MethodContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodContext")
            .field("contract", &self.contract)
            .field("method", &self.method.name())
            .field("receiver_type", &self.receiver_type)
            .field("parameters", &self.parameters)
            .field("has_result", &self.result.is_some())
            .field("invoked", &self.invoked)
            .finish()
    }
}

/// Strip module path and generic arguments from a type name
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method() -> MethodDescriptor {
        MethodDescriptor::new("find", "Vec<u32>")
            .with_param(ParamDescriptor::new("ids", "&[u32]", ParamMode::Borrowed))
            .with_param(ParamDescriptor::new("label", "String", ParamMode::Value))
    }

    #[test]
    fn parameters_follow_declaration_order() {
        let method = method();
        let receiver = 0u8;
        let ctx = MethodContext::new(
            "Finder",
            &method,
            &receiver,
            "app::store::MemoryFinder",
            vec![capture(vec![1u32, 2, 3]), capture(String::from("x"))],
        );

        let names: Vec<_> = ctx.parameters().iter().map(Parameter::name).collect();
        assert_eq!(names, vec!["ids", "label"]);
        assert_eq!(ctx.parameters()[0].value::<Vec<u32>>(), Some(&vec![1, 2, 3]));
        assert_eq!(ctx.parameter("label").map(Parameter::canonical), Some("\"x\"".into()));
        assert_eq!(ctx.receiver_short_type(), "MemoryFinder");
        assert_eq!(ctx.receiver().downcast_ref::<u8>(), Some(&0));
    }

    #[test]
    #[should_panic(expected = "argument count mismatch for Finder.find")]
    fn short_argument_list_is_rejected() {
        let method = method();
        let receiver = 0u8;
        let _ = MethodContext::new(
            "Finder",
            &method,
            &receiver,
            "MemoryFinder",
            vec![capture(vec![1u32])],
        );
    }

    #[test]
    fn result_slot_starts_unset() {
        let method = method();
        let receiver = ();
        let mut ctx = MethodContext::new(
            "Finder",
            &method,
            &receiver,
            "Finder",
            vec![capture(Vec::<u32>::new()), capture(String::new())],
        );

        assert!(!ctx.has_result());
        ctx.set_result(vec![9u32]);
        assert!(ctx.short_circuited());
        assert_eq!(ctx.result::<Vec<u32>>(), Some(&vec![9]));
        assert!(ctx.result::<String>().is_none());

        ctx.record_real_result(Arc::new(vec![1u32]));
        assert!(!ctx.short_circuited());
        assert!(ctx.real_call_invoked());
    }

    #[test]
    fn stash_is_private_per_slot() {
        let method = MethodDescriptor::new("ping", "()");
        let receiver = ();
        let mut ctx = MethodContext::new("Pinger", &method, &receiver, "Pinger", Vec::new());

        ctx.focus(0);
        ctx.stash(String::from("first"));
        ctx.focus(1);
        assert!(ctx.stashed::<String>().is_none());
        ctx.stash(String::from("second"));
        ctx.focus(0);
        assert_eq!(ctx.unstash::<String>().as_deref(), Some("first"));
        assert!(ctx.stashed::<String>().is_none());
        ctx.focus(1);
        assert_eq!(ctx.stashed::<String>().map(String::as_str), Some("second"));
    }

    #[test]
    fn extensions_are_shared() {
        let mut ext = Extensions::default();
        assert!(ext.insert(5u64).is_none());
        assert_eq!(ext.insert(6u64), Some(5));
        *ext.get_mut::<u64>().unwrap() += 1;
        assert_eq!(ext.get::<u64>(), Some(&7));
        assert_eq!(ext.remove::<u64>(), Some(7));
        assert!(ext.is_empty());
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name("a::b::Repo"), "Repo");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
