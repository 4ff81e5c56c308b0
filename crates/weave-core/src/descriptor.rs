//! Contract descriptors
//!
//! A descriptor is the static shape of a contract: its methods in declaration
//! order, their parameters and return types, and the aspects declared on each
//! method. `#[contract]` generates one per trait; hand-written `Contract`
//! impls build theirs with the same builder methods.

use crate::aspect::Aspect;
use std::fmt;
use std::sync::Arc;

/// Whether code outside the defining scope can name the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Declared `pub`
    Public,
    /// Crate- or module-private
    Restricted,
}

/// What kind of type the descriptor was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// A trait: the only weavable kind
    Interface,
    /// A concrete type
    Concrete,
}

/// How an argument is handed to the method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// Passed by value
    Value,
    /// Passed as `&T`; the context holds an owned copy
    Borrowed,
    /// Passed as `&mut T`; the context holds the incoming value and the real
    /// call writes through the caller's reference
    Mutable,
}

/// How the method receives its object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// `&self`
    Shared,
    /// No receiver
    Static,
}

/// Declared parameter of a contract method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    name: String,
    type_name: String,
    mode: ParamMode,
}

impl ParamDescriptor {
    /// Create a parameter descriptor
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, mode: ParamMode) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            mode,
        }
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, as written
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Passing mode
    pub fn mode(&self) -> ParamMode {
        self.mode
    }
}

/// Declared method of a contract
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamDescriptor>,
    return_type: String,
    receiver: Receiver,
    generic: bool,
    aspects: Vec<Arc<dyn Aspect>>,
}

impl MethodDescriptor {
    /// Create a method descriptor with a `&self` receiver
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: return_type.into(),
            receiver: Receiver::Shared,
            generic: false,
            aspects: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Set the receiver kind
    pub fn with_receiver(mut self, receiver: Receiver) -> Self {
        self.receiver = receiver;
        self
    }

    /// Mark the method as generic over types
    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }

    /// Declare an aspect on this method
    pub fn with_aspect(mut self, aspect: Arc<dyn Aspect>) -> Self {
        self.aspects.push(aspect);
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Declared return type, `()` for none
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Whether the method returns nothing
    pub fn returns_unit(&self) -> bool {
        self.return_type == "()"
    }

    /// Receiver kind
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Whether the method is generic over types
    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// Aspects declared on the method itself
    pub fn aspects(&self) -> &[Arc<dyn Aspect>] {
        &self.aspects
    }

    /// Signature rendered as `name(a: A, b: B) -> R`
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_name))
            .collect::<Vec<_>>()
            .join(", ");
        if self.returns_unit() {
            format!("{}({params})", self.name)
        } else {
            format!("{}({params}) -> {}", self.name, self.return_type)
        }
    }

    pub(crate) fn without_aspects(&self) -> Self {
        Self {
            aspects: Vec::new(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("receiver", &self.receiver)
            .field("generic", &self.generic)
            .field(
                "aspects",
                &self.aspects.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Static shape of a contract
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    name: String,
    module_path: String,
    kind: ContractKind,
    visibility: Visibility,
    methods: Vec<MethodDescriptor>,
}

impl ContractDescriptor {
    /// Describe a trait
    pub fn interface(
        name: impl Into<String>,
        module_path: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            name: name.into(),
            module_path: module_path.into(),
            kind: ContractKind::Interface,
            visibility,
            methods: Vec::new(),
        }
    }

    /// Describe a concrete type; weaving rejects these
    pub fn concrete(name: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self {
            kind: ContractKind::Concrete,
            ..Self::interface(name, module_path, Visibility::Public)
        }
    }

    /// Append a method
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module the contract was declared in
    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// `module::Name`
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }

    /// Kind of type described
    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Methods in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether any method declares an aspect
    pub fn declares_aspects(&self) -> bool {
        self.methods.iter().any(|m| !m.aspects.is_empty())
    }
}
