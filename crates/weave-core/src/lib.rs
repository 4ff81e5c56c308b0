//! Weave Core - aspect chains woven around trait objects
//!
//! This crate wraps objects behind a contract trait in a forwarding proxy
//! that runs an ordered chain of aspects around every method call, without
//! touching the object's own code.
//!
//! # Architecture
//!
//! ## Per-call
//! - [`MethodContext`]: method identity, real receiver, captured arguments,
//!   result slot and per-aspect scratch state for one call
//! - [`Aspect`]: `on_enter` / `on_exit` / `on_fault` hooks with separate
//!   enter and exit ranks
//!
//! ## Synthesis
//! - [`ContractDescriptor`]: the static shape of a contract
//! - [`ProxyBuilder`]: merges declared, attached and global aspects into one
//!   frozen [`AspectChain`] per method, producing a [`Weaving`]
//! - [`AspectFactory`]: caches one weaving per contract type and hands out
//!   proxies; [`AspectRegistry`] holds the global and attached aspects
//!
//! ## Call protocol
//! - Enter hooks run ascending by enter rank; writing the result slot
//!   short-circuits the real call and the remaining enter hooks
//! - Exit hooks run for every aspect, ascending by exit rank
//! - A panic in the real method is shown to `on_fault` hooks and resumed with
//!   the original payload
//!
//! Contracts are usually declared with `#[contract]` from `weave-macros`,
//! which generates the [`Contract`] impl and the proxy type.

#![forbid(unsafe_code)]

/// Aspect contract and shared handles
pub mod aspect;

/// Ready-made aspects: caching, fault filtering, tracing
pub mod aspects;

/// Frozen per-method aspect chains
pub mod chain;

/// Method invocation context
pub mod context;

/// Synthesis of contract weavings
pub mod builder;

/// Contract trait and proxy types
pub mod contract;

/// Contract descriptors
pub mod descriptor;

/// Unified error handling
pub mod errors;

/// Factory and builder settings
pub mod config;

/// Substitute factory and weaving cache
pub mod factory;

/// Global and per-method aspect registry
pub mod registry;

pub use aspect::{shared, Aspect, Fault, SharedAspect};
pub use aspects::{
    cache_key, CacheAspect, CacheStore, FaultFilterAspect, FaultReport, MemoryCacheStore,
    TraceAspect,
};
pub use builder::{Attachment, ProxyBuilder, Weaving};
pub use chain::AspectChain;
pub use config::WeaveConfig;
pub use context::{
    capture, short_type_name, ArgumentValue, Extensions, MethodContext, Parameter, ReturnValue,
};
pub use contract::{Contract, ProxyType};
pub use descriptor::{
    ContractDescriptor, ContractKind, MethodDescriptor, ParamDescriptor, ParamMode, Receiver,
    Visibility,
};
pub use errors::{
    raise, AspectError, ConfigError, HookExecutionError, HookPhase, InterceptError, SynthesisError,
};
pub use factory::AspectFactory;
pub use registry::AspectRegistry;
