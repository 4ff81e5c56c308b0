//! Ready-made aspects
//!
//! Ordinary [`Aspect`](crate::Aspect) implementations; the chain treats them
//! like any user-defined aspect.

pub mod cache;
pub mod fault_filter;
pub mod trace;

pub use cache::{cache_key, CacheAspect, CacheStore, MemoryCacheStore};
pub use fault_filter::{FaultFilterAspect, FaultHandler, FaultReport};
pub use trace::TraceAspect;
