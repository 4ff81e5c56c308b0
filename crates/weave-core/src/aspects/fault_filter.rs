//! Fault filtering aspect
//!
//! Gives registered handlers the first look at a panic raised by the real
//! method. Handlers observe only: the payload keeps unwinding to the caller
//! unchanged once they return.

use crate::aspect::{Aspect, Fault};
use crate::context::MethodContext;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// What a fault handler sees
#[derive(Debug)]
pub struct FaultReport<'a> {
    /// Contract name
    pub contract: &'a str,
    /// Method name
    pub method: &'a str,
    /// Real receiver type
    pub receiver_type: &'static str,
    /// The fault itself
    pub fault: &'a Fault<'a>,
}

/// Callback invoked once per fault
pub type FaultHandler = Arc<dyn Fn(&FaultReport<'_>) + Send + Sync>;

/// Routes real-method panics through a handler pipeline
#[derive(Default)]
pub struct FaultFilterAspect {
    handlers: RwLock<Vec<FaultHandler>>,
}

impl FaultFilterAspect {
    /// Aspect with no handlers; faults are only logged
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler at construction
    pub fn with_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&FaultReport<'_>) + Send + Sync + 'static,
    {
        self.add_handler(handler);
        self
    }

    /// Add a handler to an aspect that may already be woven
    pub fn add_handler<F>(&self, handler: F)
    where
        F: Fn(&FaultReport<'_>) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Remove every handler
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Number of handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Aspect for FaultFilterAspect {
    fn name(&self) -> &str {
        "fault_filter"
    }

    fn on_fault(&self, ctx: &MethodContext<'_>, fault: &Fault<'_>) {
        warn!(
            contract = ctx.contract(),
            method = ctx.method_name(),
            receiver = ctx.receiver_type(),
            panic_message = fault.message().unwrap_or("<non-string payload>"),
            "Woven call raised a fault"
        );

        let report = FaultReport {
            contract: ctx.contract(),
            method: ctx.method_name(),
            receiver_type: ctx.receiver_type(),
            fault,
        };
        // Snapshot so handlers may register further handlers.
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(&report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MethodDescriptor;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn handlers_each_see_the_fault_once() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let aspect = FaultFilterAspect::new()
            .with_handler(move |report| {
                assert_eq!(report.method, "explode");
                assert_eq!(report.fault.message(), Some("kaboom"));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let counter = seen.clone();
        aspect.add_handler(move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        let method = MethodDescriptor::new("explode", "()");
        let receiver = ();
        let ctx = MethodContext::new("Bomb", &method, &receiver, "Bomb", Vec::new());
        let payload: Box<dyn Any + Send> = Box::new("kaboom");
        aspect.on_fault(&ctx, &Fault::new(payload.as_ref()));

        assert_eq!(seen.load(Ordering::SeqCst), 11);
        assert_eq!(aspect.handler_count(), 2);
    }
}
