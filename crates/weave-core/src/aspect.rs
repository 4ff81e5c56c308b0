//! Aspect contract
//!
//! An aspect is a reusable cross-cutting behavior with two hooks around every
//! call it is woven into. Ordering is split in two ranks:
//!
//! - `enter_priority`: hooks run ascending on the way in
//! - `exit_priority`: hooks run ascending on the way out
//!
//! An aspect that wants to be the outermost wrapper takes the lowest enter
//! rank and the highest exit rank, so it enters first and leaves last.
//!
//! The same instance serves every call in its scope, possibly on many threads
//! at once. Aspects with mutable state synchronize it themselves; the chain
//! never locks around hooks.

use crate::context::MethodContext;
use crate::errors::AspectError;
use std::any::Any;
use std::sync::Arc;

/// A cross-cutting behavior woven around contract methods
pub trait Aspect: Send + Sync + 'static {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Rank on the way in, lower runs first
    fn enter_priority(&self) -> i32 {
        0
    }

    /// Rank on the way out, lower runs first
    fn exit_priority(&self) -> i32 {
        0
    }

    /// Runs before the real call.
    ///
    /// Writing the result slot short-circuits the call: the real method and
    /// the remaining enter hooks are skipped, exit hooks still run.
    fn on_enter(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs after the real call or the short-circuit, may rewrite the result
    fn on_exit(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let _ = ctx;
        Ok(())
    }

    /// Sees a panic raised by the real method before it resumes unwinding.
    ///
    /// Observation only: the fault is rethrown unchanged afterwards and exit
    /// hooks do not run for the call.
    fn on_fault(&self, ctx: &MethodContext<'_>, fault: &Fault<'_>) {
        let _ = (ctx, fault);
    }
}

impl<A: Aspect + ?Sized> Aspect for Arc<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn enter_priority(&self) -> i32 {
        (**self).enter_priority()
    }

    fn exit_priority(&self) -> i32 {
        (**self).exit_priority()
    }

    fn on_enter(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        (**self).on_enter(ctx)
    }

    fn on_exit(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        (**self).on_exit(ctx)
    }

    fn on_fault(&self, ctx: &MethodContext<'_>, fault: &Fault<'_>) {
        (**self).on_fault(ctx, fault);
    }
}

/// Shared aspect handle
pub type SharedAspect = Arc<dyn Aspect>;

/// Share an aspect instance
pub fn shared(aspect: impl Aspect) -> SharedAspect {
    Arc::new(aspect)
}

/// A panic raised by the real method, borrowed from the unwinding payload
pub struct Fault<'p> {
    payload: &'p (dyn Any + Send),
}

impl<'p> Fault<'p> {
    pub(crate) fn new(payload: &'p (dyn Any + Send)) -> Self {
        Self { payload }
    }

    /// The original payload
    pub fn payload(&self) -> &'p (dyn Any + Send) {
        self.payload
    }

    /// Downcast the payload
    pub fn downcast_ref<T: Any>(&self) -> Option<&'p T> {
        self.payload.downcast_ref::<T>()
    }

    /// Message of a `panic!("...")` style payload
    pub fn message(&self) -> Option<&'p str> {
        if let Some(message) = self.payload.downcast_ref::<&'static str>() {
            return Some(message);
        }
        self.payload.downcast_ref::<String>().map(String::as_str)
    }

    /// Address of the payload, stable for the lifetime of the unwinding box
    pub fn payload_addr(&self) -> usize {
        self.payload as *const (dyn Any + Send) as *const () as usize
    }
}

impl std::fmt::Debug for Fault<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.message())
            .field("payload_addr", &self.payload_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ranked;

    impl Aspect for Ranked {
        fn name(&self) -> &str {
            "ranked"
        }

        fn enter_priority(&self) -> i32 {
            -3
        }

        fn exit_priority(&self) -> i32 {
            7
        }
    }

    #[test]
    fn shared_handle_delegates_ranks() {
        let aspect: SharedAspect = Arc::new(Arc::new(Ranked));
        assert_eq!(aspect.name(), "ranked");
        assert_eq!(aspect.enter_priority(), -3);
        assert_eq!(aspect.exit_priority(), 7);
    }

    #[test]
    fn fault_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(Fault::new(payload.as_ref()).message(), Some("boom"));

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(Fault::new(payload.as_ref()).message(), Some("owned boom"));

        let payload: Box<dyn Any + Send> = Box::new(17u8);
        let fault = Fault::new(payload.as_ref());
        assert_eq!(fault.message(), None);
        assert_eq!(fault.downcast_ref::<u8>(), Some(&17));
    }
}
