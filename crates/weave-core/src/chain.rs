//! Frozen per-method aspect chains
//!
//! A chain is computed once at synthesis and never changes afterwards. Each
//! woven call runs the same sequence:
//!
//! 1. enter hooks, ascending `enter_priority`, stopping once the result slot
//!    is written
//! 2. the real method, unless an enter hook short-circuited it
//! 3. exit hooks for every aspect, ascending `exit_priority`
//! 4. the result slot, converted back to the declared return type
//!
//! A hook error aborts the remaining hooks and surfaces as
//! [`InterceptError::Hook`]. A panic in the real method is shown to every
//! aspect's `on_fault` and then resumed with the original payload.

use crate::aspect::{Fault, SharedAspect};
use crate::context::MethodContext;
use crate::descriptor::MethodDescriptor;
use crate::errors::{HookExecutionError, HookPhase, InterceptError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::trace;

/// Ordered aspects woven around one contract method
pub struct AspectChain {
    contract: Arc<str>,
    method: MethodDescriptor,
    aspects: Vec<SharedAspect>,
    enter_order: Vec<usize>,
    exit_order: Vec<usize>,
    trace_calls: bool,
}

impl AspectChain {
    /// Freeze a chain.
    ///
    /// `aspects` is the effective list in declaration order: method-declared,
    /// then attached, then global. Duplicates are kept and fire independently.
    /// Sorting is stable, so equal ranks keep declaration order.
    pub fn new(
        contract: Arc<str>,
        method: MethodDescriptor,
        aspects: Vec<SharedAspect>,
        trace_calls: bool,
    ) -> Self {
        let mut enter_order: Vec<usize> = (0..aspects.len()).collect();
        enter_order.sort_by_key(|&slot| aspects[slot].enter_priority());

        let mut exit_order: Vec<usize> = (0..aspects.len()).collect();
        exit_order.sort_by_key(|&slot| aspects[slot].exit_priority());

        Self {
            contract,
            method,
            aspects,
            enter_order,
            exit_order,
            trace_calls,
        }
    }

    /// Contract name
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Method this chain wraps
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Aspects in declaration order
    pub fn aspects(&self) -> &[SharedAspect] {
        &self.aspects
    }

    /// Whether no aspect applies to the method
    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// Aspect names in the order their enter hooks run
    pub fn enter_sequence(&self) -> Vec<&str> {
        self.enter_order
            .iter()
            .map(|&slot| self.aspects[slot].name())
            .collect()
    }

    /// Aspect names in the order their exit hooks run
    pub fn exit_sequence(&self) -> Vec<&str> {
        self.exit_order
            .iter()
            .map(|&slot| self.aspects[slot].name())
            .collect()
    }

    /// Run one call through the chain.
    ///
    /// `real` performs the call on the real receiver; it is not invoked when
    /// an enter hook writes the result slot.
    pub fn invoke<R, F>(&self, ctx: &mut MethodContext<'_>, real: F) -> Result<R, InterceptError>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce() -> R,
    {
        if self.trace_calls {
            trace!(
                contract = %self.contract,
                method = self.method.name(),
                aspects = self.aspects.len(),
                "Entering woven call"
            );
        }

        for &slot in &self.enter_order {
            ctx.focus(slot);
            self.aspects[slot]
                .on_enter(ctx)
                .map_err(|source| self.hook_error(slot, HookPhase::Enter, source))?;
            if ctx.has_result() {
                break;
            }
        }
        ctx.unfocus();

        if ctx.has_result() {
            if self.trace_calls {
                trace!(
                    contract = %self.contract,
                    method = self.method.name(),
                    "Real call short-circuited"
                );
            }
        } else {
            match panic::catch_unwind(AssertUnwindSafe(real)) {
                Ok(value) => ctx.record_real_result(Arc::new(value)),
                Err(payload) => {
                    self.dispatch_fault(ctx, payload.as_ref());
                    panic::resume_unwind(payload);
                }
            }
        }

        for &slot in &self.exit_order {
            ctx.focus(slot);
            self.aspects[slot]
                .on_exit(ctx)
                .map_err(|source| self.hook_error(slot, HookPhase::Exit, source))?;
        }
        ctx.unfocus();

        self.take_result(ctx)
    }

    fn dispatch_fault(&self, ctx: &mut MethodContext<'_>, payload: &(dyn Any + Send)) {
        let fault = Fault::new(payload);
        for &slot in &self.exit_order {
            ctx.focus(slot);
            self.aspects[slot].on_fault(ctx, &fault);
        }
        ctx.unfocus();
    }

    fn take_result<R>(&self, ctx: &mut MethodContext<'_>) -> Result<R, InterceptError>
    where
        R: Clone + Send + Sync + 'static,
    {
        let value = ctx
            .clear_result()
            .ok_or_else(|| InterceptError::MissingResult {
                contract: self.contract.to_string(),
                method: self.method.name().to_string(),
            })?;

        match value.downcast::<R>() {
            Ok(typed) => Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone())),
            Err(_) => Err(InterceptError::ResultType {
                contract: self.contract.to_string(),
                method: self.method.name().to_string(),
                expected: self.method.return_type().to_string(),
            }),
        }
    }

    fn hook_error(
        &self,
        slot: usize,
        phase: HookPhase,
        source: crate::errors::AspectError,
    ) -> InterceptError {
        HookExecutionError {
            aspect: self.aspects[slot].name().to_string(),
            phase,
            contract: self.contract.to_string(),
            method: self.method.name().to_string(),
            source,
        }
        .into()
    }
}

impl std::fmt::Debug for AspectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectChain")
            .field("contract", &self.contract)
            .field("method", &self.method.name())
            .field("enter", &self.enter_sequence())
            .field("exit", &self.exit_sequence())
            .finish()
    }
}
