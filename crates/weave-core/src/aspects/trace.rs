//! Tracing aspect: logs every call on the way in and out

use crate::aspect::Aspect;
use crate::context::MethodContext;
use crate::errors::AspectError;
use tracing::debug;

/// Emits a `debug` event before and after each call
#[derive(Debug, Clone)]
pub struct TraceAspect {
    label: String,
    enter_priority: i32,
    exit_priority: i32,
}

impl Default for TraceAspect {
    fn default() -> Self {
        Self::new("trace")
    }
}

impl TraceAspect {
    /// Tracing aspect with the given label and neutral ranks
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enter_priority: 0,
            exit_priority: 0,
        }
    }

    /// Override the ranks
    pub fn with_priorities(mut self, enter: i32, exit: i32) -> Self {
        self.enter_priority = enter;
        self.exit_priority = exit;
        self
    }
}

impl Aspect for TraceAspect {
    fn name(&self) -> &str {
        &self.label
    }

    fn enter_priority(&self) -> i32 {
        self.enter_priority
    }

    fn exit_priority(&self) -> i32 {
        self.exit_priority
    }

    fn on_enter(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        let arguments = ctx
            .parameters()
            .iter()
            .map(|p| format!("{}={}", p.name(), p.canonical()))
            .collect::<Vec<_>>()
            .join(", ");
        debug!(
            aspect = %self.label,
            contract = ctx.contract(),
            method = ctx.method_name(),
            receiver = ctx.receiver_short_type(),
            arguments = %arguments,
            "Method entered"
        );
        Ok(())
    }

    fn on_exit(&self, ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        debug!(
            aspect = %self.label,
            contract = ctx.contract(),
            method = ctx.method_name(),
            short_circuited = ctx.short_circuited(),
            "Method exited"
        );
        Ok(())
    }
}
