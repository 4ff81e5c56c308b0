//! Recording aspect
//!
//! Appends one line per hook to a shared journal so tests can assert the
//! exact order of enter, exit and fault callbacks across aspects.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tracing::trace;
use weave_core::{Aspect, AspectError, Fault, MethodContext, ReturnValue};

/// Shared, ordered log of hook invocations
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        let entry = entry.into();
        trace!(entry = %entry, "Journal entry");
        self.entries.lock().push(entry);
    }

    /// Everything recorded so far
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Entries for one hook kind, e.g. `"Enter"`
    pub fn filtered(&self, hook: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.contains(hook))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// What a [`RecordingAspect`] does on enter, besides recording
#[derive(Debug, Clone, Default)]
pub enum EnterAction {
    /// Nothing
    #[default]
    Observe,
    /// Write a value into the result slot
    ShortCircuit(ReturnValue),
    /// Fail the hook
    Fail(String),
}

/// Aspect writing `"{label}Enter"`, `"{label}Exit"` and
/// `"{label}Fault@{payload address}"` entries to a [`CallJournal`]
#[derive(Debug, Clone)]
pub struct RecordingAspect {
    label: String,
    enter_priority: i32,
    exit_priority: i32,
    action: EnterAction,
    journal: CallJournal,
}

impl RecordingAspect {
    pub fn new(label: impl Into<String>, journal: &CallJournal) -> Self {
        Self {
            label: label.into(),
            enter_priority: 0,
            exit_priority: 0,
            action: EnterAction::Observe,
            journal: journal.clone(),
        }
    }

    pub fn with_priorities(mut self, enter: i32, exit: i32) -> Self {
        self.enter_priority = enter;
        self.exit_priority = exit;
        self
    }

    /// Answer every call with `value`; must match the method's return type
    pub fn short_circuit<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.action = EnterAction::ShortCircuit(Arc::new(value));
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.action = EnterAction::Fail(message.into());
        self
    }
}

impl Aspect for RecordingAspect {
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
        self.journal.record(format!("{}Enter", self.label));
        match &self.action {
            EnterAction::Observe => Ok(()),
            EnterAction::ShortCircuit(value) => {
                ctx.set_result_value(value.clone());
                Ok(())
            }
            EnterAction::Fail(message) => Err(AspectError::new(message.clone())),
        }
    }

    fn on_exit(&self, _ctx: &mut MethodContext<'_>) -> Result<(), AspectError> {
        self.journal.record(format!("{}Exit", self.label));
        Ok(())
    }

    fn on_fault(&self, _ctx: &MethodContext<'_>, fault: &Fault<'_>) {
        self.journal
            .record(format!("{}Fault@{:x}", self.label, fault.payload_addr()));
    }
}
