//! Error types for weaving and woven calls
//!
//! Synthesis failures are `Clone` because the factory caches them against the
//! contract type and hands the same error back on every later request.
//! Interception failures have no error channel in the contract's own method
//! signatures, so they unwind to the caller as a typed panic payload.

use std::fmt;

/// Failure while synthesizing the weaving for a contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The contract is not a pure, method-only interface
    #[error("Contract '{contract}' has an unsupported shape: {reason}")]
    ContractShape {
        /// Contract name
        contract: String,
        /// What made the shape unsupported
        reason: String,
    },

    /// The contract cannot be referenced from outside its defining scope
    #[error("Contract '{contract}' must be public to be woven")]
    Visibility {
        /// Contract name
        contract: String,
    },

    /// An explicitly attached aspect names a method the contract does not declare
    #[error("Contract '{contract}' has no method named '{method}'")]
    UnknownMethod {
        /// Contract name
        contract: String,
        /// Method name given at attachment time
        method: String,
    },

    /// Building the descriptor or the chains panicked
    #[error("Synthesis of contract '{contract}' panicked: {message}")]
    Panicked {
        /// Contract type name
        contract: String,
        /// Panic message, when the payload is a string
        message: String,
    },
}

impl SynthesisError {
    /// Create a contract shape error
    pub fn contract_shape(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContractShape {
            contract: contract.into(),
            reason: reason.into(),
        }
    }

    /// Create a visibility error
    pub fn visibility(contract: impl Into<String>) -> Self {
        Self::Visibility {
            contract: contract.into(),
        }
    }

    /// Create a panicked-synthesis error
    pub fn panicked(contract: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            contract: contract.into(),
            message: message.into(),
        }
    }

    /// Create an unknown method error
    pub fn unknown_method(contract: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            contract: contract.into(),
            method: method.into(),
        }
    }
}

/// Error reported by an aspect hook
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AspectError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AspectError {
    /// Create an aspect error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Hook that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Pre-call hook
    Enter,
    /// Post-call hook
    Exit,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Enter => write!(f, "on_enter"),
            HookPhase::Exit => write!(f, "on_exit"),
        }
    }
}

/// An aspect hook returned an error and aborted the chain
#[derive(Debug, thiserror::Error)]
#[error("Aspect '{aspect}' failed in {phase} of {contract}.{method}")]
pub struct HookExecutionError {
    /// Aspect name
    pub aspect: String,
    /// Phase the aspect was running
    pub phase: HookPhase,
    /// Contract name
    pub contract: String,
    /// Method name
    pub method: String,
    /// Error returned by the hook, unchanged
    #[source]
    pub source: AspectError,
}

/// Failure while executing a woven call
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    /// An aspect hook failed
    #[error(transparent)]
    Hook(#[from] HookExecutionError),

    /// The result slot holds a value of the wrong type for the method
    #[error("Result slot of {contract}.{method} does not hold a {expected}")]
    ResultType {
        /// Contract name
        contract: String,
        /// Method name
        method: String,
        /// Declared return type
        expected: String,
    },

    /// The chain finished without a result for a method that returns one
    #[error("Result slot of {contract}.{method} is empty after the chain completed")]
    MissingResult {
        /// Contract name
        contract: String,
        /// Method name
        method: String,
    },
}

impl InterceptError {
    /// The hook failure, if this is one
    pub fn as_hook(&self) -> Option<&HookExecutionError> {
        match self {
            InterceptError::Hook(err) => Some(err),
            _ => None,
        }
    }
}

/// Unwind out of a woven method with the interception failure as payload.
///
/// Contract methods have arbitrary signatures and no error channel of their
/// own, so the failure travels the same way a panic in application code would.
/// Callers recover it with `std::panic::catch_unwind` and
/// `payload.downcast::<InterceptError>()`.
pub fn raise(err: InterceptError) -> ! {
    tracing::debug!(error = %err, "Woven call aborted");
    std::panic::panic_any(err)
}

/// Configuration loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid TOML for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unacceptable value
    #[error("Field '{field}': {message}")]
    Invalid {
        /// Field name
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Standard result type for weaving operations
pub type Result<T> = std::result::Result<T, SynthesisError>;
