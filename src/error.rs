use thiserror::Error;

/// The error taxonomy shared by every layer of the engine.
///
/// Each variant carries an `operation`/`component` trace so a caller can log
/// or display the error without re-deriving where in the pipeline it came
/// from (see SPEC_FULL.md §7).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed in {component} during {operation}: {message}")]
    Validation {
        component: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("cryptographic operation failed in {component} during {operation}: {message}")]
    Crypto {
        component: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error(
        "KDF parameter '{parameter}' is invalid in {component} during {operation}: got {value}, expected {expected}{}",
        suggestions.iter().map(|s| format!(" (suggestion: {s})")).collect::<String>()
    )]
    Kdf {
        component: &'static str,
        operation: &'static str,
        parameter: String,
        value: String,
        expected: String,
        suggestions: Vec<String>,
    },

    #[error("filesystem operation failed in {component} during {operation}: {message}")]
    Filesystem {
        component: &'static str,
        operation: &'static str,
        message: String,
        recoverable: bool,
    },

    #[error("worker pool error in {component} during {operation}: {message}")]
    Worker {
        component: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("generation did not complete in {component} during {operation}: {message}")]
    Generation {
        component: &'static str,
        operation: &'static str,
        message: String,
    },
}

impl EngineError {
    pub fn validation(component: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { component, operation, message: message.into() }
    }

    pub fn crypto(component: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Crypto { component, operation, message: message.into() }
    }

    pub fn kdf(
        component: &'static str,
        operation: &'static str,
        parameter: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::Kdf {
            component,
            operation,
            parameter: parameter.into(),
            value: value.into(),
            expected: expected.into(),
            suggestions,
        }
    }

    pub fn filesystem(
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self::Filesystem { component, operation, message: message.into(), recoverable }
    }

    pub fn worker(component: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Worker { component, operation, message: message.into() }
    }

    pub fn generation(component: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Generation { component, operation, message: message.into() }
    }

    /// §4.9: whether the retry loop should retry this error or short-circuit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Filesystem { recoverable: true, .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
