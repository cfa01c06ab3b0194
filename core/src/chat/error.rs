use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Where a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// HTTP exchange. `status` is `None` when no response was received.
    Http { status: Option<u16> },
    /// Child process. `exit_code` is `None` when the process was killed by a signal.
    Process { exit_code: Option<i32> },
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureOrigin::Http { status: Some(status) } => write!(f, "HTTP status {}", status),
            FailureOrigin::Http { status: None } => f.write_str("HTTP, no response"),
            FailureOrigin::Process { exit_code: Some(code) } => write!(f, "process exit code {}", code),
            FailureOrigin::Process { exit_code: None } => f.write_str("process terminated by signal"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Required credential '{0}' is missing or empty")]
    MissingCredential(String),

    #[error("Executable not found: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("Model '{0}' is not supported")]
    UnsupportedModel(String),

    /// The prompt did not fit the model's context window. Callers are expected to
    /// shorten the input and try again.
    #[error("Input exceeds the model's context length: {body}")]
    ContextLengthExceeded { body: String },

    #[error("Failed to parse response for model '{model}': {message}")]
    Parse { model: String, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Transport failure ({origin}): {message}")]
    TransportFailure {
        origin: FailureOrigin,
        /// Response body or captured stderr.
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChatError {
    pub fn http(status: Option<u16>, message: impl Into<String>) -> Self {
        ChatError::TransportFailure {
            origin: FailureOrigin::Http { status },
            message: message.into(),
            source: None,
        }
    }

    pub fn process(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        ChatError::TransportFailure {
            origin: FailureOrigin::Process { exit_code },
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status of a failed exchange, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::TransportFailure { origin: FailureOrigin::Http { status }, .. } => *status,
            ChatError::ContextLengthExceeded { .. } => Some(422),
            _ => None,
        }
    }

    /// Exit code of a failed child process, if there was one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ChatError::TransportFailure { origin: FailureOrigin::Process { exit_code }, .. } => *exit_code,
            _ => None,
        }
    }

    pub fn is_context_length_exceeded(&self) -> bool {
        matches!(self, ChatError::ContextLengthExceeded { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Timeout { .. })
    }
}
