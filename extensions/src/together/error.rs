use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use puppy_core::chat::{ChatError, FailureOrigin};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Required environment variable '{0}' is not set")]
    MissingCredential(&'static str),

    #[error("Python interpreter {0:?} not found")]
    InterpreterNotFound(PathBuf),

    #[error("Runner script {0:?} not found")]
    ScriptNotFound(PathBuf),

    #[error("Failed to serialize conversation for runner: {0}")]
    RequestSerialization(#[source] serde_json::Error),

    #[error("Failed to spawn runner process {0:?}: {1}")]
    ProcessSpawn(PathBuf, #[source] std::io::Error),

    #[error("Failed to send data to runner stdin: {0}")]
    StdinWrite(#[source] std::io::Error),

    #[error("Failed to read runner output: {0}")]
    OutputRead(#[source] std::io::Error),

    #[error("Runner process exited with non-zero status {status}. Stderr: {stderr}")]
    ProcessFailed { status: ExitStatus, stderr: String },

    #[error("Runner process did not finish within {0:?}")]
    Timeout(Duration),
}

impl From<RunnerError> for ChatError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::MissingCredential(name) => ChatError::MissingCredential(name.to_string()),
            RunnerError::InterpreterNotFound(path) | RunnerError::ScriptNotFound(path) => {
                ChatError::ExecutableNotFound(path)
            }
            RunnerError::Timeout(after) => ChatError::Timeout {
                operation: "Together subprocess".to_string(),
                after,
            },
            RunnerError::ProcessFailed { status, stderr } => ChatError::process(status.code(), stderr),
            RunnerError::RequestSerialization(source) => {
                ChatError::Configuration(format!("Failed to serialize conversation: {}", source))
            }
            // Spawn and pipe failures happen after the preconditions passed; the child
            // is unreachable, so report them as process transport failures.
            other @ (RunnerError::ProcessSpawn(..) | RunnerError::StdinWrite(_) | RunnerError::OutputRead(_)) => {
                ChatError::TransportFailure {
                    origin: FailureOrigin::Process { exit_code: None },
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                }
            }
        }
    }
}
