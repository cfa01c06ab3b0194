use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use puppy_core::chat::Message;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::adapter::config::{TogetherConfig, TOGETHER_API_KEY};
use super::error::RunnerError;

/// Runs Together chat completions in a separate interpreter process.
///
/// Keeps the Together client and its dependency footprint out of the calling
/// process. Every call spawns a fresh child; nothing is reused.
///
/// ## Protocol:
/// - **Environment:** the parent's environment, with `TOGETHER_API_KEY` overwritten.
///                    The key never travels over stdin or the command line.
/// - **Stdin:** one JSON array of `{"role", "content"}` messages, then EOF.
/// - **Stdout:** the plain completion text (exit code 0).
/// - **Stderr:** an explanatory message when the child exits non-zero.
///
/// The child runs with the script's directory as its working directory and is
/// killed if it does not finish within the configured timeout.
#[derive(Debug)]
pub struct TogetherRunner {
    interpreter: PathBuf,
    script: PathBuf,
    timeout: Duration,
    api_key: Option<SecretString>,
}

impl TogetherRunner {
    pub fn new(config: TogetherConfig, api_key: Option<SecretString>) -> Self {
        Self {
            interpreter: config.interpreter,
            script: config.script,
            timeout: config.timeout,
            api_key,
        }
    }

    /// Sends `conversation` to the child and returns its trimmed stdout.
    ///
    /// The credential and both paths are checked before anything is spawned.
    #[instrument(skip_all, fields(script = ?self.script, messages = conversation.len()))]
    pub async fn run(&self, conversation: &[Message]) -> Result<String, RunnerError> {
        // --- Preconditions ---
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty())
            .ok_or(RunnerError::MissingCredential(TOGETHER_API_KEY))?;
        if !self.interpreter.exists() {
            return Err(RunnerError::InterpreterNotFound(self.interpreter.clone()));
        }
        if !self.script.is_file() {
            return Err(RunnerError::ScriptNotFound(self.script.clone()));
        }

        // The working directory changes below, so relative paths must be resolved
        // first. Symlinks stay untouched: a venv interpreter is usually one.
        let interpreter = absolute(&self.interpreter)?;
        let script = absolute(&self.script)?;
        let working_dir = script.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

        let request_json = serde_json::to_vec(conversation).map_err(RunnerError::RequestSerialization)?;

        // --- Spawn Process ---
        let mut child = Command::new(&interpreter)
            .arg(&script)
            .current_dir(&working_dir)
            .env(TOGETHER_API_KEY, api_key)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::ProcessSpawn(interpreter.clone(), e))?;
        debug!(pid = ?child.id(), "Spawned Together runner");

        let mut stdin = child.stdin.take().ok_or_else(|| RunnerError::StdinWrite(
            std::io::Error::new(ErrorKind::Other, "Failed to open stdin")
        ))?;
        let mut stdout_handle = child.stdout.take().ok_or_else(|| RunnerError::OutputRead(
            std::io::Error::new(ErrorKind::Other, "Failed to open stdout")
        ))?;
        let mut stderr_handle = child.stderr.take().ok_or_else(|| RunnerError::OutputRead(
            std::io::Error::new(ErrorKind::Other, "Failed to open stderr")
        ))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        // Write stdin and drain both output pipes concurrently so that neither side
        // can block on a full pipe buffer.
        let exchange = async {
            let write = async move {
                stdin.write_all(&request_json).await?;
                // Close stdin to signal the end of input
                stdin.shutdown().await
            };
            let (write_res, stdout_res, stderr_res) = tokio::join!(
                write,
                stdout_handle.read_to_end(&mut stdout_buf),
                stderr_handle.read_to_end(&mut stderr_buf),
            );
            let status = child.wait().await;
            (write_res, stdout_res, stderr_res, status)
        };

        let outcome = tokio::time::timeout(self.timeout, exchange).await;
        let (write_res, stdout_res, stderr_res, status) = match outcome {
            Ok(results) => results,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Together runner timed out; killing child");
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "Failed to kill Together runner; relying on kill_on_drop");
                }
                return Err(RunnerError::Timeout(self.timeout));
            }
        };

        let status = status.map_err(RunnerError::OutputRead)?;
        stdout_res.map_err(RunnerError::OutputRead)?;
        stderr_res.map_err(RunnerError::OutputRead)?;

        let stderr_str = String::from_utf8_lossy(&stderr_buf).trim().to_string();

        // --- Handle based on Exit Status ---
        if !status.success() {
            warn!(%status, stderr = %stderr_str, "Together runner exited non-zero");
            return Err(RunnerError::ProcessFailed { status, stderr: stderr_str });
        }

        match write_res {
            // The child may legitimately exit before reading all of its input.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Together runner closed stdin early");
            }
            Err(e) => return Err(RunnerError::StdinWrite(e)),
            Ok(()) => {}
        }

        if !stderr_str.is_empty() {
            debug!(stderr = %stderr_str, "Together runner stderr");
        }

        let completion = String::from_utf8_lossy(&stdout_buf).trim().to_string();
        if completion.is_empty() {
            warn!("Together runner succeeded but wrote nothing to stdout");
        }
        debug!(chars = completion.len(), "Together runner returned completion");
        Ok(completion)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, RunnerError> {
    std::path::absolute(path).map_err(|e| RunnerError::ProcessSpawn(path.to_path_buf(), e))
}
