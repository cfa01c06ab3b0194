use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use puppy_core::chat::{ChatError, FailureOrigin};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, error, instrument};

const TOKEN_MINT_TIMEOUT: Duration = Duration::from_secs(60);

/// Mints a short-lived OAuth access token with `gcloud auth print-access-token`.
///
/// Runs once per adapter; the token is never refreshed.
#[instrument(skip_all, fields(program = ?program))]
pub(crate) async fn mint_access_token(program: &Path) -> Result<SecretString, ChatError> {
    let run = Command::new(program)
        .args(["auth", "print-access-token"])
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(TOKEN_MINT_TIMEOUT, run).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
            error!("Token minting program not found");
            return Err(ChatError::ExecutableNotFound(program.to_path_buf()));
        }
        Ok(Err(e)) => {
            return Err(ChatError::TransportFailure {
                origin: FailureOrigin::Process { exit_code: None },
                message: format!("Failed to run {:?}: {}", program, e),
                source: Some(Box::new(e)),
            });
        }
        Err(_) => {
            return Err(ChatError::Timeout {
                operation: "Access token minting".to_string(),
                after: TOKEN_MINT_TIMEOUT,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(status = %output.status, "Token minting failed");
        return Err(ChatError::process(output.status.code(), stderr));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ChatError::MissingCredential("gcloud access token".to_string()));
    }
    debug!("Minted access token");
    Ok(SecretString::from(token))
}

pub(crate) fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// `Content-Type: application/json` plus a sensitive `Authorization: Bearer` header.
pub(crate) fn bearer_headers(token: &SecretString) -> Result<HeaderMap, ChatError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|_| ChatError::Configuration("Credential contains characters not allowed in a header".to_string()))?;
    value.set_sensitive(true);

    let mut headers = json_headers();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
