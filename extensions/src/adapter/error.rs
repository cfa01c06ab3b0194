use std::time::Duration;

use puppy_core::chat::{ChatError, FailureOrigin};
use reqwest::StatusCode;
use tracing::{error, warn};

/// Marker text some OpenAI-compatible servers put in a 422 body when the prompt
/// is longer than the model's context window.
const CONTEXT_LENGTH_MARKER: &str = "must have less than";

/// Shared helper to process a `reqwest::Response` with a non-success status.
///
/// A 422 whose body contains the context-length marker becomes
/// `ChatError::ContextLengthExceeded`; everything else becomes a
/// `TransportFailure` carrying the status and the raw body.
pub(crate) async fn map_response_error(response: reqwest::Response, timeout: Duration) -> ChatError {
    let status = response.status();
    debug_assert!(!status.is_success(), "map_response_error called with success status");

    match response.text().await {
        Ok(body_text) => classify_error_body(status, body_text),
        Err(e) => {
            // Failed even to read the error body text
            warn!(status = %status, error = %e, "Failed to read error response body text.");
            let mut err = map_request_error(e, timeout);
            if let ChatError::TransportFailure { origin, .. } = &mut err {
                *origin = FailureOrigin::Http { status: Some(status.as_u16()) };
            }
            err
        }
    }
}

pub(crate) fn classify_error_body(status: StatusCode, body_text: String) -> ChatError {
    if status == StatusCode::UNPROCESSABLE_ENTITY && body_text.contains(CONTEXT_LENGTH_MARKER) {
        warn!(%status, "Request rejected: context length exceeded");
        return ChatError::ContextLengthExceeded { body: body_text };
    }
    error!(%status, body = %body_text, "Backend returned error status");
    ChatError::http(Some(status.as_u16()), body_text)
}

/// Maps a failure to send a request or read its response.
pub(crate) fn map_request_error(err: reqwest::Error, timeout: Duration) -> ChatError {
    if err.is_timeout() {
        error!(?timeout, "HTTP request timed out");
        return ChatError::Timeout {
            operation: "HTTP request".to_string(),
            after: timeout,
        };
    }
    error!(error = %err, "HTTP request failed");
    ChatError::TransportFailure {
        origin: FailureOrigin::Http { status: err.status().map(|s| s.as_u16()) },
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}
