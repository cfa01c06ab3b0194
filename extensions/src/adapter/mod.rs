//! One call signature over four chat-completion backends.
//!
//! The model name picks the backend family (see [`BackendFamily`]):
//!
//! | prefix        | transport                  | payload                         |
//! |---------------|----------------------------|---------------------------------|
//! | `gemini-pro*` | HTTP, gcloud bearer token  | single user turn, fixed sampling |
//! | `tgi*`        | HTTP                       | LLaMA2 prompt, fixed sampling    |
//! | `together*`   | child process              | `[system, user]` over stdin      |
//! | anything else | HTTP, `OPENAI_API_KEY`     | `{model, messages}` + extras     |

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use puppy_core::chat::{parse_response, BackendFamily, ChatEndpoint, ChatError, Message};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, trace};

use crate::together::TogetherRunner;
use error::{map_request_error, map_response_error};
use payload::{chat_completion_request, GeminiRequest, TgiRequest};

mod auth;
mod backend;
pub mod config;
mod error;
mod payload;

pub use backend::BackendConfig;
pub use config::{AdapterConfig, Credentials, TogetherConfig};

#[derive(Debug, Clone)]
pub struct ChatAdapter {
    backend: Arc<BackendConfig>,
    http_client: Client,
    together: Option<Arc<TogetherRunner>>,
}

impl ChatAdapter {
    /// Creates an adapter with a default HTTP client.
    ///
    /// # Errors
    /// - `MissingCredential` if the selected family needs a key that is absent.
    /// - `ExecutableNotFound`, `TransportFailure` or `Timeout` if minting a Gemini
    ///   access token fails.
    /// - `Configuration` if the HTTP client cannot be built.
    pub async fn new(config: AdapterConfig, credentials: Credentials) -> Result<Self, ChatError> {
        Self::new_with_options(config, credentials, None).await
    }

    /// Creates an adapter, optionally reusing a caller-provided `reqwest::Client`.
    #[instrument(name = "chat_adapter_new", skip_all, fields(model = %config.model()))]
    pub async fn new_with_options(
        config: AdapterConfig,
        credentials: Credentials,
        client_override: Option<Client>,
    ) -> Result<Self, ChatError> {
        let backend = BackendConfig::resolve(&config, &credentials).await?;

        let http_client = match client_override {
            Some(client) => {
                debug!("Using provided HTTP client.");
                client
            }
            None => {
                debug!(timeout = ?config.timeout, "Building default HTTP client.");
                Client::builder()
                    .timeout(config.timeout)
                    .build()
                    .map_err(|e| ChatError::Configuration(format!("Failed to build default HTTP client: {}", e)))?
            }
        };

        let together = (!backend.family.uses_http()).then(|| {
            Arc::new(TogetherRunner::new(
                config.together.clone(),
                credentials.together_api_key.clone(),
            ))
        });

        Ok(Self {
            backend: Arc::new(backend),
            http_client,
            together,
        })
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Returns the backend-agnostic callable: prompt in, completion text out.
    ///
    /// The closure owns a clone of the adapter, so it can be handed to other tasks.
    pub fn endpoint(
        &self,
    ) -> impl Fn(String) -> BoxFuture<'static, Result<String, ChatError>> + Clone + Send + Sync + use<> {
        let adapter = self.clone();
        move |input: String| {
            let adapter = adapter.clone();
            async move { adapter.call(&input).await }.boxed()
        }
    }

    /// Sends `input` as the user turn under the configured system message.
    #[instrument(skip_all, fields(model = %self.backend.model, family = %self.backend.family))]
    pub async fn call(&self, input: &str) -> Result<String, ChatError> {
        let conversation = [
            Message::system(self.backend.system_message.as_str()),
            Message::user(input),
        ];

        match self.backend.family {
            BackendFamily::Gemini => self.post(&GeminiRequest::new(input)).await,
            BackendFamily::Tgi => self.post(&TgiRequest::new(&conversation)).await,
            BackendFamily::Together => {
                let runner = self.together.as_ref().ok_or_else(|| {
                    ChatError::Configuration("Together runner is not configured".to_string())
                })?;
                Ok(runner.run(&conversation).await?)
            }
            BackendFamily::OpenAiCompatible => {
                let payload = chat_completion_request(
                    &self.backend.model,
                    &conversation,
                    &self.backend.extra_params,
                )
                .map_err(|e| ChatError::Configuration(format!("Failed to build request payload: {}", e)))?;
                self.post(&payload).await
            }
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, ChatError> {
        let backend = &self.backend;
        debug!(endpoint = %backend.endpoint, "Sending request");

        let response = self.http_client
            .post(backend.endpoint.clone())
            .headers(backend.headers.clone().unwrap_or_default())
            // Per request, so an injected client is bounded too.
            .timeout(backend.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| map_request_error(e, backend.timeout))?;

        if !response.status().is_success() {
            return Err(map_response_error(response, backend.timeout).await);
        }

        let status = response.status();
        debug!(%status, "Received successful response");
        let raw_body = response.text()
            .await
            .map_err(|e| map_request_error(e, backend.timeout))?;
        trace!(body = %raw_body, "Received response body");

        let body: Value = serde_json::from_str(&raw_body).map_err(|e| {
            error!(parse_error = %e, raw_body = %raw_body, "Response body is not valid JSON");
            ChatError::Parse {
                model: backend.model.clone(),
                message: format!("invalid JSON: {}", e),
            }
        })?;

        parse_response(&backend.model, &body)
    }
}

impl ChatEndpoint for ChatAdapter {
    async fn complete(&self, input: &str) -> Result<String, ChatError> {
        self.call(input).await
    }
}
