use std::time::Duration;

use puppy_core::chat::{BackendFamily, ChatError};
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use super::auth::{bearer_headers, json_headers, mint_access_token};
use super::config::{AdapterConfig, Credentials};

/// Immutable per-adapter state, shared read-only by every call.
#[derive(Debug)]
pub struct BackendConfig {
    pub endpoint: Url,
    pub model: String,
    pub family: BackendFamily,
    pub system_message: String,
    /// `None` for the out-of-process backend, which makes no HTTP calls itself.
    pub headers: Option<HeaderMap>,
    pub extra_params: Map<String, Value>,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Resolves headers for the model's family. For Gemini this may run
    /// `gcloud` once; nothing here is refreshed afterwards.
    #[instrument(name = "backend_config_new", skip_all, fields(model = %config.model))]
    pub(crate) async fn resolve(config: &AdapterConfig, credentials: &Credentials) -> Result<Self, ChatError> {
        let family = BackendFamily::from_model(&config.model);

        let headers = match family {
            BackendFamily::Gemini => {
                let token = match config.access_token.clone() {
                    Some(token) if config.has_access_token() => {
                        debug!("Using provided access token.");
                        token
                    }
                    _ => mint_access_token(&config.gcloud_program).await?,
                };
                Some(bearer_headers(&token)?)
            }
            BackendFamily::Tgi => Some(json_headers()),
            BackendFamily::Together => None,
            BackendFamily::OpenAiCompatible => Some(bearer_headers(credentials.require_openai()?)?),
        };

        debug!(%family, endpoint = %config.endpoint, "Backend configuration resolved.");
        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            family,
            system_message: config.system_message.clone(),
            headers,
            extra_params: config.extra_params.clone(),
            timeout: config.timeout,
        })
    }
}
