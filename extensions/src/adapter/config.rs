use std::path::{Path, PathBuf};
use std::time::Duration;

use puppy_core::chat::ChatError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const TOGETHER_API_KEY: &str = "TOGETHER_API_KEY";

const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_TOGETHER_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TOGETHER_VENV: &str = "venv_together";
const DEFAULT_TOGETHER_SCRIPT: &str = "together_chat.py";
const DEFAULT_GCLOUD_PROGRAM: &str = "gcloud";

/// API keys, read once and handed to the adapter.
///
/// Empty values are treated as absent so that a blank `.env` entry can never turn
/// into an empty bearer header.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub(crate) openai_api_key: Option<SecretString>,
    pub(crate) together_api_key: Option<SecretString>,
}

impl Credentials {
    /// Reads `OPENAI_API_KEY` and `TOGETHER_API_KEY` from the process environment.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: read_env(OPENAI_API_KEY),
            together_api_key: read_env(TOGETHER_API_KEY),
        }
    }

    /// Loads a `.env` file (if present) into the environment, then reads it.
    pub fn from_dotenv() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = non_empty(key.into());
        self
    }

    pub fn together_api_key(mut self, key: impl Into<String>) -> Self {
        self.together_api_key = non_empty(key.into());
        self
    }

    pub(crate) fn require_openai(&self) -> Result<&SecretString, ChatError> {
        self.openai_api_key
            .as_ref()
            .ok_or_else(|| ChatError::MissingCredential(OPENAI_API_KEY.to_string()))
    }
}

fn read_env(name: &str) -> Option<SecretString> {
    let value = std::env::var(name).ok().and_then(non_empty);
    debug!(variable = name, present = value.is_some(), "Read credential from environment");
    value
}

fn non_empty(value: String) -> Option<SecretString> {
    let value = value.trim();
    (!value.is_empty()).then(|| SecretString::from(value.to_string()))
}

/// Where and how the out-of-process Together backend is run.
#[derive(Clone, Debug)]
pub struct TogetherConfig {
    pub(crate) interpreter: PathBuf,
    pub(crate) script: PathBuf,
    pub(crate) timeout: Duration,
}

impl Default for TogetherConfig {
    fn default() -> Self {
        Self {
            interpreter: venv_python_path(Path::new(DEFAULT_TOGETHER_VENV)),
            script: PathBuf::from(DEFAULT_TOGETHER_SCRIPT),
            timeout: DEFAULT_TOGETHER_TIMEOUT,
        }
    }
}

impl TogetherConfig {
    pub fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            ..Default::default()
        }
    }

    /// Uses the interpreter of an existing virtual environment.
    pub fn with_venv(venv: impl AsRef<Path>, script: impl Into<PathBuf>) -> Self {
        Self::new(venv_python_path(venv.as_ref()), script)
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Settings for one `ChatAdapter`.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    pub(crate) endpoint: Url,
    pub(crate) model: String,
    pub(crate) system_message: String,
    pub(crate) extra_params: Map<String, Value>,
    /// Timeout for HTTP requests. Defaults to 600 seconds.
    pub(crate) timeout: Duration,
    pub(crate) together: TogetherConfig,
    /// Pre-minted bearer token for Gemini; skips the gcloud call when set.
    pub(crate) access_token: Option<SecretString>,
    pub(crate) gcloud_program: PathBuf,
}

impl AdapterConfig {
    /// Creates a configuration for `model` served at `endpoint`.
    ///
    /// # Errors
    /// Returns `ChatError::Configuration` if the endpoint is not a valid absolute URL
    /// or the model name is empty.
    pub fn new(endpoint: &str, model: impl Into<String>) -> Result<Self, ChatError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ChatError::Configuration(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ChatError::Configuration("Model name cannot be empty".to_string()));
        }

        Ok(Self {
            endpoint,
            model,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            extra_params: Map::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            together: TogetherConfig::default(),
            access_token: None,
            gcloud_program: PathBuf::from(DEFAULT_GCLOUD_PROGRAM),
        })
    }

    #[must_use]
    pub fn system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    /// Extra fields merged into OpenAI-compatible payloads, overriding `model`/`messages`
    /// on key collision.
    #[must_use]
    pub fn extra_params(mut self, extra_params: Map<String, Value>) -> Self {
        self.extra_params = extra_params;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn together(mut self, together: TogetherConfig) -> Self {
        self.together = together;
        self
    }

    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    #[must_use]
    pub fn gcloud_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.gcloud_program = program.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn has_access_token(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().trim().is_empty())
    }
}

// --- Platform-specific Venv Paths ---

#[cfg(target_os = "windows")]
pub(crate) fn venv_python_path(venv_path: &Path) -> PathBuf {
    venv_path.join("Scripts").join("python.exe")
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn venv_python_path(venv_path: &Path) -> PathBuf {
    venv_path.join("bin").join("python")
}
