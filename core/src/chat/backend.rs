use std::fmt;

/// Upstream provider family, selected by model-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    /// `gemini-pro*` on Vertex AI, bearer token minted by gcloud.
    Gemini,
    /// `tgi*`, a self-hosted text-generation-inference server running a LLaMA2 chat model.
    Tgi,
    /// `together*`, run out of process.
    Together,
    /// Anything else is assumed to speak the OpenAI chat-completions protocol.
    OpenAiCompatible,
}

impl BackendFamily {
    pub fn from_model(model: &str) -> Self {
        if model.starts_with("gemini-pro") {
            BackendFamily::Gemini
        } else if model.starts_with("tgi") {
            BackendFamily::Tgi
        } else if model.starts_with("together") {
            BackendFamily::Together
        } else {
            BackendFamily::OpenAiCompatible
        }
    }

    /// Whether calls for this family go over HTTP from the calling process.
    pub fn uses_http(&self) -> bool {
        !matches!(self, BackendFamily::Together)
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendFamily::Gemini => "gemini",
            BackendFamily::Tgi => "tgi",
            BackendFamily::Together => "together",
            BackendFamily::OpenAiCompatible => "openai-compatible",
        })
    }
}
