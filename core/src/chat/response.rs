use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::ChatError;

/// Response body layouts, one per known model-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseShape {
    /// `choices[0].message.content`
    ChatCompletion,
    /// `candidates[0].content.parts[0].text`
    GeminiCandidates,
    /// `generated_text`
    TgiGeneration,
}

impl ResponseShape {
    fn for_model(model: &str) -> Result<Self, ChatError> {
        if model.starts_with("gpt") || model.starts_with("together") {
            Ok(ResponseShape::ChatCompletion)
        } else if model.starts_with("gemini-pro") {
            Ok(ResponseShape::GeminiCandidates)
        } else if model.starts_with("tgi") {
            Ok(ResponseShape::TgiGeneration)
        } else {
            Err(ChatError::UnsupportedModel(model.to_string()))
        }
    }
}

// --- Chat completions (OpenAI, Together) ---

#[derive(Deserialize, Debug)]
struct ChatCompletionBody {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionMessage {
    content: String,
}

// --- Gemini generateContent ---

#[derive(Deserialize, Debug)]
struct GeminiBody {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize, Debug)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize, Debug)]
struct GeminiPart {
    text: String,
}

// --- TGI /generate ---

#[derive(Deserialize, Debug)]
struct TgiGeneration {
    generated_text: String,
}

/// TGI answers with a bare object, or with a one-element array on some routes.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum TgiBody {
    Single(TgiGeneration),
    Batch(Vec<TgiGeneration>),
}

/// Extracts the completion text from a decoded response body.
///
/// The layout is chosen by model-name prefix: `gpt*` and `together*` use the
/// chat-completions layout, `gemini-pro*` the Gemini candidates layout and
/// `tgi*` the text-generation-inference layout. Any other prefix fails with
/// `ChatError::UnsupportedModel` before the body is looked at.
pub fn parse_response(model: &str, body: &Value) -> Result<String, ChatError> {
    match ResponseShape::for_model(model)? {
        ResponseShape::ChatCompletion => {
            let body: ChatCompletionBody = decode(model, body)?;
            body.choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| missing(model, "choices[0].message.content"))
        }
        ResponseShape::GeminiCandidates => {
            let body: GeminiBody = decode(model, body)?;
            body.candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content.parts.into_iter().next())
                .map(|part| part.text)
                .ok_or_else(|| missing(model, "candidates[0].content.parts[0].text"))
        }
        ResponseShape::TgiGeneration => match decode::<TgiBody>(model, body)? {
            TgiBody::Single(generation) => Ok(generation.generated_text),
            TgiBody::Batch(batch) => batch
                .into_iter()
                .next()
                .map(|generation| generation.generated_text)
                .ok_or_else(|| missing(model, "generated_text")),
        },
    }
}

fn decode<T: DeserializeOwned>(model: &str, body: &Value) -> Result<T, ChatError> {
    T::deserialize(body).map_err(|e| {
        debug!(%model, error = %e, "Response body does not match the expected layout");
        ChatError::Parse {
            model: model.to_string(),
            message: e.to_string(),
        }
    })
}

fn missing(model: &str, path: &str) -> ChatError {
    ChatError::Parse {
        model: model.to_string(),
        message: format!("missing `{}`", path),
    }
}
