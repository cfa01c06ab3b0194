use puppy_core::chat::{build_llama2_prompt, Message};
use serde::Serialize;
use serde_json::{Map, Value};

// ============== Gemini (Vertex AI generateContent) ==============
// Single-turn: only the user message is forwarded.

#[derive(Serialize, Debug)]
pub(crate) struct GeminiRequest<'a> {
    contents: GeminiContent<'a>,
    generation_config: GeminiGenerationConfig,
    safety_settings: GeminiSafetySetting,
}

#[derive(Serialize, Debug)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: GeminiPart<'a>,
}

#[derive(Serialize, Debug)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct GeminiGenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
    candidate_count: u32,
    stop_sequences: Vec<String>,
}

#[derive(Serialize, Debug)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl<'a> GeminiRequest<'a> {
    pub(crate) fn new(user_input: &'a str) -> Self {
        Self {
            contents: GeminiContent {
                role: "USER",
                parts: GeminiPart { text: user_input },
            },
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                top_p: 0.1,
                top_k: 16,
                max_output_tokens: 2048,
                candidate_count: 1,
                stop_sequences: Vec::new(),
            },
            safety_settings: GeminiSafetySetting {
                category: "HARM_CATEGORY_SEXUALLY_EXPLICIT",
                threshold: "BLOCK_LOW_AND_ABOVE",
            },
        }
    }
}

// ============== TGI (LLaMA2 chat served by text-generation-inference) ==============

#[derive(Serialize, Debug)]
pub(crate) struct TgiRequest {
    inputs: String,
    parameters: TgiParameters,
}

#[derive(Serialize, Debug)]
struct TgiParameters {
    do_sample: bool,
    top_p: f64,
    temperature: f64,
    top_k: u32,
    max_new_tokens: u32,
    repetition_penalty: f64,
    stop: Vec<&'static str>,
}

impl TgiRequest {
    pub(crate) fn new(conversation: &[Message]) -> Self {
        Self {
            inputs: build_llama2_prompt(conversation),
            parameters: TgiParameters {
                do_sample: true,
                top_p: 0.6,
                temperature: 0.8,
                top_k: 50,
                max_new_tokens: 256,
                repetition_penalty: 1.03,
                stop: vec!["</s>"],
            },
        }
    }
}

// ============== OpenAI-compatible chat completions ==============

/// `{model, messages}` with `extra_params` merged on top.
pub(crate) fn chat_completion_request(
    model: &str,
    conversation: &[Message],
    extra_params: &Map<String, Value>,
) -> Result<Value, serde_json::Error> {
    let mut payload = Map::new();
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload.insert("messages".to_string(), serde_json::to_value(conversation)?);
    for (key, value) in extra_params {
        payload.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(payload))
}
