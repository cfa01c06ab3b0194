mod common;

use std::time::Duration;

use puppy_core::chat::{BackendFamily, ChatEndpoint, ChatError, DynChatEndpoint};
use puppy_extensions::{AdapterConfig, ChatAdapter, Credentials};
use reqwest::Client;
use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::setup_tracing;

fn openai_credentials() -> Credentials {
    Credentials::default().openai_api_key("sk-test")
}

async fn adapter_for(server: &MockServer, route: &str, model: &str) -> ChatAdapter {
    let config = AdapterConfig::new(&format!("{}{}", server.uri(), route), model).unwrap();
    ChatAdapter::new_with_options(config, openai_credentials(), Some(Client::new()))
        .await
        .expect("adapter should build")
}

#[tokio::test]
async fn openai_completion_is_extracted() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "What is 2+2?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "4" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-4").await;
    assert_eq!(adapter.backend().family, BackendFamily::OpenAiCompatible);
    assert_eq!(adapter.call("What is 2+2?").await.unwrap(), "4");
}

#[tokio::test]
async fn endpoint_closure_is_repeatable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "same answer" } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-3.5-turbo").await;
    let endpoint = adapter.endpoint();
    let first = endpoint("hello".to_string()).await.unwrap();
    let second = tokio::spawn(endpoint.clone()("hello".to_string())).await.unwrap().unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn extra_params_reach_the_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "gpt-4", "temperature": 0.0, "max_tokens": 12 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "{\"ok\": true}" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut extra = Map::new();
    extra.insert("temperature".into(), json!(0.0));
    extra.insert("max_tokens".into(), json!(12));
    let config = AdapterConfig::new(&server.uri(), "gpt-4")
        .unwrap()
        .system_message("Answer in JSON only.")
        .extra_params(extra);
    let adapter = ChatAdapter::new_with_options(config, openai_credentials(), None).await.unwrap();

    assert_eq!(adapter.backend().system_message, "Answer in JSON only.");
    assert_eq!(adapter.call("status?").await.unwrap(), "{\"ok\": true}");
}

#[tokio::test]
async fn context_length_422_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string(
            "Input validation error: `inputs` tokens + `max_new_tokens` must have less than 4097 tokens",
        ))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-4").await;
    let err = adapter.call("a very long prompt").await.unwrap_err();
    assert!(err.is_context_length_exceeded(), "unexpected error: {err:?}");
    assert!(err.to_string().contains("must have less than 4097 tokens"));
}

#[tokio::test]
async fn other_422_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown field `foo`"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-4").await;
    let err = adapter.call("hi").await.unwrap_err();
    assert!(matches!(err, ChatError::TransportFailure { .. }));
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-4").await;
    let err = adapter.call("hi").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "gpt-4").await;
    let err = adapter.call("hi").await.unwrap_err();
    assert!(matches!(err, ChatError::Parse { ref model, .. } if model == "gpt-4"));
}

#[tokio::test]
async fn unknown_model_fails_after_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "hi" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server, "/v1/chat/completions", "foo-bar").await;
    let err = adapter.call("hi").await.unwrap_err();
    assert!(matches!(err, ChatError::UnsupportedModel(ref model) if model == "foo-bar"));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = AdapterConfig::new(&server.uri(), "gpt-4")
        .unwrap()
        .timeout(Duration::from_millis(200));
    let adapter = ChatAdapter::new(config, openai_credentials()).await.unwrap();
    let err = adapter.call("hi").await.unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn injected_client_still_honours_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)).set_body_json(json!({
            "choices": [{ "message": { "content": "late" } }]
        })))
        .mount(&server)
        .await;

    let config = AdapterConfig::new(&server.uri(), "gpt-4")
        .unwrap()
        .timeout(Duration::from_millis(200));
    let adapter = ChatAdapter::new_with_options(config, openai_credentials(), Some(Client::new()))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let err = adapter.call("hi").await.unwrap_err();
    assert!(
        matches!(err, ChatError::Timeout { after, .. } if after == Duration::from_millis(200)),
        "unexpected error: {err:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn missing_openai_key_fails_at_construction() {
    let config = AdapterConfig::new("http://127.0.0.1:9/v1/chat/completions", "gpt-4").unwrap();
    let err = ChatAdapter::new(config, Credentials::default()).await.unwrap_err();
    assert!(matches!(err, ChatError::MissingCredential(ref name) if name == "OPENAI_API_KEY"));
}

#[tokio::test]
async fn tgi_sends_llama2_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "inputs": "<s>[INST] <<SYS>>\nYou are a helpful assistant.\n<</SYS>>\n\nName a colour. [/INST]",
            "parameters": { "do_sample": true, "max_new_tokens": 256, "stop": ["</s>"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": " Blue." }])))
        .expect(1)
        .mount(&server)
        .await;

    // TGI needs no credentials at all.
    let config = AdapterConfig::new(&format!("{}/generate", server.uri()), "tgi-llama2-7b").unwrap();
    let adapter = ChatAdapter::new_with_options(config, Credentials::default(), Some(Client::new()))
        .await
        .unwrap();
    assert_eq!(adapter.call("Name a colour.").await.unwrap(), " Blue.");
}

#[tokio::test]
async fn gemini_uses_provided_token_and_user_turn_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer ya29.test-token"))
        .and(body_partial_json(json!({
            "contents": { "role": "USER", "parts": { "text": "Say hi" } },
            "generation_config": { "top_k": 16, "max_output_tokens": 2048 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "hi" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::new(&server.uri(), "gemini-pro")
        .unwrap()
        .access_token("ya29.test-token");
    let adapter = ChatAdapter::new_with_options(config, Credentials::default(), Some(Client::new()))
        .await
        .unwrap();

    let endpoint = DynChatEndpoint::from_ref(&adapter);
    assert_eq!(endpoint.complete("Say hi").await.unwrap(), "hi");
}

#[cfg(unix)]
#[tokio::test]
async fn gemini_mints_token_with_gcloud() {
    let dir = tempfile::tempdir().unwrap();
    let gcloud = common::write_script(
        dir.path(),
        "gcloud",
        r#"[ "$1 $2" = "auth print-access-token" ] || exit 9
echo "ya29.minted""#,
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer ya29.minted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "minted ok" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::new(&server.uri(), "gemini-pro-vision")
        .unwrap()
        .gcloud_program(gcloud);
    let adapter = ChatAdapter::new(config, Credentials::default()).await.unwrap();
    assert_eq!(adapter.complete("hello").await.unwrap(), "minted ok");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_gcloud_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let gcloud = common::write_script(dir.path(), "gcloud", "echo 'not logged in' >&2\nexit 1");

    let config = AdapterConfig::new("http://127.0.0.1:9/", "gemini-pro")
        .unwrap()
        .gcloud_program(gcloud);
    let err = ChatAdapter::new(config, Credentials::default()).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(1));
    assert!(err.to_string().contains("not logged in"));
}
