//! Backend implementations for `puppy_core`: the HTTP adapter over Gemini, TGI and
//! OpenAI-compatible servers, and the out-of-process Together runner.

pub mod adapter;
pub mod together;

pub use adapter::{AdapterConfig, ChatAdapter, Credentials, TogetherConfig};
