//! Backend-agnostic chat vocabulary: messages, the error taxonomy, model-prefix
//! dispatch, the LLaMA2 prompt template and response-body parsing.

pub mod chat;
