
// Implementation Notes:

//     Backends:
//         Every upstream provider is reached through one `ChatEndpoint` implementation
//         (see `puppy_extensions::adapter::ChatAdapter`). Which wire protocol is spoken
//         is decided by the model name alone, see `BackendFamily`.

//     Conversation state:
//         Conversations are built per call and thrown away once the text has been
//         extracted. Nothing here keeps history between calls.

use std::fmt;
use serde::{Deserialize, Serialize};

mod backend;
mod error;
pub mod prompt;
pub mod response;

pub use backend::BackendFamily;
pub use error::{ChatError, FailureOrigin};
pub use prompt::build_llama2_prompt;
pub use response::parse_response;

/// A single backend-agnostic completion call: text in, text out.
#[dynosaur::dynosaur(pub DynChatEndpoint)]
pub trait ChatEndpoint: Send + Sync {
    fn complete(&self, input: &str) -> impl Future<Output = Result<String, ChatError>> + Send;
}

/// Ordered list of messages. Order is conversation order.
pub type Conversation = Vec<Message>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Role tag of a message.
///
/// Serialized as the lowercase strings used by chat-completion APIs. Any other
/// string survives a round trip as `Role::Other`, so a conversation read from an
/// untrusted source is never silently dropped; consumers decide what an unknown
/// role means (the LLaMA2 formatter renders it as an assistant turn).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
