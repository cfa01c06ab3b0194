//! LLaMA2 chat prompt template.
//!
//! TGI serves raw completion models, so the conversation has to be flattened into
//! the instruction format the chat checkpoints were trained on:
//!
//! ```text
//! <s>[INST] <<SYS>>
//! {system}
//! <</SYS>>
//!
//! {user} [/INST] {assistant}</s><s>[INST] {user} [/INST]
//! ```

use super::{Message, Role};

const START_PROMPT: &str = "<s>[INST] ";
const END_PROMPT: &str = " [/INST]";

/// Flattens a conversation into a single LLaMA2 instruction string.
///
/// - A `system` message at index 0 becomes the `<<SYS>>` block.
/// - `user` content is appended trimmed.
/// - Every other message, including unknown roles and a `system` message that is
///   not first, is rendered as an assistant turn closing the current `[INST]`
///   block and opening the next one. Nothing is dropped.
pub fn build_llama2_prompt(messages: &[Message]) -> String {
    let mut prompt = String::from(START_PROMPT);

    for (index, message) in messages.iter().enumerate() {
        match &message.role {
            Role::System if index == 0 => {
                prompt.push_str("<<SYS>>\n");
                prompt.push_str(&message.content);
                prompt.push_str("\n<</SYS>>\n\n");
            }
            Role::User => prompt.push_str(message.content.trim()),
            _ => {
                prompt.push_str(" [/INST] ");
                prompt.push_str(message.content.trim());
                prompt.push_str("</s><s>[INST] ");
            }
        }
    }

    prompt.push_str(END_PROMPT);
    prompt
}
