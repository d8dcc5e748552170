//! Chat prompt for story generation.

use serde::Serialize;

/// Instruction given to the model as the system message.
///
/// The 100-word limit is only requested here; nothing downstream checks it.
pub const SYSTEM_INSTRUCTION: &str = "As an experienced short story writer, write story title and then create a meaningful story influenced by provided words. \
Ensure stories conclude positively within 100 words. Remember the story must end within 100 words";

/// One role-tagged chat message. Each message carries the sampling temperature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub temperature: f32,
}

/// Build the two-message prompt for a caption.
pub fn story_prompt(caption: &str, temperature: f32) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_INSTRUCTION.to_string(),
            temperature,
        },
        ChatMessage {
            role: "user".to_string(),
            content: format!("Here is input set of words: {caption}"),
            temperature,
        },
    ]
}
