//! UI-agnostic conversation types
//!
//! These are shared between every front end (TUI, HTML export, one-shot CLI)
//! and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// Greeting every new conversation starts with
pub const SEED_GREETING: &str = "Hi, how can I help you today?";

/// A chat message in the conversation. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == ChatRole::Assistant
    }
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Class name of the message bubble, e.g. `assistant-message`.
    /// Styling (CSS or terminal theme) targets these names.
    pub fn css_class(&self) -> &'static str {
        match self {
            ChatRole::User => "user-message",
            ChatRole::Assistant => "assistant-message",
        }
    }

    /// Class name of the list slot wrapping the bubble
    pub fn container_class(&self) -> &'static str {
        match self {
            ChatRole::User => "user-message-container",
            ChatRole::Assistant => "assistant-message-container",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::assistant("Hi there");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Hi there"}"#);

        let parsed: ChatMessage = serde_json::from_str(r#"{"role":"user","content":"Hello"}"#).unwrap();
        assert_eq!(parsed, ChatMessage::user("Hello"));
    }

    #[test]
    fn test_class_names_follow_role() {
        assert_eq!(ChatRole::User.css_class(), "user-message");
        assert_eq!(ChatRole::Assistant.css_class(), "assistant-message");
        assert_eq!(ChatRole::User.container_class(), "user-message-container");
        assert_eq!(
            ChatRole::Assistant.container_class(),
            "assistant-message-container"
        );
    }
}
