pub mod ai;
pub mod config;
pub mod conversation;
pub mod render;
pub mod state;
pub mod view;

// Re-export main types for convenience
pub use ai::{BackendClient, BackendError, ChatBackend};
pub use config::{Config, SubmitPolicy};
pub use conversation::{Conversation, ConversationEvent, SubmitOutcome};
pub use render::render_content;
pub use state::{ChatMessage, ChatRole};
pub use view::{RenderedMessage, TranscriptView};
