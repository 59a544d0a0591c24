pub mod backend;

use std::future::Future;

use crate::state::ChatMessage;

pub use backend::{BackendClient, BackendError, NO_RESPONSE_MESSAGE, UNREACHABLE_MESSAGE};

/// Anything the conversation can hand a user query to.
///
/// `send` must always resolve to exactly one assistant message; failures are
/// folded into the message content rather than returned.
pub trait ChatBackend: Send + Sync + 'static {
    fn send(&self, query: &str) -> impl Future<Output = ChatMessage> + Send;
}
