//! Conversation controller
//!
//! Owns the message log and the pending input buffer. A Submit appends the
//! user's message, clears the buffer and hands the query to the backend on
//! the tokio runtime; the reply comes back over a channel and is appended by
//! [`Conversation::receive_reply`]. Front ends never touch the log directly:
//! they read it through accessors and learn about changes by subscribing.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::ai::ChatBackend;
use crate::config::{Config, SubmitPolicy};
use crate::state::{ChatMessage, SEED_GREETING};

/// Appended when the controller itself fails to get a reply out of the
/// backend (no runtime to run on, or the backend future panicked).
pub const CONTROLLER_FALLBACK_MESSAGE: &str = "⚠️ Unable to reach backend.";

/// Change notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEvent {
    MessageAppended { index: usize },
    InputChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Trimmed input was empty; nothing happened
    Ignored,
    /// Backend call is running
    Dispatched { id: u64 },
    /// Waiting behind an earlier call (serialized policy only)
    Queued { id: u64 },
    /// The call could not be started; the fallback reply is already in the log
    Failed { id: u64 },
}

/// A resolved backend call. Only the dispatch task creates these.
#[derive(Debug)]
pub(crate) struct Reply {
    id: u64,
    message: ChatMessage,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct Conversation<B> {
    backend: Arc<B>,
    policy: SubmitPolicy,

    messages: Vec<ChatMessage>,
    input: String,
    cursor: usize, // char index into input

    // Submissions without a reply yet, queued ones included
    in_flight: usize,
    queued: VecDeque<(u64, String)>,
    next_id: u64,

    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
    subscribers: Vec<mpsc::UnboundedSender<ConversationEvent>>,
}

impl<B: ChatBackend> Conversation<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_options(backend, SEED_GREETING, SubmitPolicy::default())
    }

    pub fn from_config(backend: Arc<B>, config: &Config) -> Self {
        Self::with_options(backend, config.greeting.clone(), config.submit_policy)
    }

    pub fn with_options(backend: Arc<B>, greeting: impl Into<String>, policy: SubmitPolicy) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        Self {
            backend,
            policy,
            messages: vec![ChatMessage::assistant(greeting)],
            input: String::new(),
            cursor: 0,
            in_flight: 0,
            queued: VecDeque::new(),
            next_id: 0,
            reply_tx,
            reply_rx,
            subscribers: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_awaiting(&self) -> bool {
        self.in_flight > 0
    }

    /// Register for change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: ConversationEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        let index = self.messages.len() - 1;
        self.notify(ConversationEvent::MessageAppended { index });
    }

    // Input buffer editing

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.cursor = self.input.chars().count();
        self.notify(ConversationEvent::InputChanged);
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
        self.notify(ConversationEvent::InputChanged);
    }

    /// Shift+Enter: a literal newline, never a Submit
    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
            self.notify(ConversationEvent::InputChanged);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
            self.notify(ConversationEvent::InputChanged);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let char_count = self.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Submit the pending input.
    ///
    /// Returns right after the buffer is cleared; the backend reply arrives
    /// later through [`Conversation::receive_reply`].
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.input.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.append(ChatMessage::user(self.input.clone()));
        let snapshot = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.notify(ConversationEvent::InputChanged);

        self.in_flight += 1;
        tracing::debug!(id, in_flight = self.in_flight, "Submitted query");

        if self.policy == SubmitPolicy::Serialized && self.in_flight > 1 {
            self.queued.push_back((id, snapshot));
            return SubmitOutcome::Queued { id };
        }

        if self.dispatch(id, snapshot) {
            SubmitOutcome::Dispatched { id }
        } else {
            SubmitOutcome::Failed { id }
        }
    }

    /// Start the backend call. Returns false when it could not be started;
    /// the fallback reply has been applied by then.
    fn dispatch(&mut self, id: u64, query: String) -> bool {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(id, "Error fetching AI message: {e}");
                self.apply_reply(Reply {
                    id,
                    message: ChatMessage::assistant(CONTROLLER_FALLBACK_MESSAGE),
                });
                return false;
            }
        };

        let backend = Arc::clone(&self.backend);
        let reply_tx = self.reply_tx.clone();

        handle.spawn(async move {
            // The call itself goes inside the caught future so a panic before
            // `send` returns its future is caught too
            let call = async { backend.send(&query).await };
            let message = match AssertUnwindSafe(call).catch_unwind().await {
                Ok(message) => message,
                Err(_) => {
                    tracing::error!(id, "Error fetching AI message: backend call panicked");
                    ChatMessage::assistant(CONTROLLER_FALLBACK_MESSAGE)
                }
            };

            // Receiver is gone only when the conversation was dropped
            let _ = reply_tx.send(Reply { id, message });
        });
        true
    }

    /// Wait for the next backend reply and apply it.
    ///
    /// Pending forever while nothing is in flight, so it can be raced against
    /// other events in `select!`. Cancel safe: a reply is either still in the
    /// channel or already appended.
    pub async fn receive_reply(&mut self) {
        // The conversation holds a sender, so the channel never closes
        if let Some(reply) = self.reply_rx.recv().await {
            self.apply_reply(reply);
        }
    }

    /// The Resolve transition: append the reply and, when serialized, start
    /// the next queued query.
    fn apply_reply(&mut self, reply: Reply) {
        debug_assert!(self.in_flight > 0, "reply {} without a pending submit", reply.id);

        let mut message = reply.message;
        if !message.is_assistant() {
            tracing::warn!(id = reply.id, "Backend produced a non-assistant message; relabelling");
            message = ChatMessage::assistant(message.content);
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        tracing::debug!(id = reply.id, in_flight = self.in_flight, "Resolved query");
        self.append(message);

        if self.policy == SubmitPolicy::Serialized {
            if let Some((id, query)) = self.queued.pop_front() {
                self.dispatch(id, query);
            }
        }
    }

    /// Wait for one reply and apply it. Returns false when nothing is in flight.
    pub async fn resolve_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }

        self.receive_reply().await;
        true
    }

    /// Apply every reply that has already arrived, without waiting.
    pub fn drain_replies(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.apply_reply(reply);
            applied += 1;
        }
        applied
    }
}
