//! Transcript view model
//!
//! Subscribes to a [`Conversation`](crate::conversation::Conversation) and
//! keeps a rendered copy of the log: one slot per message, a bubble of
//! sanitized HTML for non-empty content, and a scroll anchor that always
//! points just past the newest entry after a log change.

use std::fmt::Write as _;

use tokio::sync::mpsc;

use crate::ai::ChatBackend;
use crate::conversation::{Conversation, ConversationEvent};
use crate::render::render_content;
use crate::state::{ChatMessage, ChatRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub class: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: ChatRole,
    pub container_class: &'static str,
    /// `None` for empty content: the slot exists but shows nothing
    pub bubble: Option<Bubble>,
}

impl RenderedMessage {
    pub fn from_message(message: &ChatMessage) -> Self {
        let bubble = (!message.content.is_empty()).then(|| Bubble {
            class: format!("message {}", message.role.css_class()),
            html: render_content(&message.content),
        });

        Self {
            role: message.role,
            container_class: message.role.container_class(),
            bubble,
        }
    }
}

pub struct TranscriptView {
    events: mpsc::UnboundedReceiver<ConversationEvent>,
    entries: Vec<RenderedMessage>,
    scroll_anchor: usize,
}

impl TranscriptView {
    pub fn attach<B: ChatBackend>(conversation: &mut Conversation<B>) -> Self {
        let events = conversation.subscribe();
        let mut view = Self {
            events,
            entries: Vec::new(),
            scroll_anchor: 0,
        };
        view.rerender(conversation.messages());
        view
    }

    /// Drain pending notifications; re-render from `conversation` when the
    /// log changed. Returns whether a re-render happened.
    ///
    /// `conversation` must be the one this view was attached to.
    pub fn sync<B: ChatBackend>(&mut self, conversation: &Conversation<B>) -> bool {
        let mut log_changed = false;
        while let Ok(event) = self.events.try_recv() {
            if let ConversationEvent::MessageAppended { .. } = event {
                log_changed = true;
            }
        }

        if log_changed {
            self.rerender(conversation.messages());
        }
        log_changed
    }

    fn rerender(&mut self, messages: &[ChatMessage]) {
        self.entries = messages.iter().map(RenderedMessage::from_message).collect();
        self.scroll_anchor = self.entries.len();
    }

    pub fn entries(&self) -> &[RenderedMessage] {
        &self.entries
    }

    /// Index just past the last message; where the view scrolls after a change
    pub fn scroll_anchor(&self) -> usize {
        self.scroll_anchor
    }

    /// The transcript as an HTML fragment
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"messages-container\">\n");

        for entry in &self.entries {
            let _ = write!(html, "  <div class=\"{}\">", entry.container_class);
            if let Some(bubble) = &entry.bubble {
                let _ = write!(
                    html,
                    "<div class=\"{}\"><div>{}</div></div>",
                    bubble.class, bubble.html
                );
            }
            html.push_str("</div>\n");
        }

        html.push_str("  <div id=\"messages-end\"></div>\n</div>\n");
        html
    }

    /// Standalone page wrapping [`TranscriptView::to_html`]
    pub fn to_document(&self, title: &str) -> String {
        let title = ammonia::clean_text(title);
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            self.to_html()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubmitPolicy;
    use std::future::Future;
    use std::sync::Arc;

    struct FixedBackend(&'static str);

    impl ChatBackend for FixedBackend {
        fn send(&self, _query: &str) -> impl Future<Output = ChatMessage> + Send {
            let reply = self.0;
            async move { ChatMessage::assistant(reply) }
        }
    }

    #[test]
    fn test_attach_renders_seed() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("ok")));
        let view = TranscriptView::attach(&mut conversation);

        assert_eq!(view.entries().len(), 1);
        assert_eq!(view.scroll_anchor(), 1);
        let bubble = view.entries()[0].bubble.as_ref().unwrap();
        assert_eq!(bubble.class, "message assistant-message");
        assert_eq!(bubble.html, "Hi, how can I help you today?");
    }

    #[tokio::test]
    async fn test_log_change_rerenders_and_scrolls_to_end() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("**Hi** there")));
        let mut view = TranscriptView::attach(&mut conversation);

        conversation.set_input("Hello");
        conversation.submit();
        assert!(view.sync(&conversation));
        assert_eq!(view.entries().len(), 2);
        assert_eq!(view.scroll_anchor(), 2);
        assert_eq!(view.entries()[1].container_class, "user-message-container");

        conversation.resolve_next().await;
        assert!(view.sync(&conversation));
        assert_eq!(view.scroll_anchor(), 3);

        let reply = view.entries()[2].bubble.as_ref().unwrap();
        assert_eq!(reply.html, "<strong>Hi</strong> there");
    }

    #[test]
    fn test_typing_does_not_rerender() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("ok")));
        let mut view = TranscriptView::attach(&mut conversation);
        let before = view.entries().to_vec();

        conversation.insert_char('a');
        conversation.backspace();
        assert!(!view.sync(&conversation));
        assert_eq!(view.entries(), before.as_slice());
        assert_eq!(view.scroll_anchor(), 1);
    }

    #[tokio::test]
    async fn test_sync_reads_the_attached_conversation() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("ok")));
        let mut view = TranscriptView::attach(&mut conversation);

        conversation.set_input("Hello");
        conversation.submit();
        conversation.resolve_next().await;

        assert!(view.sync(&conversation));
        let rendered: Vec<RenderedMessage> =
            conversation.messages().iter().map(RenderedMessage::from_message).collect();
        assert_eq!(view.entries(), rendered.as_slice());
        // Both appends collapse into a single re-render
        assert!(!view.sync(&conversation));
    }

    #[test]
    fn test_empty_message_keeps_slot_without_bubble() {
        let mut conversation =
            Conversation::with_options(Arc::new(FixedBackend("ok")), "", SubmitPolicy::Concurrent);
        let view = TranscriptView::attach(&mut conversation);

        assert_eq!(view.entries().len(), 1);
        assert!(view.entries()[0].bubble.is_none());
        assert!(view
            .to_html()
            .contains("<div class=\"assistant-message-container\"></div>"));
    }

    #[test]
    fn test_html_fragment_layout() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("ok")));
        let view = TranscriptView::attach(&mut conversation);
        let html = view.to_html();

        assert!(html.starts_with("<div class=\"messages-container\">"));
        assert!(html.contains(
            "<div class=\"assistant-message-container\"><div class=\"message assistant-message\"><div>Hi, how can I help you today?</div></div></div>"
        ));
        assert!(html.contains("<div id=\"messages-end\"></div>"));
    }

    #[test]
    fn test_user_html_is_sanitized() {
        let rendered = RenderedMessage::from_message(&ChatMessage::user("<img src=x onerror=alert(1)>"));
        let html = rendered.bubble.unwrap().html;
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_document_escapes_title() {
        let mut conversation = Conversation::new(Arc::new(FixedBackend("ok")));
        let view = TranscriptView::attach(&mut conversation);
        let doc = view.to_document("<Parts>");

        assert!(doc.contains("<title>&lt;Parts&gt;</title>"));
        assert!(doc.contains("messages-container"));
    }
}
