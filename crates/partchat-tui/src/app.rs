use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::{Context, Result};
use partchat_core::{BackendClient, ChatMessage, Config, Conversation, SubmitOutcome, TranscriptView};

const EXPORT_TITLE: &str = "Parts assistant conversation";

pub struct App {
    pub should_quit: bool,

    pub conversation: Conversation<BackendClient>,
    pub transcript: TranscriptView,
    pub backend_url: String,

    // Transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    pub animation_frame: u8,
    pub status: Option<String>,
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let client = BackendClient::from_config(config)
            .context("Failed to create backend client")?;
        let backend_url = client.endpoint().to_string();

        let mut conversation = Conversation::from_config(Arc::new(client), config);
        let transcript = TranscriptView::attach(&mut conversation);

        let export_dir = Config::data_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("exports");

        Ok(Self {
            should_quit: false,
            conversation,
            transcript,
            backend_url,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            status: None,
            export_dir,
        })
    }

    /// Submit the input box. Blank input is ignored silently.
    pub fn submit(&mut self) {
        match self.conversation.submit() {
            SubmitOutcome::Ignored => {}
            SubmitOutcome::Dispatched { id } => {
                tracing::info!(id, "Query sent to {}", self.backend_url);
                self.status = None;
            }
            SubmitOutcome::Queued { id } => {
                tracing::info!(id, "Query queued behind {} in flight", self.conversation.in_flight() - 1);
                self.status = Some("Queued until the current reply arrives".to_string());
            }
            SubmitOutcome::Failed { id } => {
                tracing::warn!(id, "Query could not be sent");
                self.status = Some("Unable to reach backend".to_string());
            }
        }
    }

    /// Insert pasted text at the cursor. Newlines are kept as literal
    /// newlines and never submit.
    pub fn paste(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\r' {
                continue;
            }
            self.conversation.insert_char(c);
        }
    }

    /// Pick up conversation changes; a log change always scrolls to the newest message.
    pub fn sync_transcript(&mut self) {
        if self.transcript.sync(&self.conversation) {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let visible = self
            .transcript
            .entries()
            .iter()
            .zip(self.conversation.messages())
            .filter(|(entry, _)| entry.bubble.is_some())
            .map(|(_, msg)| msg);

        let mut total = count_message_lines(visible, wrap_width);

        if self.conversation.is_awaiting() {
            total += 2; // "Assistant:" + "Thinking..."
        }

        total.min(u16::MAX as usize) as u16
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn page_size(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    /// Write the rendered transcript as a standalone HTML page
    pub fn export_transcript(&mut self) -> Result<PathBuf> {
        fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("Failed to create {:?}", self.export_dir))?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let path = self.export_dir.join(format!("transcript-{stamp}.html"));

        fs::write(&path, self.transcript.to_document(EXPORT_TITLE))
            .with_context(|| format!("Failed to write {:?}", path))?;

        tracing::info!(path = %path.display(), "Transcript exported");
        Ok(path)
    }
}

/// Lines the transcript occupies once wrapped: a role line, the wrapped
/// content and a blank separator per message.
fn count_message_lines<'a>(messages: impl Iterator<Item = &'a ChatMessage>, wrap_width: usize) -> usize {
    let wrap_width = wrap_width.max(1);
    let mut total_lines = 0;

    for msg in messages {
        total_lines += 1; // Role line
        for line in msg.content.lines() {
            // Character count, not byte length, for proper UTF-8 handling
            let char_count = line.chars().count();
            total_lines += char_count.div_ceil(wrap_width).max(1);
        }
        total_lines += 1; // Blank line after message
    }

    total_lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_app() -> App {
        let mut config = Config::new();
        config.backend_url = "http://127.0.0.1:1/chat".to_string();
        App::new(&config).unwrap()
    }

    #[test]
    fn test_paste_never_submits() {
        let mut app = test_app();
        app.paste("line one\r\nline two");

        assert_eq!(app.conversation.input(), "line one\nline two");
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[test]
    fn test_blank_submit_keeps_transcript() {
        let mut app = test_app();
        app.paste("   ");
        app.submit();
        app.sync_transcript();

        assert_eq!(app.transcript.entries().len(), 1);
        assert!(!app.conversation.is_awaiting());
    }

    #[test]
    fn test_submit_without_runtime_reports_failure() {
        let mut app = test_app();
        app.paste("Hello");
        app.submit();
        app.sync_transcript();

        assert_eq!(app.status.as_deref(), Some("Unable to reach backend"));
        assert_eq!(app.transcript.entries().len(), 3);
        assert!(!app.conversation.is_awaiting());
    }

    #[test]
    fn test_export_writes_document() {
        let dir = tempdir().unwrap();
        let mut app = test_app();
        app.export_dir = dir.path().join("exports");

        let path = app.export_transcript().unwrap();
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("<div class=\"messages-container\">"));
        assert!(html.contains("Hi, how can I help you today?"));
    }

    #[test]
    fn test_count_message_lines_wraps_long_lines() {
        let messages = vec![
            ChatMessage::assistant("short"),
            ChatMessage::user("a".repeat(25)),
        ];
        // short: 1 + 1 + 1, long: 1 + 3 + 1
        assert_eq!(count_message_lines(messages.iter(), 10), 8);
    }

    #[test]
    fn test_count_message_lines_counts_each_line() {
        let messages = vec![ChatMessage::assistant("one\n\nthree")];
        assert_eq!(count_message_lines(messages.iter(), 80), 5);
    }
}
