use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use partchat_core::{ChatRole, SubmitPolicy};
use crate::app::App;

const INPUT_PLACEHOLDER: &str = "Type a message...";
const MAX_INPUT_LINES: u16 = 5;

/// Terminal counterpart of the stylesheet, keyed on the same class names
/// the HTML transcript carries.
fn class_style(class: &str) -> Style {
    match class {
        "user-message" => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        "assistant-message" => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "You:",
        ChatRole::Assistant => "Assistant:",
    }
}

/// Convert inline **bold** and `code` markdown in one line to styled spans.
/// Unclosed markers are kept as literal text.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold_at = rest.find("**");
        let code_at = rest.find('`');

        let (start, marker, style) = match (bold_at, code_at) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Green)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Green)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        let inner = &after[..end];
        if inner.is_empty() {
            spans.push(Span::raw(format!("{marker}{marker}")));
        } else {
            spans.push(Span::styled(inner.to_string(), style));
        }
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let input_lines = (app.conversation.input().split('\n').count() as u16).clamp(1, MAX_INPUT_LINES);

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn policy_label(policy: SubmitPolicy) -> Option<&'static str> {
    match policy {
        SubmitPolicy::Concurrent => None,
        SubmitPolicy::Serialized => Some(" one at a time "),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Parts Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.backend_url), Style::default().fg(Color::Gray)),
    ];
    if let Some(label) = policy_label(app.conversation.policy()) {
        spans.push(Span::styled(label, Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));
    let title = Line::from(spans);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, for scroll calculations
    let resized = app.chat_height != area.height.saturating_sub(2)
        || app.chat_width != area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if resized {
        app.scroll_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let mut lines: Vec<Line> = Vec::new();

    for (entry, msg) in app.transcript.entries().iter().zip(app.conversation.messages()) {
        // Empty messages keep their slot in the log but draw nothing
        if entry.bubble.is_none() {
            continue;
        }

        lines.push(Line::from(Span::styled(
            role_label(entry.role),
            class_style(entry.role.css_class()),
        )));
        match entry.role {
            ChatRole::User => {
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.conversation.is_awaiting() {
        lines.push(Line::from(Span::styled(
            role_label(ChatRole::Assistant),
            class_style(ChatRole::Assistant.css_class()),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message (Enter to send, Shift+Enter for newline) ");

    let input = app.conversation.input();
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor row/column inside the buffer
    let before_cursor: String = input.chars().take(app.conversation.cursor()).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);

    // Keep the cursor row and column visible
    let row_offset = (cursor_row + 1).saturating_sub(inner_height.max(1));
    let col_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let paragraph = if input.is_empty() {
        Paragraph::new(Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        let visible: Vec<Line> = input
            .split('\n')
            .skip(row_offset)
            .take(inner_height.max(1))
            .map(|line| {
                Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>())
            })
            .collect();
        Paragraph::new(Text::from(visible)).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(paragraph.block(block), area);

    frame.set_cursor_position((
        area.x + 1 + (cursor_col - col_offset) as u16,
        area.y + 1 + (cursor_row - row_offset) as u16,
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::White);

    let mut spans = Vec::new();
    for (key, label) in [
        ("Enter", "send"),
        ("Shift+Enter", "newline"),
        ("PgUp/PgDn", "scroll"),
        ("Ctrl+S", "save HTML"),
        ("Esc", "quit"),
    ] {
        spans.push(Span::styled(format!(" {key} "), key_style));
        spans.push(Span::styled(format!(" {label} "), label_style));
    }

    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {status}"), Style::default().fg(Color::Green)));
    } else if app.conversation.in_flight() > 1 {
        spans.push(Span::styled(
            format!(" {} replies pending", app.conversation.in_flight()),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_span_is_styled() {
        let line = parse_markdown_line("Part **PS123** fits");
        assert_eq!(plain(&line), "Part PS123 fits");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_code_span_is_styled() {
        let line = parse_markdown_line("run `cargo` now");
        assert_eq!(plain(&line), "run cargo now");
        assert_eq!(line.spans[1].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(plain(&line), "a **b");
    }

    #[test]
    fn test_class_style_follows_role_class() {
        assert_eq!(class_style("user-message").fg, Some(Color::Cyan));
        assert_eq!(class_style("assistant-message").fg, Some(Color::Yellow));
        assert_eq!(class_style("unknown"), Style::default());
    }

    #[test]
    fn test_policy_label_only_for_serialized() {
        assert_eq!(policy_label(SubmitPolicy::Concurrent), None);
        assert_eq!(policy_label(SubmitPolicy::Serialized), Some(" one at a time "));
    }
}
