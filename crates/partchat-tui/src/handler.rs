use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => app.paste(&text),
        // Wrap width changed; keep the newest message in view
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Char('s') if ctrl => match app.export_transcript() {
            Ok(path) => app.status = Some(format!("Saved {}", path.display())),
            Err(e) => {
                tracing::error!("Transcript export failed: {e:#}");
                app.status = Some(format!("Export failed: {e}"));
            }
        },

        // Shift+Enter is a literal newline. Alt+Enter too, for terminals
        // that can't report Shift on Enter.
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.conversation.insert_newline();
        }
        // Plain Enter submits; the newline never reaches the buffer
        KeyCode::Enter => app.submit(),

        KeyCode::Backspace => app.conversation.backspace(),
        KeyCode::Delete => app.conversation.delete(),
        KeyCode::Left => app.conversation.move_left(),
        KeyCode::Right => app.conversation.move_right(),
        KeyCode::Home => app.conversation.move_home(),
        KeyCode::End => app.conversation.move_end(),

        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.page_size()),
        KeyCode::PageDown => app.scroll_down(app.page_size()),

        KeyCode::Char(c) if !ctrl => app.conversation.insert_char(c),
        _ => {}
    }

    Ok(())
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
