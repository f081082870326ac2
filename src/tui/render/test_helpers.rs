use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Position;

use crate::tui::session::Session;
use crate::tui::theme::Theme;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Plain text of a buffer: trailing spaces and trailing blank rows trimmed.
pub fn buffer_to_string(buf: &Buffer) -> String {
    let w = buf.area.width as usize;
    if w == 0 {
        return String::new();
    }
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Draw the session at its own viewport size; return text and cursor.
pub fn render_with_cursor(session: &Session) -> (String, Position) {
    let (w, h) = session.viewport();
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    let theme = Theme::default();
    terminal
        .draw(|frame| super::render(frame, session, &theme))
        .unwrap();
    let cursor = terminal.get_cursor_position().unwrap();
    (buffer_to_string(terminal.backend().buffer()), cursor)
}

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_session(session: &Session) -> String {
    render_with_cursor(session).0
}
