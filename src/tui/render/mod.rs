#[cfg(test)]
pub mod test_helpers;

use std::ops::Range;

use ratatui::Frame;
use ratatui::layout::Position;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use super::session::{NoticeLevel, Session};
use super::theme::Theme;
use super::view::{self, DisplayLine, LineStyle};
use crate::util::unicode;

/// Main render function: project the session, then paint it
pub fn render(frame: &mut Frame, session: &Session, theme: &Theme) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    let screen = view::render(session);
    let width = usize::from(area.width);
    let lines: Vec<Line> = screen
        .lines
        .iter()
        .map(|line| styled_line(line, theme, width))
        .collect();
    frame.render_widget(Paragraph::new(lines).style(bg_style), area);

    if let Some((x, y)) = screen.cursor {
        frame.set_cursor_position(Position::new(area.x + x, area.y + y));
    }
}

fn base_style(style: LineStyle, theme: &Theme) -> Style {
    let s = Style::default().bg(theme.background);
    match style {
        LineStyle::Header => s.fg(theme.text_bright).add_modifier(Modifier::BOLD),
        LineStyle::Row { status, selected } => {
            let s = s.fg(theme.status_color(status));
            if selected {
                s.bg(theme.selection_bg).add_modifier(Modifier::BOLD)
            } else {
                s
            }
        }
        LineStyle::Separator | LineStyle::Hint | LineStyle::Blank => s.fg(theme.dim),
        LineStyle::Meta => s.fg(theme.cyan),
        LineStyle::Preview | LineStyle::Field => s.fg(theme.text),
        LineStyle::Label { focused: true } => s.fg(theme.highlight).add_modifier(Modifier::BOLD),
        LineStyle::Label { focused: false } => s.fg(theme.dim),
        LineStyle::Search => s.fg(theme.text_bright),
        LineStyle::Busy => s.fg(theme.yellow),
        LineStyle::Notice(NoticeLevel::Info) => s.fg(theme.green),
        LineStyle::Notice(NoticeLevel::Warning) => s.fg(theme.yellow),
        LineStyle::Notice(NoticeLevel::Error) => s.fg(theme.red),
    }
}

fn styled_line<'a>(line: &'a DisplayLine, theme: &Theme, width: usize) -> Line<'a> {
    let base = base_style(line.style, theme);
    let highlight = Style::default()
        .fg(theme.search_match_fg)
        .bg(theme.search_match_bg);

    let mut spans = Vec::new();
    push_highlighted_spans(&mut spans, &line.text, base, highlight, &line.highlights);

    // Selected rows paint the whole width
    if let LineStyle::Row { selected: true, .. } = line.style {
        let used = unicode::display_width(&line.text);
        if used < width {
            spans.push(Span::styled(" ".repeat(width - used), base));
        }
    }
    Line::from(spans)
}

/// Push spans for text with match highlighting. Ranges must be sorted,
/// non-overlapping, and on char boundaries.
pub(super) fn push_highlighted_spans<'a>(
    spans: &mut Vec<Span<'a>>,
    text: &'a str,
    base_style: Style,
    highlight_style: Style,
    ranges: &[Range<usize>],
) {
    let mut last_end = 0;
    for range in ranges {
        if range.start < last_end || range.end > text.len() {
            continue;
        }
        if range.start > last_end {
            spans.push(Span::styled(&text[last_end..range.start], base_style));
        }
        spans.push(Span::styled(&text[range.clone()], highlight_style));
        last_end = range.end;
    }
    if last_end < text.len() || spans.is_empty() {
        spans.push(Span::styled(&text[last_end..], base_style));
    }
}
