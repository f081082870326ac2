//! Pure projection of session state into plain display lines.
//!
//! Nothing here touches the terminal. Each line carries a style role and the
//! byte ranges to highlight; `tui::render` maps those onto theme colors.

use std::ops::Range;

use crate::model::issue::{Issue, Status, priority_label, short_id};
use crate::ops::filter::{match_spans, term_regex};
use crate::util::unicode::{display_width, skip_display_cols, truncate_to_width};

use super::editor::{EditField, EditSession, FieldEditor, line_end, line_start};
use super::session::{Mode, NoticeLevel, PREVIEW_INDENT, Session};

/// What a line is, for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Header,
    Row { status: Status, selected: bool },
    Separator,
    Meta,
    Preview,
    Label { focused: bool },
    Field,
    Hint,
    Search,
    Busy,
    Notice(NoticeLevel),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub text: String,
    pub style: LineStyle,
    /// Byte ranges of `text` to draw as search matches
    pub highlights: Vec<Range<usize>>,
}

impl DisplayLine {
    fn new(text: impl Into<String>, style: LineStyle) -> Self {
        DisplayLine {
            text: text.into(),
            style,
            highlights: Vec::new(),
        }
    }

    fn blank() -> Self {
        DisplayLine::new("", LineStyle::Blank)
    }
}

/// A full frame: one entry per terminal row, plus where the cursor goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub lines: Vec<DisplayLine>,
    /// `(column, row)` of the text cursor, when a text field has focus
    pub cursor: Option<(u16, u16)>,
}

impl Screen {
    /// Line texts only, for tests and print mode
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Project the session at its current viewport size
pub fn render(session: &Session) -> Screen {
    let (width, height) = session.viewport();
    let width = usize::from(width);
    let height = usize::from(height);

    let (mut lines, cursor) = match (session.mode(), session.edit()) {
        (Mode::Editing, Some(edit)) => edit_lines(session, edit, width, height),
        _ => browse_lines(session, width),
    };
    lines.truncate(height);
    let cursor = cursor.filter(|&(_, row)| usize::from(row) < lines.len());
    Screen { lines, cursor }
}

fn browse_lines(session: &Session, width: usize) -> (Vec<DisplayLine>, Option<(u16, u16)>) {
    let visible = session.visible();
    let mut lines = Vec::new();

    lines.push(DisplayLine::new(
        truncate_to_width(&header_text(session, visible.len()), width),
        LineStyle::Header,
    ));

    let list_rows = session.list_rows();
    let selected = session.selected_index();
    let offset = match selected {
        Some(sel) if list_rows > 0 => sel.saturating_sub(list_rows - 1),
        _ => 0,
    };
    let id_width = visible
        .iter()
        .map(|issue| display_width(short_id(issue)))
        .max()
        .unwrap_or(0);
    let re = term_regex(session.active_term());
    for row in 0..list_rows {
        let idx = offset + row;
        match visible.get(idx) {
            Some(issue) => {
                let text = truncate_to_width(&row_text(issue, id_width, selected == Some(idx)), width);
                let highlights = re.as_ref().map_or_else(Vec::new, |re| match_spans(re, &text));
                lines.push(DisplayLine {
                    text,
                    style: LineStyle::Row {
                        status: issue.status,
                        selected: selected == Some(idx),
                    },
                    highlights,
                });
            }
            None if idx == 0 => lines.push(DisplayLine::new(
                truncate_to_width("  no issues", width),
                LineStyle::Hint,
            )),
            None => lines.push(DisplayLine::blank()),
        }
    }

    lines.push(DisplayLine::new("─".repeat(width), LineStyle::Separator));
    let meta = match session.selected() {
        Some(issue) => meta_text(issue),
        None => String::new(),
    };
    lines.push(DisplayLine::new(truncate_to_width(&meta, width), LineStyle::Meta));

    let indent = " ".repeat(PREVIEW_INDENT);
    for line in session.preview_window() {
        let text = if line.is_empty() {
            String::new()
        } else {
            truncate_to_width(&format!("{}{}", indent, line), width)
        };
        lines.push(DisplayLine::new(text, LineStyle::Preview));
    }

    let (footer, cursor_col) = footer_line(session, width, browse_hints(session));
    let cursor = cursor_col.map(|col| (col, lines.len() as u16));
    lines.push(footer);
    (lines, cursor)
}

fn header_text(session: &Session, shown: usize) -> String {
    let mut text = format!(
        "{} · {}/{} issues",
        session.source().label(),
        shown,
        session.records().len()
    );
    if !session.filter().is_empty() && session.mode() != Mode::Searching {
        text.push_str(&format!(" · filter: {}", session.filter()));
    }
    match session.writes_in_flight() {
        0 => {}
        1 => text.push_str(" · 1 write pending"),
        n => text.push_str(&format!(" · {} writes pending", n)),
    }
    text
}

/// `▸ ○ P2 a1b2  Title`
fn row_text(issue: &Issue, id_width: usize, selected: bool) -> String {
    let marker = if selected { '▸' } else { ' ' };
    let id = short_id(issue);
    let pad = id_width.saturating_sub(display_width(id));
    format!(
        "{} {} {} {}{}  {}",
        marker,
        issue.status.symbol(),
        priority_label(issue.priority),
        id,
        " ".repeat(pad),
        issue.title
    )
}

fn meta_text(issue: &Issue) -> String {
    let mut parts = vec![
        issue.id.clone(),
        issue.status.to_string(),
        priority_label(issue.priority),
    ];
    if let Some(kind) = &issue.issue_type {
        parts.push(kind.clone());
    }
    if let Some(owner) = &issue.owner {
        parts.push(format!("@{}", owner));
    }
    if issue.dependency_count > 0 {
        parts.push(format!("{} deps", issue.dependency_count));
    }
    if issue.dependent_count > 0 {
        parts.push(format!("{} dependents", issue.dependent_count));
    }
    if issue.comment_count > 0 {
        parts.push(format!("{} comments", issue.comment_count));
    }
    parts.join(" · ")
}

fn browse_hints(session: &Session) -> String {
    let keys = session.keymap();
    let mut hints = vec![
        "enter work".to_string(),
        format!("{} edit", keys.edit.label()),
        "space status".to_string(),
    ];
    if keys.priority_hotkeys {
        hints.push("0-4 priority".to_string());
    }
    if keys.search {
        hints.push(format!("{} search", keys.start_search.label()));
    }
    hints.push(format!("{}/{} scroll", keys.scroll_down, keys.scroll_up));
    hints.push("r refresh".to_string());
    let cancel = if session.filter().is_empty() {
        "quit"
    } else {
        "clear filter"
    };
    hints.push(format!("{} {}", keys.cancel.label(), cancel));
    hints.join(" · ")
}

/// Footer row, by precedence: pending call, search prompt, notice, hints.
/// Returns the cursor column when the search prompt has focus.
fn footer_line(session: &Session, width: usize, hints: String) -> (DisplayLine, Option<u16>) {
    if let Some(pending) = session.pending() {
        let text = truncate_to_width(&format!("⋯ {}", pending.label()), width);
        return (DisplayLine::new(text, LineStyle::Busy), None);
    }
    if session.mode() == Mode::Searching {
        let prompt = format!("/{}", session.search_input());
        let (text, col) = scroll_to_cursor(&prompt, prompt.len(), width);
        return (DisplayLine::new(text, LineStyle::Search), Some(col as u16));
    }
    if let Some(notice) = session.notice() {
        let text = truncate_to_width(&notice.text, width);
        return (DisplayLine::new(text, LineStyle::Notice(notice.level)), None);
    }
    (
        DisplayLine::new(truncate_to_width(&hints, width), LineStyle::Hint),
        None,
    )
}

/// Slice a line so the cursor (a byte offset into it) stays on screen.
/// Returns the visible text and the cursor's display column within it.
fn scroll_to_cursor(line: &str, cursor: usize, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }
    let before = display_width(&line[..cursor]);
    let skip = before.saturating_sub(width - 1);
    let shown = skip_display_cols(line, skip);
    let start = line.len() - shown.len();
    let col = display_width(&line[start..cursor]);
    (truncate_to_width(shown, width), col)
}

/// Rows: header, title label, title, blank, description label, description..., footer
fn edit_lines(
    session: &Session,
    edit: &EditSession,
    width: usize,
    height: usize,
) -> (Vec<DisplayLine>, Option<(u16, u16)>) {
    let field_width = width.saturating_sub(PREVIEW_INDENT);
    let indent = " ".repeat(PREVIEW_INDENT);
    let mut lines = Vec::new();
    let mut cursor = None;

    lines.push(DisplayLine::new(
        truncate_to_width(&format!("editing {}", edit.issue_id), width),
        LineStyle::Header,
    ));

    let title_focused = edit.focus == EditField::Title;
    lines.push(DisplayLine::new("Title", LineStyle::Label { focused: title_focused }));
    let (text, col) = field_row(&edit.title, None, field_width, title_focused);
    if let Some(col) = col {
        cursor = Some(((PREVIEW_INDENT + col) as u16, lines.len() as u16));
    }
    lines.push(DisplayLine::new(format!("{}{}", indent, text), LineStyle::Field));
    lines.push(DisplayLine::blank());

    let desc_focused = edit.focus == EditField::Description;
    lines.push(DisplayLine::new(
        "Description",
        LineStyle::Label {
            focused: desc_focused,
        },
    ));

    let rows = height.saturating_sub(lines.len() + 1);
    let buffer = edit.description.buffer();
    let line_count = buffer.split('\n').count();
    let cursor_line = buffer[..edit.description.cursor()].matches('\n').count();
    let offset = if rows == 0 {
        0
    } else {
        cursor_line.saturating_sub(rows - 1)
    };
    for row in 0..rows {
        let idx = offset + row;
        if idx >= line_count {
            lines.push(DisplayLine::blank());
            continue;
        }
        let (text, col) = field_row(&edit.description, Some(idx), field_width, desc_focused);
        if let Some(col) = col {
            cursor = Some(((PREVIEW_INDENT + col) as u16, lines.len() as u16));
        }
        lines.push(DisplayLine::new(format!("{}{}", indent, text), LineStyle::Field));
    }

    let hints = format!(
        "tab switch field · {} · ctrl+s save · {} cancel",
        if title_focused {
            "enter save"
        } else {
            "enter newline"
        },
        session.keymap().cancel.label()
    );
    lines.push(footer_line(session, width, hints).0);
    (lines, cursor)
}

/// One logical line of a field, scrolled to the cursor if the cursor is on it
fn field_row(
    field: &FieldEditor,
    line_idx: Option<usize>,
    width: usize,
    focused: bool,
) -> (String, Option<usize>) {
    let buffer = field.buffer();
    let start = match line_idx {
        Some(idx) => buffer
            .split('\n')
            .take(idx)
            .map(|l| l.len() + 1)
            .sum::<usize>(),
        None => 0,
    };
    let end = line_end(buffer, start);
    let line = &buffer[start..end];
    let cursor = field.cursor();
    let on_line = focused && line_start(buffer, cursor) == start;
    if on_line {
        let (text, col) = scroll_to_cursor(line, cursor - start, width);
        (text, Some(col))
    } else {
        (truncate_to_width(line, width), None)
    }
}

/// Header plus every visible row, unpaged. Used by print mode.
pub fn list_text(session: &Session, width: usize) -> Vec<String> {
    let visible = session.visible();
    let id_width = visible
        .iter()
        .map(|issue| display_width(short_id(issue)))
        .max()
        .unwrap_or(0);
    let mut out = vec![truncate_to_width(&header_text(session, visible.len()), width)];
    for issue in visible {
        let row = row_text(issue, id_width, false);
        out.push(truncate_to_width(row.trim_start(), width));
    }
    out
}
