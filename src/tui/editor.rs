//! Cursor-accurate text editing over a flat buffer with embedded `\n`.
//!
//! The free functions are pure transformations of `(buffer, cursor)` where
//! `cursor` is a byte offset. Every function clamps the incoming cursor to
//! `0..=buffer.len()` (snapped down to a char boundary) before using it, so
//! the returned cursor is always valid for the returned buffer. Columns are
//! counted in grapheme clusters.

use crate::io::tracker::FieldChange;
use crate::model::issue::{FieldError, Issue};
use crate::util::unicode::{
    byte_offset_of_grapheme, floor_char_boundary, grapheme_count, next_grapheme_boundary,
    prev_grapheme_boundary,
};

/// Clamp a cursor into the buffer, on a char boundary
pub fn clamp_cursor(buffer: &str, cursor: usize) -> usize {
    floor_char_boundary(buffer, cursor)
}

/// Splice `text` in at `cursor`; the cursor lands after it.
pub fn insert(buffer: &str, cursor: usize, text: &str) -> (String, usize) {
    let cursor = clamp_cursor(buffer, cursor);
    let mut out = String::with_capacity(buffer.len() + text.len());
    out.push_str(&buffer[..cursor]);
    out.push_str(text);
    out.push_str(&buffer[cursor..]);
    (out, cursor + text.len())
}

/// Remove the grapheme before `cursor`. No-op at the start of the buffer.
pub fn delete_backward(buffer: &str, cursor: usize) -> (String, usize) {
    let cursor = clamp_cursor(buffer, cursor);
    match prev_grapheme_boundary(buffer, cursor) {
        Some(prev) => {
            let mut out = String::with_capacity(buffer.len());
            out.push_str(&buffer[..prev]);
            out.push_str(&buffer[cursor..]);
            (out, prev)
        }
        None => (buffer.to_string(), cursor),
    }
}

/// Move `delta` graphemes left (negative) or right, stopping at either end.
pub fn move_horizontal(buffer: &str, cursor: usize, delta: i32) -> usize {
    let mut cursor = clamp_cursor(buffer, cursor);
    for _ in 0..delta.unsigned_abs() {
        let next = if delta < 0 {
            prev_grapheme_boundary(buffer, cursor)
        } else {
            next_grapheme_boundary(buffer, cursor)
        };
        match next {
            Some(n) => cursor = n,
            None => break,
        }
    }
    cursor
}

/// Move `delta` lines up (negative) or down, keeping the column.
///
/// The column is the cursor's grapheme offset within its line; on the target
/// line it is clamped to that line's own length. Moving past the first or
/// last line leaves the cursor where it is.
pub fn move_vertical(buffer: &str, cursor: usize, delta: i32) -> usize {
    let mut cursor = clamp_cursor(buffer, cursor);
    for _ in 0..delta.unsigned_abs() {
        let start = line_start(buffer, cursor);
        let column = grapheme_count(&buffer[start..cursor]);
        if delta < 0 {
            if start == 0 {
                break;
            }
            // `start - 1` is the '\n' ending the previous line
            let prev_end = start - 1;
            let prev_start = line_start(buffer, prev_end);
            cursor = prev_start + byte_offset_of_grapheme(&buffer[prev_start..prev_end], column);
        } else {
            let end = line_end(buffer, cursor);
            if end == buffer.len() {
                break;
            }
            let next_start = end + 1;
            let next_end = line_end(buffer, next_start);
            cursor = next_start + byte_offset_of_grapheme(&buffer[next_start..next_end], column);
        }
    }
    cursor
}

/// Offset of the first byte of the line containing `cursor`
pub fn line_start(buffer: &str, cursor: usize) -> usize {
    let cursor = clamp_cursor(buffer, cursor);
    buffer[..cursor].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset of the `\n` ending the line containing `cursor`, or the buffer end
pub fn line_end(buffer: &str, cursor: usize) -> usize {
    let cursor = clamp_cursor(buffer, cursor);
    buffer[cursor..].find('\n').map_or(buffer.len(), |i| cursor + i)
}

/// `(line, column)` of a cursor, both zero-based; column in graphemes
pub fn line_and_column(buffer: &str, cursor: usize) -> (usize, usize) {
    let cursor = clamp_cursor(buffer, cursor);
    let start = line_start(buffer, cursor);
    let line = buffer[..start].matches('\n').count();
    (line, grapheme_count(&buffer[start..cursor]))
}

/// An editable copy of one field, remembering where it started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEditor {
    buffer: String,
    cursor: usize,
    original: String,
    original_cursor: usize,
    multiline: bool,
}

impl FieldEditor {
    /// Single-line field; any line breaks in `value` become spaces
    pub fn single_line(value: &str) -> Self {
        Self::new(flatten_line_breaks(value), false)
    }

    /// Multi-line field
    pub fn multi_line(value: &str) -> Self {
        Self::new(value.to_string(), true)
    }

    fn new(value: String, multiline: bool) -> Self {
        let cursor = value.len();
        FieldEditor {
            original: value.clone(),
            buffer: value,
            cursor,
            original_cursor: cursor,
            multiline,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert text at the cursor. Single-line fields get line breaks as spaces.
    pub fn insert_str(&mut self, text: &str) {
        let text = if self.multiline {
            text.replace("\r\n", "\n")
        } else {
            flatten_line_breaks(text)
        };
        let (buffer, cursor) = insert(&self.buffer, self.cursor, &text);
        self.buffer = buffer;
        self.cursor = cursor;
    }

    pub fn insert_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut tmp));
    }

    /// Split the line at the cursor. Returns false (and does nothing) for
    /// single-line fields.
    pub fn insert_newline(&mut self) -> bool {
        if !self.multiline {
            return false;
        }
        let (buffer, cursor) = insert(&self.buffer, self.cursor, "\n");
        self.buffer = buffer;
        self.cursor = cursor;
        true
    }

    pub fn delete_backward(&mut self) {
        let (buffer, cursor) = delete_backward(&self.buffer, self.cursor);
        self.buffer = buffer;
        self.cursor = cursor;
    }

    pub fn move_horizontal(&mut self, delta: i32) {
        self.cursor = move_horizontal(&self.buffer, self.cursor, delta);
    }

    pub fn move_vertical(&mut self, delta: i32) {
        self.cursor = move_vertical(&self.buffer, self.cursor, delta);
    }

    pub fn move_line_start(&mut self) {
        self.cursor = line_start(&self.buffer, self.cursor);
    }

    pub fn move_line_end(&mut self) {
        self.cursor = line_end(&self.buffer, self.cursor);
    }

    /// The value to write back, or `None` if it matches the original.
    /// Single-line values are compared and returned trimmed.
    pub fn committed_value(&self) -> Option<String> {
        if self.multiline {
            (self.buffer != self.original).then(|| self.buffer.clone())
        } else {
            let value = self.buffer.trim();
            (value != self.original.trim()).then(|| value.to_string())
        }
    }

    /// Throw away edits: original buffer and cursor come back.
    pub fn revert(&mut self) {
        self.buffer = self.original.clone();
        self.cursor = self.original_cursor;
    }
}

fn flatten_line_breaks(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Which field has keyboard focus while editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Description,
}

/// Title and description editors for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub issue_id: String,
    pub title: FieldEditor,
    pub description: FieldEditor,
    pub focus: EditField,
}

impl EditSession {
    pub fn open(issue: &Issue) -> Self {
        EditSession {
            issue_id: issue.id.clone(),
            title: FieldEditor::single_line(&issue.title),
            description: FieldEditor::multi_line(issue.description_text()),
            focus: EditField::Title,
        }
    }

    pub fn focused_mut(&mut self) -> &mut FieldEditor {
        match self.focus {
            EditField::Title => &mut self.title,
            EditField::Description => &mut self.description,
        }
    }

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            EditField::Title => EditField::Description,
            EditField::Description => EditField::Title,
        };
    }

    /// Field writes needed to save, only for fields that changed.
    /// An empty title is rejected.
    pub fn changes(&self) -> Result<Vec<FieldChange>, FieldError> {
        if self.title.buffer().trim().is_empty() {
            return Err(FieldError::EmptyTitle);
        }
        let mut changes = Vec::new();
        if let Some(title) = self.title.committed_value() {
            changes.push(FieldChange::Title(title));
        }
        if let Some(description) = self.description.committed_value() {
            changes.push(FieldChange::Description(description));
        }
        Ok(changes)
    }

    pub fn revert_all(&mut self) {
        self.title.revert();
        self.description.revert();
    }
}
