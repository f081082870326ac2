use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::io::tracker::{FieldChange, FieldUpdate, ListQuery, Tracker, TrackerError};
use crate::model::issue::{Issue, status_cycle};
use crate::ops::filter;
use crate::ops::prompt::work_prompt;

use super::editor::EditSession;
use super::intent::{EditIntent, Intent, KeyContext, Keymap, normalize_key, resolve, resolve_edit};
use super::wrap;

/// Rows used by the header, separator, meta line and footer
const CHROME_ROWS: usize = 4;
/// Left indent of the description preview
pub const PREVIEW_INDENT: usize = 2;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Searching,
    Editing,
}

/// Where the session's records come from, and how to fetch them again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    List(ListQuery),
    Single(String),
}

impl Source {
    pub fn label(&self) -> String {
        match self {
            Source::List(query) => query.scope.as_str().to_string(),
            Source::Single(id) => id.clone(),
        }
    }
}

/// Fetch every record a source names
pub fn fetch(tracker: &dyn Tracker, source: &Source) -> Result<Vec<Issue>, TrackerError> {
    match source {
        Source::List(query) => tracker.list(query),
        Source::Single(id) => tracker.show(id).map(|issue| vec![issue]),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One-line message on the footer row, cleared by the next key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// A blocking remote call the event loop must run before taking more input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCall {
    Save {
        id: String,
        changes: Vec<FieldChange>,
    },
    Refresh,
}

impl PendingCall {
    pub fn label(&self) -> &'static str {
        match self {
            PendingCall::Save { .. } => "saving…",
            PendingCall::Refresh => "refreshing…",
        }
    }
}

/// How the session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExit {
    /// The user picked an issue; carries the follow-up prompt
    Work(String),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub keymap: Keymap,
    /// Preferred rows for the description preview
    pub preview_height: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            keymap: Keymap::default(),
            preview_height: 8,
        }
    }
}

/// Owner of the local record cache and everything the user is doing to it
#[derive(Debug)]
pub struct Session {
    records: Vec<Issue>,
    source: Source,
    mode: Mode,
    /// Committed filter term
    filter: String,
    /// Term being typed while searching
    search_input: String,
    /// Filter and selection to restore if a search is cancelled
    search_restore: Option<(String, Option<String>)>,
    selected_id: Option<String>,
    edit: Option<EditSession>,
    preview_scroll: usize,
    width: u16,
    height: u16,
    notice: Option<Notice>,
    pending: Option<PendingCall>,
    outbox: Vec<FieldUpdate>,
    /// Taken from the outbox but not yet confirmed
    in_flight: Vec<FieldUpdate>,
    exit: Option<SessionExit>,
    options: SessionOptions,
}

impl Session {
    pub fn new(records: Vec<Issue>, source: Source, options: SessionOptions) -> Self {
        let selected_id = records.first().map(|issue| issue.id.clone());
        Session {
            records,
            source,
            mode: Mode::Browsing,
            filter: String::new(),
            search_input: String::new(),
            search_restore: None,
            selected_id,
            edit: None,
            preview_scroll: 0,
            width: 80,
            height: 24,
            notice: None,
            pending: None,
            outbox: Vec::new(),
            in_flight: Vec::new(),
            exit: None,
            options,
        }
    }

    /// Start with a committed filter, as if it had been searched for
    pub fn with_filter(mut self, term: &str) -> Self {
        self.filter = term.to_string();
        self.reconcile_selection();
        self
    }

    // ── accessors ──────────────────────────────────────────────────

    pub fn records(&self) -> &[Issue] {
        &self.records
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// The term the visible set is currently computed from
    pub fn active_term(&self) -> &str {
        match self.mode {
            Mode::Searching => &self.search_input,
            _ => &self.filter,
        }
    }

    pub fn visible(&self) -> Vec<&Issue> {
        filter::filter(&self.records, self.active_term())
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Issue> {
        let id = self.selected_id.as_deref()?;
        self.records.iter().find(|issue| issue.id == id)
    }

    /// Index of the selection within the visible set
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected_id.as_deref()?;
        self.visible().iter().position(|issue| issue.id == id)
    }

    pub fn edit(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingCall> {
        self.pending.as_ref()
    }

    pub fn exit(&self) -> Option<&SessionExit> {
        self.exit.as_ref()
    }

    pub fn take_exit(&mut self) -> Option<SessionExit> {
        self.exit.take()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.options.keymap
    }

    pub fn preview_scroll(&self) -> usize {
        self.preview_scroll
    }

    pub fn writes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn viewport(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    // ── geometry ───────────────────────────────────────────────────

    /// Rows given to the description preview
    pub fn preview_rows(&self) -> usize {
        let avail = usize::from(self.height).saturating_sub(CHROME_ROWS);
        self.options.preview_height.min(avail / 2)
    }

    /// Rows given to the issue list
    pub fn list_rows(&self) -> usize {
        usize::from(self.height)
            .saturating_sub(CHROME_ROWS)
            .saturating_sub(self.preview_rows())
    }

    pub fn preview_width(&self) -> usize {
        usize::from(self.width).saturating_sub(PREVIEW_INDENT).max(1)
    }

    /// The selected record's description, wrapped to the preview width
    pub fn preview_lines(&self) -> Vec<String> {
        match self.selected().and_then(|issue| issue.description.as_deref()) {
            Some(text) => wrap::wrap(text, self.preview_width()),
            None => Vec::new(),
        }
    }

    /// Exactly `preview_rows()` lines of the wrapped description
    pub fn preview_window(&self) -> Vec<String> {
        wrap::window(&self.preview_lines(), self.preview_scroll, self.preview_rows())
    }

    fn max_preview_scroll(&self) -> usize {
        wrap::max_scroll(self.preview_lines().len(), self.preview_rows())
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.preview_scroll = self.preview_scroll.min(self.max_preview_scroll());
    }

    // ── input ──────────────────────────────────────────────────────

    /// Feed one key press. Ignored while a blocking call is pending or after exit.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.pending.is_some() || self.exit.is_some() {
            return;
        }
        self.notice = None;
        let key = normalize_key(key);

        if self.mode == Mode::Editing {
            self.handle_edit_key(&key);
            return;
        }

        let ctx = KeyContext {
            keymap: &self.options.keymap,
            searching: self.mode == Mode::Searching,
        };
        let intent = resolve(&key, &ctx);
        debug!(?intent, mode = ?self.mode, "key resolved");
        self.dispatch(intent, &key);
    }

    /// Bracketed paste: goes to the focused field or the search buffer
    pub fn paste(&mut self, text: &str) {
        if self.pending.is_some() {
            return;
        }
        match self.mode {
            Mode::Editing => {
                if let Some(edit) = &mut self.edit {
                    edit.focused_mut().insert_str(text);
                }
            }
            Mode::Searching => {
                self.search_input
                    .extend(text.chars().filter(|c| (' '..='~').contains(c)));
                self.reconcile_selection();
            }
            Mode::Browsing => {}
        }
    }

    pub fn dispatch(&mut self, intent: Intent, key: &KeyEvent) {
        match intent {
            Intent::Cancel => self.cancel(),
            Intent::StartSearch => self.start_search(),
            Intent::AppendSearchChar(c) => {
                self.search_input.push(c);
                self.reconcile_selection();
            }
            Intent::DeleteSearchChar => {
                self.search_input.pop();
                self.reconcile_selection();
            }
            Intent::ApplySearch => self.apply_search(),
            Intent::MoveSelection(delta) => self.move_selection(delta),
            Intent::Work => {
                if let Some(issue) = self.selected() {
                    info!(id = %issue.id, "work on issue");
                    self.exit = Some(SessionExit::Work(work_prompt(issue)));
                }
            }
            Intent::Edit => self.start_edit(),
            Intent::ToggleStatus => {
                if let Some(issue) = self.selected() {
                    let next = status_cycle(issue.status);
                    self.write_optimistic(FieldChange::Status(next));
                }
            }
            Intent::SetPriority(p) => self.write_optimistic(FieldChange::Priority(p)),
            Intent::ScrollDescription(delta) => self.scroll_description(delta),
            Intent::Refresh => self.pending = Some(PendingCall::Refresh),
            Intent::Delegate => self.navigate(key),
        }
    }

    fn cancel(&mut self) {
        match self.mode {
            Mode::Searching => {
                let (filter, selection) = self.search_restore.take().unwrap_or_default();
                self.filter = filter;
                self.search_input.clear();
                self.mode = Mode::Browsing;
                if let Some(id) = selection {
                    self.select(Some(id));
                }
                self.reconcile_selection();
                debug!("search cancelled");
            }
            Mode::Browsing if !self.filter.is_empty() => {
                self.filter.clear();
                self.reconcile_selection();
                debug!("filter cleared");
            }
            _ => self.exit = Some(SessionExit::Cancelled),
        }
    }

    fn start_search(&mut self) {
        self.search_restore = Some((self.filter.clone(), self.selected_id.clone()));
        self.search_input = self.filter.clone();
        self.mode = Mode::Searching;
        debug!("search started");
    }

    fn apply_search(&mut self) {
        self.filter = std::mem::take(&mut self.search_input);
        self.search_restore = None;
        self.mode = Mode::Browsing;
        debug!(filter = %self.filter, "search applied");
        self.reconcile_selection();
    }

    /// Wrapping move within the visible set
    fn move_selection(&mut self, delta: i32) {
        let visible = self.visible();
        if visible.is_empty() {
            return;
        }
        let len = visible.len() as i64;
        let current = self.selected_index().unwrap_or(0) as i64;
        let next = (current + i64::from(delta)).rem_euclid(len) as usize;
        let id = visible[next].id.clone();
        self.select(Some(id));
    }

    /// Clamped move, for paging and Home/End
    fn jump_selection(&mut self, delta: i64) {
        let visible = self.visible();
        if visible.is_empty() {
            return;
        }
        let last = visible.len() as i64 - 1;
        let current = self.selected_index().unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, last) as usize;
        let id = visible[next].id.clone();
        self.select(Some(id));
    }

    /// Keys no intent claimed: list navigation, plus ctrl+c to quit
    fn navigate(&mut self, key: &KeyEvent) {
        let page = self.list_rows().max(1) as i64;
        match (key.code, key.modifiers.contains(KeyModifiers::CONTROL)) {
            (KeyCode::Char('c'), true) => self.exit = Some(SessionExit::Cancelled),
            (KeyCode::Up, _) => self.move_selection(-1),
            (KeyCode::Down, _) => self.move_selection(1),
            (KeyCode::Home, _) => self.jump_selection(i64::MIN / 2),
            (KeyCode::End, _) => self.jump_selection(i64::MAX / 2),
            (KeyCode::PageUp, _) => self.jump_selection(-page),
            (KeyCode::PageDown, _) => self.jump_selection(page),
            _ => {}
        }
    }

    fn scroll_description(&mut self, delta: i32) {
        let max = self.max_preview_scroll() as i64;
        let next = (self.preview_scroll as i64 + i64::from(delta)).clamp(0, max);
        self.preview_scroll = next as usize;
    }

    /// Change the selection; a different record starts its preview at the top
    fn select(&mut self, id: Option<String>) {
        if self.selected_id != id {
            self.selected_id = id;
            self.preview_scroll = 0;
        }
    }

    /// Keep the selection inside the visible set.
    ///
    /// A committed filter that matches nothing is dropped with a notice rather
    /// than leaving an empty list on screen.
    fn reconcile_selection(&mut self) {
        if self.mode != Mode::Searching
            && !self.filter.is_empty()
            && !self.records.is_empty()
            && self.visible().is_empty()
        {
            info!(filter = %self.filter, "filter matched nothing, clearing it");
            self.notice = Some(Notice {
                level: NoticeLevel::Info,
                text: format!("no matches for \"{}\"", self.filter),
            });
            self.filter.clear();
        }

        let visible = self.visible();
        let keep = self
            .selected_id
            .as_deref()
            .is_some_and(|id| visible.iter().any(|issue| issue.id == id));
        if !keep {
            let first = visible.first().map(|issue| issue.id.clone());
            self.select(first);
        }
    }

    // ── optimistic writes ──────────────────────────────────────────

    /// Patch the selected record now and queue the remote write
    fn write_optimistic(&mut self, change: FieldChange) {
        let Some(id) = self.selected_id.clone() else {
            return;
        };
        let Some(issue) = self.records.iter_mut().find(|issue| issue.id == id) else {
            return;
        };
        change.apply(issue);
        let update = FieldUpdate::new(id, change);
        info!(%update, "optimistic update");
        self.outbox.push(update);
        self.reconcile_selection();
    }

    /// Hand queued writes to whoever runs them
    pub fn take_outbox(&mut self) -> Vec<FieldUpdate> {
        let updates = std::mem::take(&mut self.outbox);
        self.in_flight.extend(updates.iter().cloned());
        updates
    }

    /// A queued write finished. Failures are reported; the local patch stays.
    pub fn write_finished(&mut self, update: &FieldUpdate, result: Result<(), TrackerError>) {
        if let Some(pos) = self.in_flight.iter().position(|u| u == update) {
            self.in_flight.remove(pos);
        }
        match result {
            Ok(()) => debug!(%update, "update confirmed"),
            Err(e) => {
                warn!(%update, error = %e, "update failed");
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text: format!("update failed: {}: {}", update, e),
                });
            }
        }
    }

    // ── editing ────────────────────────────────────────────────────

    fn start_edit(&mut self) {
        if let Some(issue) = self.selected() {
            debug!(id = %issue.id, "edit started");
            self.edit = Some(EditSession::open(issue));
            self.mode = Mode::Editing;
        }
    }

    fn handle_edit_key(&mut self, key: &KeyEvent) {
        let Some(edit) = &mut self.edit else {
            self.mode = Mode::Browsing;
            return;
        };
        match resolve_edit(key, edit.focus, &self.options.keymap) {
            EditIntent::Cancel => {
                edit.revert_all();
                debug!(id = %edit.issue_id, "edit cancelled");
                self.close_edit();
            }
            EditIntent::Submit => self.submit_edit(),
            EditIntent::Quit => self.exit = Some(SessionExit::Cancelled),
            EditIntent::SwitchField => edit.switch_focus(),
            EditIntent::InsertNewline => {
                edit.focused_mut().insert_newline();
            }
            EditIntent::Insert(c) => edit.focused_mut().insert_char(c),
            EditIntent::DeleteBackward => edit.focused_mut().delete_backward(),
            EditIntent::MoveHorizontal(d) => edit.focused_mut().move_horizontal(d),
            EditIntent::MoveVertical(d) => edit.focused_mut().move_vertical(d),
            EditIntent::LineStart => edit.focused_mut().move_line_start(),
            EditIntent::LineEnd => edit.focused_mut().move_line_end(),
            EditIntent::Ignore => {}
        }
    }

    fn close_edit(&mut self) {
        self.edit = None;
        self.mode = Mode::Browsing;
    }

    fn submit_edit(&mut self) {
        let Some(edit) = &self.edit else {
            return;
        };
        match edit.changes() {
            Err(e) => {
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text: e.to_string(),
                });
            }
            Ok(changes) if changes.is_empty() => {
                self.notice = Some(Notice {
                    level: NoticeLevel::Info,
                    text: "no changes".to_string(),
                });
                self.close_edit();
            }
            Ok(changes) => {
                self.pending = Some(PendingCall::Save {
                    id: edit.issue_id.clone(),
                    changes,
                });
            }
        }
    }

    // ── blocking calls ─────────────────────────────────────────────

    /// Run the queued blocking call, if any, to completion
    pub fn run_pending(&mut self, tracker: &dyn Tracker) {
        match self.pending.take() {
            Some(PendingCall::Save { id, changes }) => self.run_save(tracker, &id, changes),
            Some(PendingCall::Refresh) => self.run_refresh(tracker),
            None => {}
        }
    }

    fn run_save(&mut self, tracker: &dyn Tracker, id: &str, changes: Vec<FieldChange>) {
        let mut written = Vec::new();
        for change in changes {
            let update = FieldUpdate::new(id, change);
            if let Err(e) = tracker.update(&update) {
                warn!(%update, error = %e, "save failed");
                self.patch_record(id, &written);
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text: format!("update failed: {}: {}", update, e),
                });
                return;
            }
            written.push(update.change);
        }

        match tracker.show(id) {
            Ok(fresh) => {
                if let Some(slot) = self.records.iter_mut().find(|issue| issue.id == id) {
                    *slot = fresh;
                }
                self.reapply_unconfirmed();
                info!(id, fields = written.len(), "saved");
                self.inform(format!("saved {}", id));
            }
            Err(e) => {
                warn!(id, error = %e, "saved, but re-fetch failed");
                self.patch_record(id, &written);
                self.notice = Some(Notice {
                    level: NoticeLevel::Warning,
                    text: format!("saved, but fetch failed: {}", e),
                });
            }
        }
        self.close_edit();
        self.reconcile_selection();
    }

    /// Info notice that never hides a write failure reported just before
    fn inform(&mut self, text: String) {
        if self.notice.is_none() {
            self.notice = Some(Notice {
                level: NoticeLevel::Info,
                text,
            });
        }
    }

    /// Lay writes the store may not have seen yet over freshly fetched records
    fn reapply_unconfirmed(&mut self) {
        for update in self.in_flight.iter().chain(&self.outbox) {
            if let Some(issue) = self.records.iter_mut().find(|issue| issue.id == update.id) {
                debug!(%update, "reapplying unconfirmed write");
                update.change.apply(issue);
            }
        }
    }

    fn patch_record(&mut self, id: &str, changes: &[FieldChange]) {
        if let Some(issue) = self.records.iter_mut().find(|issue| issue.id == id) {
            for change in changes {
                change.apply(issue);
            }
        }
    }

    fn run_refresh(&mut self, tracker: &dyn Tracker) {
        match fetch(tracker, &self.source) {
            Ok(records) => {
                info!(count = records.len(), source = %self.source.label(), "refreshed");
                self.inform(format!("{} issues", records.len()));
                self.records = records;
                self.reapply_unconfirmed();
                self.reconcile_selection();
                self.preview_scroll = self.preview_scroll.min(self.max_preview_scroll());
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                let text = if e.is_not_found() {
                    e.to_string()
                } else {
                    format!("fetch failed: {}", e)
                };
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text,
                });
            }
        }
    }
}
