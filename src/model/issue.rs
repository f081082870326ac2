use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest (least urgent) priority the tracker accepts
pub const MAX_PRIORITY: u8 = 4;

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Blocked,
    Deferred,
    Closed,
}

impl Status {
    /// The tracker's spelling of this status (also what filtering matches against)
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Blocked => "blocked",
            Status::Deferred => "deferred",
            Status::Closed => "closed",
        }
    }

    /// Single-cell glyph used in list rows
    pub fn symbol(self) -> char {
        match self {
            Status::Open => '○',
            Status::InProgress => '◐',
            Status::Blocked => '●',
            Status::Deferred => '◌',
            Status::Closed => '✓',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("priority {0} is outside 0-4")]
    PriorityOutOfRange(i64),
}

/// An issue as the tracker command emits it. Everything but `id` and `status`
/// is optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default, alias = "type")]
    pub issue_type: Option<String>,
    #[serde(default, alias = "assignee")]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dependency_count: u32,
    #[serde(default)]
    pub dependent_count: u32,
    #[serde(default)]
    pub comment_count: u32,
}

/// A validated issue held in the local session cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// `<prefix>-<token>`, unique across the tracker
    pub id: String,
    /// Never empty
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    /// 0 (most urgent) through 4; `None` when unset
    pub priority: Option<u8>,
    pub issue_type: Option<String>,
    pub owner: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub dependency_count: u32,
    pub dependent_count: u32,
    pub comment_count: u32,
}

impl Issue {
    /// Build a minimal issue (used by tests and by callers that patch fields later)
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: Status) -> Self {
        Issue {
            id: id.into(),
            title: title.into(),
            description: None,
            status,
            priority: None,
            issue_type: None,
            owner: None,
            created_at: None,
            updated_at: None,
            dependency_count: 0,
            dependent_count: 0,
            comment_count: 0,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description text, or "" when absent
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Validate a raw record into an `Issue`.
///
/// The title is trimmed and must be non-empty; a present priority must lie in
/// 0-4. Blank descriptions, types and owners collapse to `None`.
pub fn normalize(raw: RawIssue) -> Result<Issue, FieldError> {
    let title = raw.title.trim();
    if title.is_empty() {
        return Err(FieldError::EmptyTitle);
    }
    let priority = match raw.priority {
        None => None,
        Some(p) if (0..=i64::from(MAX_PRIORITY)).contains(&p) => Some(p as u8),
        Some(p) => return Err(FieldError::PriorityOutOfRange(p)),
    };
    Ok(Issue {
        id: raw.id,
        title: title.to_string(),
        description: non_blank(raw.description),
        status: raw.status,
        priority,
        issue_type: non_blank(raw.issue_type),
        owner: non_blank(raw.owner),
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        dependency_count: raw.dependency_count,
        dependent_count: raw.dependent_count,
        comment_count: raw.comment_count,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// The id with its slug prefix (everything up to and including the first `-`)
/// removed. Ids without a `-` are returned whole.
pub fn short_id(issue: &Issue) -> &str {
    match issue.id.split_once('-') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => &issue.id,
    }
}

/// Next status in the quick-toggle cycle open → in_progress → closed → open.
///
/// Statuses outside the cycle (blocked, deferred) go to open.
pub fn status_cycle(current: Status) -> Status {
    match current {
        Status::Open => Status::InProgress,
        Status::InProgress => Status::Closed,
        Status::Closed => Status::Open,
        Status::Blocked | Status::Deferred => Status::Open,
    }
}

/// Display token for a priority: `P0`..`P4`, or `P?` when unset.
pub fn priority_label(priority: Option<u8>) -> String {
    match priority {
        Some(p) => format!("P{}", p),
        None => "P?".to_string(),
    }
}
