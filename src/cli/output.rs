use serde::Serialize;

use crate::model::issue::Issue;
use crate::tui::session::Session;
use crate::tui::view;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter: String,
    pub total: usize,
    pub issues: Vec<&'a Issue>,
}

/// The visible issues of a session as pretty JSON
pub fn list_json(session: &Session) -> Result<String, serde_json::Error> {
    let out = ListJson {
        source: session.source().label(),
        filter: session.filter().to_string(),
        total: session.records().len(),
        issues: session.visible(),
    };
    serde_json::to_string_pretty(&out)
}

/// The browse list as plain text, one line per row
pub fn list_plain(session: &Session, width: u16) -> String {
    view::list_text(session, usize::from(width)).join("\n")
}
