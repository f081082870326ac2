use std::ops::Range;

use regex::Regex;

use crate::model::issue::Issue;

/// Case-insensitive substring match against title, description, id and
/// status, in that order. An empty term matches everything.
pub fn matches(issue: &Issue, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

    contains(&issue.title)
        || issue.description.as_deref().is_some_and(contains)
        || contains(&issue.id)
        || contains(issue.status.as_str())
}

/// Stable filter: keeps input order, never re-sorts.
pub fn filter<'a>(records: &'a [Issue], term: &str) -> Vec<&'a Issue> {
    records.iter().filter(|issue| matches(issue, term)).collect()
}

/// Case-insensitive regex for a literal term, used for highlighting.
pub fn term_regex(term: &str) -> Option<Regex> {
    if term.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", regex::escape(term))).ok()
}

/// Byte ranges of every non-overlapping occurrence of `re` in `text`.
pub fn match_spans(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}
