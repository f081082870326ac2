use crate::model::issue::{Issue, priority_label};

/// The follow-up prompt emitted when the user picks an issue to work on.
pub fn work_prompt(issue: &Issue) -> String {
    let mut out = format!(
        "Work on issue {}: {}\n\nStatus: {}\nPriority: {}",
        issue.id,
        issue.title,
        issue.status,
        priority_label(issue.priority)
    );
    if let Some(description) = issue.description.as_deref() {
        out.push_str("\n\nDescription:\n");
        out.push_str(description.trim_end());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::issue::Status;
    use insta::assert_snapshot;

    #[test]
    fn prompt_with_description() {
        let issue = Issue::new("x-1", "Fix bug", Status::InProgress)
            .with_priority(2)
            .with_description("Crashes when the list is empty.\nSee logs.\n");
        assert_snapshot!(work_prompt(&issue), @r"
        Work on issue x-1: Fix bug

        Status: in_progress
        Priority: P2

        Description:
        Crashes when the list is empty.
        See logs.
        ");
    }

    #[test]
    fn prompt_without_description_or_priority() {
        let issue = Issue::new("x-2", "Add docs", Status::Open);
        let prompt = work_prompt(&issue);
        assert!(prompt.ends_with("Priority: P?"));
        assert!(!prompt.contains("Description"));
    }
}
