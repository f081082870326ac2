use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::tracker::{BdTracker, ListQuery, TrackerError};
use crate::logging;
use crate::model::config::Config;
use crate::tui::intent::Keymap;
use crate::tui::session::{self, Session, SessionExit, SessionOptions, Source};
use crate::tui::theme::Theme;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let log_file = cli.log_file.clone().unwrap_or_else(config_io::log_path);
    logging::init_logging(&log_file, cli.verbose);

    let mut config = config_io::load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    let keymap = Keymap::from_config(&config.keys).map_err(ConfigError::from)?;

    let workdir = match &cli.project_dir {
        Some(dir) => Some(
            std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        ),
        None => None,
    };
    let tracker = tracker_from_config(&config, workdir);
    let source = source_for(Target::parse(cli.target.as_deref()), &config);
    info!(source = %source.label(), program = %config.tracker.command, "starting");

    let records = session::fetch(&tracker, &source).map_err(startup_error)?;
    if records.is_empty() && !cli.print {
        println!("No issues in {}.", source.label());
        return Ok(());
    }

    let options = SessionOptions {
        keymap,
        preview_height: config.ui.preview_height,
    };
    let mut session = Session::new(records, source, options);
    if let Some(term) = cli.filter.as_deref() {
        session = session.with_filter(term);
    }

    if cli.print {
        return cmd_print(&session, cli.width, cli.json);
    }

    let theme = Theme::from_config(&config.ui);
    let outcome = crate::tui::run(session, tracker, theme)?;
    for failure in &outcome.late_failures {
        eprintln!("warning: {}", failure);
    }
    if let SessionExit::Work(prompt) = outcome.exit {
        println!("{}", prompt);
    }
    Ok(())
}

/// Command-line flags win over config.toml
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(bd) = &cli.bd {
        config.tracker.command = bd.clone();
    }
    if let Some(limit) = cli.limit {
        config.tracker.limit = limit;
    }
    if let Some(sort) = &cli.sort {
        config.tracker.sort = sort.clone();
    }
    if cli.no_priority_keys {
        config.keys.priority_hotkeys = false;
    }
    if cli.no_search {
        config.keys.search = false;
    }
}

fn tracker_from_config(config: &Config, workdir: Option<PathBuf>) -> BdTracker {
    BdTracker::new(
        config.tracker.command.clone(),
        Duration::from_secs(config.tracker.timeout_secs),
    )
    .with_workdir(workdir)
}

fn source_for(target: Target, config: &Config) -> Source {
    match target {
        Target::Scope(scope) => Source::List(ListQuery {
            scope,
            limit: config.tracker.limit,
            sort: config.tracker.sort.clone(),
        }),
        Target::Issue(id) => Source::Single(id),
    }
}

/// A failed initial fetch is fatal. Not-found keeps its own message.
fn startup_error(e: TrackerError) -> Box<dyn std::error::Error> {
    if e.is_not_found() {
        e.into()
    } else {
        format!("fetch failed: {}", e).into()
    }
}

// ---------------------------------------------------------------------------
// Print mode
// ---------------------------------------------------------------------------

fn cmd_print(session: &Session, width: u16, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(notice) = session.notice() {
        eprintln!("{}", notice.text);
    }
    if json {
        println!("{}", list_json(session)?);
    } else {
        println!("{}", list_plain(session, width));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::tracker::Scope;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn overrides_beat_config() {
        let cli = Cli::try_parse_from([
            "bdt",
            "--bd",
            "br",
            "--limit",
            "7",
            "--sort",
            "created",
            "--no-priority-keys",
            "--no-search",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.tracker.command, "br");
        assert_eq!(config.tracker.limit, 7);
        assert_eq!(config.tracker.sort, "created");
        assert!(!config.keys.priority_hotkeys);
        assert!(!config.keys.search);
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["bdt"]).unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.tracker.command, "bd");
        assert_eq!(config.tracker.limit, 100);
        assert!(config.keys.priority_hotkeys);
    }

    #[test]
    fn source_from_target() {
        let config = Config::default();
        assert_eq!(
            source_for(Target::Scope(Scope::All), &config),
            Source::List(ListQuery {
                scope: Scope::All,
                limit: 100,
                sort: "priority".into(),
            })
        );
        assert_eq!(
            source_for(Target::Issue("x-1".into()), &config),
            Source::Single("x-1".into())
        );
    }

    #[test]
    fn startup_error_labels() {
        let e = startup_error(TrackerError::NotFound("x-9".into()));
        assert_eq!(e.to_string(), "issue x-9 not found");
        let e = startup_error(TrackerError::Timeout {
            program: "bd".into(),
            timeout: Duration::from_secs(30),
        });
        assert_eq!(e.to_string(), "fetch failed: bd did not finish within 30s");
    }
}
