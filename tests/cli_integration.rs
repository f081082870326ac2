//! Integration tests for the `bdt` CLI.
//!
//! Each test writes a fake `bd` shell script into a temp directory, runs
//! `bdt --print` as a subprocess against it, and checks stdout, stderr and
//! the arguments the script was called with.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

const LIST_JSON: &str = r#"[
  {"id": "x-1", "title": "Fix bug", "status": "open", "priority": 2},
  {"id": "x-2", "title": "Add docs", "status": "closed", "priority": 4,
   "description": "Write the user guide."},
  {"id": "x-3", "title": "Refactor parser", "status": "in_progress"}
]"#;

/// Get the path to the built `bdt` binary.
fn bdt_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bdt"))
}

/// Write an executable fake tracker that logs its arguments to `calls.log`.
fn fake_bd(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-bd");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> \"{}\"\n{}\n",
        dir.join("calls.log").display(),
        body
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A tracker that answers every listing with `LIST_JSON` and knows `x-1`.
fn standard_bd(dir: &Path) -> PathBuf {
    let list = dir.join("list.json");
    fs::write(&list, LIST_JSON).unwrap();
    fake_bd(
        dir,
        &format!(
            r#"case "$1" in
  ready|list) cat "{list}" ;;
  show)
    if [ "$2" = "x-1" ]; then
      echo '[{{"id": "x-1", "title": "Fix bug", "status": "open", "priority": 2}}]'
    else
      echo '[]'
    fi ;;
  *) echo "unknown command $1" >&2; exit 2 ;;
esac"#,
            list = list.display()
        ),
    )
}

/// Run `bdt` with a clean environment rooted in `dir`.
fn run_bdt(dir: &Path, args: &[&str]) -> Output {
    Command::new(bdt_bin())
        .args(args)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_STATE_HOME", dir.join("state"))
        .env_remove("BDT_LOG")
        .output()
        .expect("failed to run bdt")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn print_ready_scope() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(tmp.path(), &["--bd", bd.to_str().unwrap(), "--print"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "ready · 3/3 issues\n\
         ○ P2 1  Fix bug\n\
         ✓ P4 2  Add docs\n\
         ◐ P? 3  Refactor parser\n"
    );
    assert_eq!(
        calls(tmp.path()),
        vec!["ready --json --limit 100 --sort priority"]
    );
}

#[test]
fn print_open_scope_with_limit_and_sort() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(
        tmp.path(),
        &[
            "open",
            "--bd",
            bd.to_str().unwrap(),
            "-n",
            "5",
            "--sort",
            "created",
            "--print",
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).starts_with("open · 3/3 issues\n"));
    assert_eq!(
        calls(tmp.path()),
        vec!["list --json --status open --limit 5 --sort created"]
    );
}

#[test]
fn print_all_scope() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(tmp.path(), &["all", "--bd", bd.to_str().unwrap(), "--print"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        calls(tmp.path()),
        vec!["list --json --all --limit 100 --sort priority"]
    );
}

#[test]
fn print_with_filter() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(
        tmp.path(),
        &["--bd", bd.to_str().unwrap(), "--print", "--filter", "FIX"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "ready · 1/3 issues · filter: FIX\n○ P2 1  Fix bug\n"
    );
}

#[test]
fn filter_matching_nothing_is_dropped() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(
        tmp.path(),
        &["--bd", bd.to_str().unwrap(), "--print", "--filter", "nothing-here"],
    );
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("ready · 3/3 issues\n"));
    assert!(stderr(&out).contains("no matches for \"nothing-here\""));
}

#[test]
fn print_json() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(
        tmp.path(),
        &["--bd", bd.to_str().unwrap(), "--print", "--json", "--filter", "guide"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["total"], 3);
    assert_eq!(value["issues"][0]["id"], "x-2");
    assert_eq!(value["issues"][0]["description"], "Write the user guide.");
}

#[test]
fn show_single_issue() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(tmp.path(), &["x-1", "--bd", bd.to_str().unwrap(), "--print"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "x-1 · 1/1 issues\n○ P2 1  Fix bug\n");
    assert_eq!(calls(tmp.path()), vec!["show x-1 --json"]);
}

#[test]
fn missing_issue_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let out = run_bdt(tmp.path(), &["x-9", "--bd", bd.to_str().unwrap(), "--print"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr(&out).trim(), "error: issue x-9 not found");
}

#[test]
fn tracker_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let bd = fake_bd(tmp.path(), "echo 'no database found' >&2\nexit 3");
    let out = run_bdt(tmp.path(), &["--bd", bd.to_str().unwrap(), "--print"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("fetch failed"), "stderr: {err}");
    assert!(err.contains("status 3"), "stderr: {err}");
    assert!(err.contains("no database found"), "stderr: {err}");
}

#[test]
fn unparsable_output_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let bd = fake_bd(tmp.path(), "echo 'not json'");
    let out = run_bdt(tmp.path(), &["--bd", bd.to_str().unwrap(), "--print"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("could not parse tracker output"));
}

#[test]
fn missing_program_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let out = run_bdt(
        tmp.path(),
        &["--bd", "/nonexistent/bd-program", "--print"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("could not run /nonexistent/bd-program"));
}

#[test]
fn empty_listing_exits_with_message() {
    let tmp = TempDir::new().unwrap();
    let bd = fake_bd(tmp.path(), "echo '[]'");
    let out = run_bdt(tmp.path(), &["--bd", bd.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "No issues in ready.\n");
}

#[test]
fn config_file_sets_tracker() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let config_dir = tmp.path().join("config").join("beadtui");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "[tracker]\ncommand = \"{}\"\nlimit = 20\nsort = \"\"\n",
            bd.display()
        ),
    )
    .unwrap();
    let out = run_bdt(tmp.path(), &["--print"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(calls(tmp.path()), vec!["ready --json --limit 20"]);
}

#[test]
fn invalid_key_binding_is_reported() {
    let tmp = TempDir::new().unwrap();
    let bd = standard_bd(tmp.path());
    let config = tmp.path().join("custom.toml");
    fs::write(&config, "[keys]\nscroll_down = \"pagedown\"\n").unwrap();
    let out = run_bdt(
        tmp.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "--bd",
            bd.to_str().unwrap(),
            "--print",
        ],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("scroll_down must be a single character"));
    assert!(calls(tmp.path()).is_empty());
}

#[test]
fn project_dir_sets_tracker_workdir() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    let bd = fake_bd(
        tmp.path(),
        "echo \"[{\\\"id\\\": \\\"x-1\\\", \\\"title\\\": \\\"$(basename \"$(pwd -P)\")\\\", \\\"status\\\": \\\"open\\\"}]\"",
    );
    let out = run_bdt(
        tmp.path(),
        &[
            "-C",
            project.to_str().unwrap(),
            "--bd",
            bd.to_str().unwrap(),
            "--print",
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("1  project"), "stdout: {}", stdout(&out));
}
