use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::issue::{FieldError, Issue, RawIssue, Status, normalize};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for tracker command invocations
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("could not parse tracker output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid record {id}: {source}")]
    Invalid { id: String, source: FieldError },
    #[error("issue {0} not found")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound(_))
    }
}

/// Which subset of records a listing draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Open and unblocked
    Ready,
    /// Every non-closed record
    Open,
    /// Everything, closed included
    All,
}

impl Scope {
    pub fn parse(s: &str) -> Option<Scope> {
        match s {
            "ready" => Some(Scope::Ready),
            "open" => Some(Scope::Open),
            "all" => Some(Scope::All),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Ready => "ready",
            Scope::Open => "open",
            Scope::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub scope: Scope,
    pub limit: usize,
    pub sort: String,
}

impl ListQuery {
    /// Command-line arguments for this listing
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = match self.scope {
            Scope::Ready => vec!["ready".into(), "--json".into()],
            Scope::Open => vec![
                "list".into(),
                "--json".into(),
                "--status".into(),
                "open".into(),
            ],
            Scope::All => vec!["list".into(), "--json".into(), "--all".into()],
        };
        args.push("--limit".into());
        args.push(self.limit.to_string());
        if !self.sort.is_empty() {
            args.push("--sort".into());
            args.push(self.sort.clone());
        }
        args
    }
}

/// A single field write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Title(String),
    Description(String),
    Status(Status),
    Priority(u8),
}

impl FieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldChange::Title(_) => "title",
            FieldChange::Description(_) => "description",
            FieldChange::Status(_) => "status",
            FieldChange::Priority(_) => "priority",
        }
    }

    /// Flag and value as passed to `update`
    pub fn args(&self) -> [String; 2] {
        let value = match self {
            FieldChange::Title(v) | FieldChange::Description(v) => v.clone(),
            FieldChange::Status(s) => s.as_str().to_string(),
            FieldChange::Priority(p) => p.to_string(),
        };
        [format!("--{}", self.field_name()), value]
    }

    /// Patch the local copy of a record
    pub fn apply(&self, issue: &mut Issue) {
        match self {
            FieldChange::Title(v) => issue.title = v.clone(),
            FieldChange::Description(v) => {
                issue.description = if v.trim().is_empty() {
                    None
                } else {
                    Some(v.clone())
                }
            }
            FieldChange::Status(s) => issue.status = *s,
            FieldChange::Priority(p) => issue.priority = Some(*p),
        }
    }
}

/// A field write addressed to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub id: String,
    pub change: FieldChange,
}

impl FieldUpdate {
    pub fn new(id: impl Into<String>, change: FieldChange) -> Self {
        FieldUpdate {
            id: id.into(),
            change,
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["update".to_string(), self.id.clone()];
        args.extend(self.change.args());
        args
    }
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            FieldChange::Title(_) | FieldChange::Description(_) => {
                write!(f, "{} {}", self.id, self.change.field_name())
            }
            FieldChange::Status(s) => write!(f, "{} status → {}", self.id, s),
            FieldChange::Priority(p) => write!(f, "{} priority → P{}", self.id, p),
        }
    }
}

/// The remote store. Calls block until the command finishes or times out.
pub trait Tracker {
    fn list(&self, query: &ListQuery) -> Result<Vec<Issue>, TrackerError>;
    fn show(&self, id: &str) -> Result<Issue, TrackerError>;
    fn update(&self, update: &FieldUpdate) -> Result<(), TrackerError>;
}

/// `bd` (or a compatible program) invoked as a subprocess with `--json` output
#[derive(Debug, Clone)]
pub struct BdTracker {
    program: String,
    timeout: Duration,
    workdir: Option<PathBuf>,
}

impl BdTracker {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        BdTracker {
            program: program.into(),
            timeout,
            workdir: None,
        }
    }

    /// Run the command from this directory instead of the current one
    pub fn with_workdir(mut self, dir: Option<PathBuf>) -> Self {
        self.workdir = dir;
        self
    }

    fn run(&self, args: &[String]) -> Result<String, TrackerError> {
        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| TrackerError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        // Drain both pipes concurrently so a chatty child can't fill one and stall
        let stdout = child.stdout.take().map(drain_pipe);
        let stderr = child.stderr.take().map(drain_pipe);

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() > self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                warn!(program = %self.program, ?args, "tracker command timed out");
                return Err(TrackerError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_pipe(stdout);
        let stderr = join_pipe(stderr);
        debug!(
            program = %self.program,
            ?args,
            code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tracker command finished"
        );

        if !status.success() {
            warn!(program = %self.program, ?args, stderr = %stderr.trim(), "tracker command failed");
            return Err(TrackerError::Failed {
                program: self.program.clone(),
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_pipe(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl Tracker for BdTracker {
    fn list(&self, query: &ListQuery) -> Result<Vec<Issue>, TrackerError> {
        let out = self.run(&query.args())?;
        parse_issues(&out)
    }

    fn show(&self, id: &str) -> Result<Issue, TrackerError> {
        let args = vec!["show".to_string(), id.to_string(), "--json".to_string()];
        let out = self.run(&args)?;
        parse_issues(&out)?
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    fn update(&self, update: &FieldUpdate) -> Result<(), TrackerError> {
        self.run(&update.args()).map(|_| ())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawIssue>),
    One(Box<RawIssue>),
}

/// Parse tracker JSON (an array, or a bare object) into validated issues.
/// Blank output is an empty listing.
pub fn parse_issues(out: &str) -> Result<Vec<Issue>, TrackerError> {
    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raws = match serde_json::from_str::<OneOrMany>(trimmed) {
        Ok(OneOrMany::Many(v)) => v,
        Ok(OneOrMany::One(r)) => vec![*r],
        // Re-parse as an array for a useful error message
        Err(_) => serde_json::from_str::<Vec<RawIssue>>(trimmed)?,
    };
    raws.into_iter()
        .map(|raw| {
            let id = raw.id.clone();
            normalize(raw).map_err(|source| TrackerError::Invalid { id, source })
        })
        .collect()
}
