use std::path::PathBuf;

use clap::Parser;

use crate::io::tracker::Scope;

#[derive(Parser, Debug)]
#[command(name = "bdt", about = concat!("bdt v", env!("CARGO_PKG_VERSION"), " - browse and edit bd issues in the terminal"), version)]
pub struct Cli {
    /// `ready` (default), `open`, `all`, or an issue id
    pub target: Option<String>,

    /// Read config from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Tracker program to run
    #[arg(long = "bd", value_name = "PROGRAM")]
    pub bd: Option<String>,

    /// Maximum number of issues to fetch
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Sort order passed to the tracker
    #[arg(long)]
    pub sort: Option<String>,

    /// Start with this filter applied
    #[arg(long)]
    pub filter: Option<String>,

    /// Disable the 0-4 priority hotkeys
    #[arg(long)]
    pub no_priority_keys: bool,

    /// Disable search mode
    #[arg(long)]
    pub no_search: bool,

    /// Print the list and exit instead of opening the terminal UI
    #[arg(long)]
    pub print: bool,

    /// With --print: output the visible issues as JSON
    #[arg(long, requires = "print")]
    pub json: bool,

    /// With --print: line width
    #[arg(long, default_value_t = 80)]
    pub width: u16,

    /// Write logs here instead of the default state directory
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Run the tracker from a different project directory
    #[arg(short = 'C', long = "project-dir")]
    pub project_dir: Option<String>,
}

/// What the positional argument asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Scope(Scope),
    Issue(String),
}

impl Target {
    pub fn parse(arg: Option<&str>) -> Target {
        match arg.map(str::trim) {
            None | Some("") => Target::Scope(Scope::Ready),
            Some(s) => match Scope::parse(s) {
                Some(scope) => Target::Scope(scope),
                None => Target::Issue(s.to_string()),
            },
        }
    }
}
