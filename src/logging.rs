use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "BDT_LOG";

/// Install a file-backed subscriber.
///
/// The terminal belongs to the TUI, so nothing is ever written to stderr. If
/// the log file cannot be opened, logging stays disabled and `false` is
/// returned.
pub fn init_logging(path: &Path, verbose: bool) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "beadtui=debug,warn"
        } else {
            "beadtui=info,warn"
        })
    });

    if let Some(parent) = path.parent()
        && fs::create_dir_all(parent).is_err()
    {
        return false;
    }
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(verbose)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .is_ok()
}
