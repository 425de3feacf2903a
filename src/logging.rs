//! Tracing subscriber setup shared by both binaries.
//!
//! Filter priority, highest first:
//!
//! 1. `QUICKCOPY_LOG` (full directives, e.g. `quickcopy_lib=debug,warn`)
//! 2. `RUST_LOG`
//! 3. CLI flags (`-v` → debug, `-q` → errors only)
//!
//! Logs always go to stderr; the native messaging host owns stdout.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "QUICKCOPY_LOG";

const CRATE_TARGET: &str = "quickcopy_lib";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// Verbose wins when both flags are given.
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn directives(self) -> String {
        match self {
            Self::Quiet => Level::ERROR.to_string(),
            Self::Normal => format!("{},{CRATE_TARGET}={}", Level::WARN, Level::INFO),
            Self::Verbose => format!("{},{CRATE_TARGET}={}", Level::INFO, Level::DEBUG),
        }
    }
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    // An unparsable QUICKCOPY_LOG falls through instead of failing startup
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(verbosity.directives()).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Returns false when one was already set.
pub fn init(verbosity: Verbosity) -> bool {
    let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(verbosity == Verbosity::Verbose);

    if verbosity == Verbosity::Verbose {
        tracing_subscriber::registry()
            .with(build_env_filter(verbosity))
            .with(layer.with_timer(fmt::time::uptime()))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(build_env_filter(verbosity))
            .with(layer.without_time().compact())
            .try_init()
            .is_ok()
    }
}
