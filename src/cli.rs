//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::engine::DEFAULT_REDIRECTS;

/// Scriptable HTTP session load generator.
///
/// Runs a directory of plain-text session scripts as concurrent simulated
/// users, writing one binary result stream per session plus an aggregated
/// progress log.
#[derive(Parser, Debug)]
#[command(name = "korra", version, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every session script in a directory as concurrent users.
    Sessions {
        /// Directory of session scripts (*.txt)
        #[arg(long)]
        dir: PathBuf,

        /// x509 root certificate file (PEM) added to the trust pool
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Header applied to every request, as 'Name: value' (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,

        /// Use persistent connections
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        keepalive: bool,

        /// Local IP address to bind outgoing requests to
        #[arg(long)]
        laddr: Option<String>,

        /// Aggregate log destination: 'stdout' or a file path
        #[arg(long, default_value = "stdout")]
        log: String,

        /// Walk the scripts and log without sending traffic
        #[arg(long)]
        pretend: bool,

        /// Redirects to follow; -1 does not follow and records the
        /// redirect response as success
        #[arg(long, default_value_t = DEFAULT_REDIRECTS, allow_negative_numbers = true)]
        redirects: i32,

        /// Seconds between overall progress summaries
        #[arg(long, default_value_t = 30)]
        status: u64,

        /// Request timeout, e.g. 30s, 2m, 500ms
        #[arg(long, default_value = "30s")]
        timeout: String,
    },

    /// Check session scripts and report per-action diagnostics.
    ///
    /// Poll status patterns are matched verbatim against the decimal
    /// status code; only the default pattern is anchored.
    Validate {
        /// Script file or directory of scripts to check
        #[arg(long, default_value = ".")]
        file: PathBuf,

        /// Show every action, not just the failing ones
        #[arg(long)]
        verbose: bool,
    },
}
