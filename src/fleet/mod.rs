//! Fleet orchestrator: one runner per script, one log, one shutdown.
//!
//! Startup parses every script strictly before any traffic moves — a bad
//! script aborts the whole run with its file and line. After launch the
//! orchestrator only multiplexes: it pumps the shared log channel,
//! summarizes progress on a timer, and waits for either SIGINT or natural
//! completion, at which point it asks every session to quiesce.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::config::SessionsConfig;
use crate::engine::{Engine, EngineError};
use crate::logging::{self, LogSink};
use crate::script::{ScriptError, SessionScript};
use crate::session::{Session, SessionHandle};

/// Error type for starting a fleet run.
#[derive(Debug)]
pub enum FleetError {
    /// The session directory has no `*.txt` scripts (or does not exist).
    NoScripts(PathBuf),
    /// Failed to read the session directory.
    Dir { path: PathBuf, error: std::io::Error },
    /// A script failed strict validation.
    Script(ScriptError),
    /// The HTTP engine could not be built.
    Engine(EngineError),
    /// The aggregate log sink could not be opened.
    Log { path: String, error: std::io::Error },
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetError::NoScripts(path) => write!(
                f,
                "{} must exist and contain at least one .txt session script",
                path.display()
            ),
            FleetError::Dir { path, error } => {
                write!(f, "failed to read {}: {}", path.display(), error)
            }
            FleetError::Script(error) => error.fmt(f),
            FleetError::Engine(error) => error.fmt(f),
            FleetError::Log { path, error } => {
                write!(f, "failed to open log {}: {}", path, error)
            }
        }
    }
}

impl std::error::Error for FleetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FleetError::Dir { error, .. } | FleetError::Log { error, .. } => Some(error),
            FleetError::Script(error) => Some(error),
            FleetError::Engine(error) => Some(error),
            FleetError::NoScripts(_) => None,
        }
    }
}

impl From<ScriptError> for FleetError {
    fn from(error: ScriptError) -> Self {
        FleetError::Script(error)
    }
}

impl From<EngineError> for FleetError {
    fn from(error: EngineError) -> Self {
        FleetError::Engine(error)
    }
}

/// Every `*.txt` file in the session directory, sorted by name.
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>, FleetError> {
    let entries = std::fs::read_dir(dir).map_err(|error| FleetError::Dir {
        path: dir.to_path_buf(),
        error,
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| FleetError::Dir {
            path: dir.to_path_buf(),
            error,
        })?;
        let path = entry.path();
        if path.extension().map(|e| e == "txt").unwrap_or(false) && path.is_file() {
            scripts.push(path);
        }
    }
    scripts.sort();

    if scripts.is_empty() {
        return Err(FleetError::NoScripts(dir.to_path_buf()));
    }
    Ok(scripts)
}

/// Run every session script in the configured directory to completion or
/// interruption.
pub async fn run(config: SessionsConfig) -> Result<(), FleetError> {
    let scripts = discover_scripts(&config.dir)?;
    let engine = Engine::new(&config.engine)?;
    let sink = LogSink::open(&config.log).map_err(|error| FleetError::Log {
        path: config.log.clone(),
        error,
    })?;

    let (log_tx, log_rx) = logging::channel();
    let pump = logging::spawn_pump(log_rx, sink);

    // Strict parse of everything up front: a bad script aborts the run
    // before any traffic moves.
    let mut sessions = Vec::new();
    let mut handles: Vec<SessionHandle> = Vec::new();
    for path in &scripts {
        let mut script = SessionScript::parse_file(path)?;
        script.apply_default_headers(&config.headers);
        let (session, handle) = Session::new(
            path.clone(),
            script,
            engine.clone(),
            log_tx.clone(),
            config.pretend,
        );
        sessions.push(session);
        handles.push(handle);
    }

    config.log_summary();
    info!(sessions = sessions.len(), dir = %config.dir.display(), "starting sessions");

    let start = Instant::now();
    let runners: Vec<_> = sessions
        .into_iter()
        .map(|session| tokio::spawn(session.run()))
        .collect();

    // Natural completion: all runners returned.
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        for runner in runners {
            let _ = runner.await;
        }
        let _ = done_tx.send(());
    });

    let mut ticker = tokio::time::interval(config.status_interval);
    ticker.tick().await; // the first tick fires immediately

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut done_rx = done_rx;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                let _ = log_tx.send("Interrupted, stopping sessions...".to_string()).await;
                for handle in &handles {
                    handle.stop();
                }
                // Runners quiesce within their bounded drain windows.
                let _ = (&mut done_rx).await;
                break;
            }
            _ = &mut done_rx => {
                // Already complete; stop() is a no-op on finished sessions.
                for handle in &handles {
                    handle.stop();
                }
                break;
            }
            _ = ticker.tick() => {
                let _ = log_tx.send(progress_line(start.elapsed(), &handles)).await;
            }
        }
    }

    let _ = log_tx
        .send(progress_line(start.elapsed(), &handles))
        .await;
    drop(log_tx);
    let _ = pump.await;
    Ok(())
}

fn progress_line(elapsed: Duration, handles: &[SessionHandle]) -> String {
    let mut actions_total = 0usize;
    let mut actions_done = 0usize;
    let mut sessions_done = 0usize;
    for handle in handles {
        let progress = handle.progress();
        actions_total += progress.total();
        actions_done += progress.done();
        if progress.is_complete() {
            sessions_done += 1;
        }
    }
    format!(
        "Elapsed {}: {}/{} actions complete ({:.2}%); {}/{} sessions complete ({:.2}%)",
        format_elapsed(elapsed),
        actions_done,
        actions_total,
        percent(actions_done, actions_total),
        sessions_done,
        handles.len(),
        percent(sessions_done, handles.len()),
    )
}

fn percent(num: usize, den: usize) -> f64 {
    if den == 0 {
        100.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}

fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
