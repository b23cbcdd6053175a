//! Per-session runner: walks one script's actions and streams results.
//!
//! A session moves through Created → Running → Quiescing → Done. The
//! `run` driver owns the result stream; an internal producer task walks
//! the script, performs hits, and hands results over a capacity-one
//! channel, so the file on disk is always a strict prefix of what the
//! session produced. Stop requests are observed at action boundaries and
//! inside pause waits — never mid-request — and quiescing drains at most
//! one in-flight result inside a bounded window.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::engine::Engine;
use crate::logging::LogSender;
use crate::results::{HitResult, ResultWriter};
use crate::script::{SessionScript, Target};

/// How long quiescing waits for one final in-flight result.
pub const DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// Cursor visibility for the progress ticker: actions completed out of
/// total. Owned by the runner, read by the orchestrator.
#[derive(Debug)]
pub struct Progress {
    done: AtomicUsize,
    total: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.done() >= self.total
    }

    fn finish_one(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
}

/// The orchestrator's view of a running session.
pub struct SessionHandle {
    name: String,
    progress: Arc<Progress>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
}

impl SessionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Ask the runner to quiesce. Idempotent: signals only while the
    /// session is running, so repeat calls after the first are no-ops.
    pub fn stop(&self) {
        if self.running.load(Ordering::SeqCst) {
            let _ = self.stop_tx.send(true);
        }
    }
}

/// One runtime instance of a script.
pub struct Session {
    name: String,
    script_path: PathBuf,
    script: SessionScript,
    engine: Engine,
    log: LogSender,
    pretend: bool,
    progress: Arc<Progress>,
    running: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl Session {
    /// Bind a parsed script to the shared engine and log channel. The
    /// returned handle is what the orchestrator keeps for stop/progress.
    pub fn new(
        script_path: PathBuf,
        script: SessionScript,
        engine: Engine,
        log: LogSender,
        pretend: bool,
    ) -> (Self, SessionHandle) {
        let name = script_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script_path.display().to_string());
        let progress = Arc::new(Progress::new(script.action_count()));
        let running = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = SessionHandle {
            name: name.clone(),
            progress: progress.clone(),
            running: running.clone(),
            stop_tx: stop_tx.clone(),
        };
        let session = Self {
            name,
            script_path,
            script,
            engine,
            log,
            pretend,
            progress,
            running,
            stop_tx,
            stop_rx,
        };
        (session, handle)
    }

    /// Drive the session to completion or through a stop request.
    pub async fn run(self) {
        let Session {
            name,
            script_path,
            script,
            engine,
            log,
            pretend,
            progress,
            running,
            stop_tx,
            mut stop_rx,
        } = self;

        running.store(true, Ordering::SeqCst);
        let logger = SessionLogger::open(log, &script_path);

        let mut writer = if pretend {
            None
        } else {
            match ResultWriter::for_script(&script_path) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    tracing::error!(session = %name, error = %e, "cannot create result stream");
                    logger
                        .log(format!("{}: cannot create result stream: {}", name, e))
                        .await;
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            }
        };

        let (results_tx, mut results_rx) = mpsc::channel::<HitResult>(1);
        let producer = Producer {
            name: name.clone(),
            script,
            engine,
            logger: logger.clone(),
            results: results_tx,
            stop: stop_rx.clone(),
            progress,
            pretend,
        };
        tokio::spawn(producer.process());

        loop {
            tokio::select! {
                received = results_rx.recv() => match received {
                    Some(result) => {
                        if let Some(w) = writer.as_mut() {
                            if let Err(e) = w.append(&result) {
                                tracing::error!(session = %name, error = %e, "result write failed");
                                logger
                                    .log(format!("{}: result write failed: {}", name, e))
                                    .await;
                                break;
                            }
                        }
                    }
                    // The producer finished the script and hung up.
                    None => {
                        running.store(false, Ordering::SeqCst);
                        logger
                            .log(format!(
                                "{}: All done or asked to stop, waiting for next result or 5 seconds...",
                                name
                            ))
                            .await;
                        break;
                    }
                },
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        continue;
                    }
                    running.store(false, Ordering::SeqCst);
                    logger
                        .log(format!(
                            "{}: All done or asked to stop, waiting for next result or 5 seconds...",
                            name
                        ))
                        .await;
                    // A hit may be mid-flight; give it one bounded chance to land.
                    if let Ok(Some(result)) = timeout(DRAIN_WINDOW, results_rx.recv()).await {
                        if let Some(w) = writer.as_mut() {
                            if let Err(e) = w.append(&result) {
                                tracing::error!(session = %name, error = %e, "result write failed");
                            }
                        }
                    }
                    break;
                }
            }
        }

        if let Some(mut w) = writer {
            if let Err(e) = w.close() {
                tracing::error!(session = %name, error = %e, "result stream close failed");
            }
        }
        running.store(false, Ordering::SeqCst);
        logger.log(format!("{}: ...DONE", name)).await;
        drop(stop_tx);
    }
}

/// The internal task that walks the script and produces results.
struct Producer {
    name: String,
    script: SessionScript,
    engine: Engine,
    logger: SessionLogger,
    results: mpsc::Sender<HitResult>,
    stop: watch::Receiver<bool>,
    progress: Arc<Progress>,
    pretend: bool,
}

impl Producer {
    async fn process(mut self) {
        while self.script.remains() {
            let label = format!("{} ({})", self.name, self.script.progress_label());
            let target = match self.script.advance() {
                None => break,
                Some(action) => match action.target.clone() {
                    Some(target) => target,
                    // Strict parsing keeps invalid actions out of runners.
                    None => {
                        self.progress.finish_one();
                        continue;
                    }
                },
            };

            match target {
                Target::Comment(text) => {
                    self.logger.log(format!("{}: {}", label, text)).await;
                }
                Target::Pause(millis) => {
                    if self.pretend {
                        self.logger
                            .log(format!("{}: (pretend) Sleeping ({} ms)...", label, millis))
                            .await;
                    } else {
                        self.logger
                            .log(format!("{}: Sleeping ({} ms)...", label, millis))
                            .await;
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
                            _ = self.stop.changed() => return,
                        }
                    }
                }
                Target::Request(request) => {
                    let mut attempt: i32 = 1;
                    loop {
                        let code = if self.pretend {
                            self.logger
                                .log(format!(
                                    "{}: (pretend) 200 => {} {}, 0 ms",
                                    label,
                                    request.method,
                                    request.path()
                                ))
                                .await;
                            200
                        } else {
                            let result = self.engine.hit(&request, attempt).await;
                            let code = result.code;
                            self.logger
                                .log(format!(
                                    "{}: {} => {} {}, {} ms",
                                    label,
                                    result.code,
                                    result.method,
                                    result.path,
                                    result.latency / 1_000_000
                                ))
                                .await;
                            if self.results.send(result).await.is_err() {
                                // Driver is gone; nothing left to produce for.
                                return;
                            }
                            code
                        };

                        if request.poller.should_retry(attempt, code) {
                            self.logger
                                .log(format!(
                                    "{}: Pausing for {} ms until retry...",
                                    label, request.poller.wait_between
                                ))
                                .await;
                            if !self.pretend {
                                tokio::time::sleep(Duration::from_millis(
                                    request.poller.wait_between,
                                ))
                                .await;
                            }
                            attempt += 1;
                        } else {
                            break;
                        }
                    }
                }
            }

            self.progress.finish_one();
            if *self.stop.borrow() {
                return;
            }
        }
    }
}

/// Writes a session's lines to the shared channel and mirrors them into a
/// `.log` file next to the script.
#[derive(Clone)]
struct SessionLogger {
    chan: LogSender,
    file: Arc<Mutex<Option<File>>>,
}

impl SessionLogger {
    fn open(chan: LogSender, script_path: &Path) -> Self {
        let log_path = script_path.with_extension("log");
        let file = match File::create(&log_path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(path = %log_path.display(), error = %e, "cannot create session log");
                None
            }
        };
        Self {
            chan,
            file: Arc::new(Mutex::new(file)),
        }
    }

    async fn log(&self, message: String) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", message);
            }
        }
        let _ = self.chan.send(message).await;
    }
}
