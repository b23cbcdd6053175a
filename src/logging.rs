//! Aggregate log plumbing.
//!
//! Every session pushes its lines onto one shared channel; a single pump
//! task drains it, prefixes a wall-clock timestamp, and writes to the
//! configured sink. The single consumer is what makes interleaved session
//! output come out in whole lines. Operator diagnostics go through
//! `tracing` to stderr instead and never mix with this stream.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered so producers never stall behind the progress ticker.
pub const LOG_CHANNEL_CAPACITY: usize = 1024;

pub type LogSender = mpsc::Sender<String>;
pub type LogReceiver = mpsc::Receiver<String>;

pub fn channel() -> (LogSender, LogReceiver) {
    mpsc::channel(LOG_CHANNEL_CAPACITY)
}

/// Where the aggregate log goes; `"stdout"` selects the console, anything
/// else names a file to create.
pub enum LogSink {
    Stdout(io::Stdout),
    File(File),
}

impl LogSink {
    pub fn open(spec: &str) -> io::Result<Self> {
        match spec {
            "stdout" => Ok(LogSink::Stdout(io::stdout())),
            path => Ok(LogSink::File(File::create(Path::new(path))?)),
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            LogSink::Stdout(out) => writeln!(out, "{}", line),
            LogSink::File(out) => writeln!(out, "{}", line),
        }
    }
}

/// Wall-clock prefix for aggregate log lines, `HH:MM:SS.micros` local time.
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.6f").to_string()
}

/// Drain the channel into the sink until every sender is gone.
pub fn spawn_pump(mut rx: LogReceiver, mut sink: LogSink) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let line = format!("{} {}", timestamp(), message);
            if let Err(e) = sink.write_line(&line) {
                tracing::error!(error = %e, "failed to write aggregate log line");
            }
        }
    })
}
