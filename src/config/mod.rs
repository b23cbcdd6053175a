//! Run configuration assembled from the CLI layer.
//!
//! Everything the orchestrator needs travels in one [`SessionsConfig`]
//! record; the HTTP client's knobs live in the nested
//! [`EngineConfig`](crate::engine::EngineConfig). There is no other
//! process-wide state.

mod error;
mod parse;

pub use error::ConfigError;
pub use parse::{parse_duration, parse_header, parse_local_addr};

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::engine::EngineConfig;

/// Default seconds between progress summaries.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for a `sessions` run.
#[derive(Debug, Clone)]
pub struct SessionsConfig {
    /// Directory of `*.txt` session scripts.
    pub dir: PathBuf,
    /// Aggregate log destination: `"stdout"` or a file path.
    pub log: String,
    /// Interval between overall progress summaries.
    pub status_interval: Duration,
    /// Walk scripts and log without sending traffic.
    pub pretend: bool,
    /// Headers merged into every request target of every script.
    pub headers: HeaderMap,
    /// Shared HTTP engine configuration.
    pub engine: EngineConfig,
}

impl SessionsConfig {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            log: "stdout".to_string(),
            status_interval: DEFAULT_STATUS_INTERVAL,
            pretend: false,
            headers: HeaderMap::new(),
            engine: EngineConfig::default(),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Seconds between progress summaries; clamped to at least one second.
    pub fn with_status_interval(mut self, secs: u64) -> Self {
        self.status_interval = Duration::from_secs(secs.max(1));
        self
    }

    pub fn with_pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Log a one-shot summary of the run configuration.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Session directory: {}", self.dir.display());
        info!("Aggregate log: {}", self.log);
        info!("Status interval: {}s", self.status_interval.as_secs());
        info!("Timeout: {:?}", self.engine.timeout);
        info!("Redirects: {}", self.engine.redirects);
        info!("Keep-alive: {}", self.engine.keepalive);
        if self.pretend {
            info!("Pretend mode: no traffic will be sent");
        }
        if let Some(addr) = self.engine.local_addr {
            info!("Local address: {}", addr);
        }
        if let Some(cert) = &self.engine.root_cert {
            info!("Root certificate: {}", cert.display());
        }
        if !self.headers.is_empty() {
            info!("Global headers: {}", self.headers.len());
        }
    }
}
