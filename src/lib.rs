//! korra - scriptable HTTP session load generator.
//!
//! A directory of plain-text session scripts is run as concurrent
//! simulated users. Each script is an ordered list of actions — HTTP
//! requests (optionally polled until a status matches), pauses, and
//! comments — executed strictly in order by a per-session runner. Every
//! completed request becomes one binary record in a `.bin` stream next to
//! its script, and all sessions' log lines interleave through a single
//! timestamped aggregate log.
//!
//! # Architecture
//!
//! ```text
//! script file ──parse──▶ SessionScript ──run──▶ Session runner
//!                                                  │        │
//!                                           Engine::hit   log lines
//!                                                  │        │
//!                                            ResultWriter   ▼
//!                                              (.bin)   log pump ──▶ stdout/file
//!                                                  ▲
//!                              fleet::run — one runner per script,
//!                              progress ticker, SIGINT shutdown
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod engine;
pub mod fleet;
pub mod logging;
pub mod results;
pub mod script;
pub mod session;

// Re-exports for convenience
pub use config::SessionsConfig;
pub use engine::{Engine, EngineConfig};
pub use script::SessionScript;
pub use session::Session;
