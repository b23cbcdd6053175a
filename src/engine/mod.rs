//! HTTP engine: one long-lived client and the Hit operation.
//!
//! The engine owns a single [`reqwest::Client`] configured once from
//! [`EngineConfig`] and shared by every session; connection-pool reuse
//! across simulated users is deliberate for load generation. Each call to
//! [`Engine::hit`] performs one request attempt and produces one
//! [`HitResult`], never an `Err` — transport failures are data, not
//! control flow, so a session keeps walking its script after them.

mod error;

pub use error::EngineError;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::{redirect, Client, StatusCode};

use crate::results::HitResult;
use crate::script::RequestTarget;

/// Default number of redirects to follow.
pub const DEFAULT_REDIRECTS: i32 = 10;

/// Redirect policy value meaning: do not follow, record the 3xx at the
/// redirect as success.
pub const NO_FOLLOW: i32 = -1;

/// Default request timeout (dial and response).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// The single configuration record for the HTTP engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Applies to the dial (TCP connect + TLS handshake) and to the wait
    /// for the response.
    pub timeout: Duration,
    /// Maximum redirects to follow; [`NO_FOLLOW`] disables following and
    /// treats the 3xx itself as the recorded response.
    pub redirects: i32,
    /// Local source IP bound into the connector.
    pub local_addr: Option<IpAddr>,
    /// PEM file added to the root CA pool.
    pub root_cert: Option<PathBuf>,
    /// Skip server certificate verification. On by default: korra points
    /// at arbitrary load-test targets with self-signed certs.
    pub insecure: bool,
    /// Reuse connections between requests.
    pub keepalive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            redirects: DEFAULT_REDIRECTS,
            local_addr: None,
            root_cert: None,
            insecure: true,
            keepalive: true,
        }
    }
}

/// Executes request attempts against a shared client.
#[derive(Clone)]
pub struct Engine {
    client: Client,
    redirects: i32,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let policy = if config.redirects < 0 {
            redirect::Policy::none()
        } else {
            redirect::Policy::limited(config.redirects as usize)
        };

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(policy)
            .danger_accept_invalid_certs(config.insecure);

        builder = if config.keepalive {
            builder.tcp_keepalive(Some(KEEPALIVE_INTERVAL))
        } else {
            builder
                .tcp_keepalive(None::<Duration>)
                .pool_max_idle_per_host(0)
        };

        if let Some(addr) = config.local_addr {
            builder = builder.local_address(addr);
        }

        if let Some(path) = &config.root_cert {
            let pem = std::fs::read(path).map_err(|error| EngineError::CertificateRead {
                path: path.clone(),
                error,
            })?;
            let cert =
                reqwest::Certificate::from_pem(&pem).map_err(|error| EngineError::CertificateParse {
                    path: path.clone(),
                    error,
                })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(EngineError::Client)?;
        Ok(Self {
            client,
            redirects: config.redirects,
        })
    }

    /// Perform one request attempt against the target.
    ///
    /// `request_count` is the 1-based attempt index within a polling loop.
    /// The response body is read and discarded; only its Content-Length is
    /// recorded. Transport failures come back as a result with `code = 0`.
    pub async fn hit(&self, target: &RequestTarget, request_count: i32) -> HitResult {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let start = Instant::now();

        let mut result = HitResult {
            timestamp,
            latency: 0,
            bytes_out: 0,
            bytes_in: 0,
            code: 0,
            method: target.method.to_string(),
            url: target.url.to_string(),
            path: target.url.path().to_string(),
            request_count,
            error: String::new(),
        };

        let body = match &target.body_path {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    result.error = format!("failed to read body file {}: {}", path.display(), e);
                    result.latency = elapsed_nanos(start);
                    return result;
                }
            },
            None => None,
        };

        let mut request = self
            .client
            .request(target.method.clone(), target.url.clone())
            .headers(target.headers.clone());
        if let Some(bytes) = body {
            result.bytes_out = bytes.len() as u64;
            request = request.body(bytes);
        }

        match request.send().await {
            Ok(response) => {
                // Headers are in; the clock stops here.
                result.latency = elapsed_nanos(start);
                let status = response.status();
                result.code = status.as_u16();
                result.url = response.url().to_string();
                result.path = response.url().path().to_string();
                result.bytes_in = response.content_length().unwrap_or(0);
                let _ = response.bytes().await;
                if self.has_error_code(status) {
                    result.error = status_line(status);
                }
            }
            Err(e) => {
                result.latency = elapsed_nanos(start);
                result.error = e.to_string();
            }
        }

        result
    }

    /// Non-2xx counts as an HTTP-level failure, except a 3xx recorded
    /// under the no-follow policy, which is the success we asked for.
    fn has_error_code(&self, status: StatusCode) -> bool {
        if status.is_success() {
            return false;
        }
        !(self.redirects == NO_FOLLOW && status.is_redirection())
    }
}

fn elapsed_nanos(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
