//! Per-request result records and their on-disk stream format.
//!
//! Every completed request attempt produces one [`HitResult`]. A session
//! appends its results to a `.bin` file next to its script via
//! [`ResultWriter`]; downstream tooling (reports, dumps) reads them back
//! with [`ResultReader`].
//!
//! The stream is self-describing: a 6-byte `korra1` header followed by
//! length-prefixed JSON records, so a reader in any language can decode it
//! without a separate schema.

mod codec;
mod writer;

pub use codec::{read_all, CodecError, ResultReader, STREAM_MAGIC};
pub use writer::{bin_path_for, ResultWriter};

use serde::{Deserialize, Serialize};

/// One completed HTTP request attempt.
///
/// `code == 0` means no response was received and `error` says why;
/// otherwise `code` is the HTTP status and `error` is empty unless the
/// status itself counts as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitResult {
    /// Request start, nanoseconds since the Unix epoch (UTC).
    pub timestamp: i64,
    /// Start to response-header receipt, nanoseconds, measured monotonically.
    pub latency: i64,
    /// Request body size from Content-Length; 0 when unknown.
    pub bytes_out: u64,
    /// Response body size from Content-Length; 0 when unknown.
    pub bytes_in: u64,
    /// HTTP status code; 0 when no response arrived.
    pub code: u16,
    pub method: String,
    /// Full URL as observed after redirects.
    pub url: String,
    /// URL path with the query stripped.
    pub path: String,
    /// 1-based attempt index within a polling loop; 1 for non-polled hits.
    pub request_count: i32,
    /// Failure description; empty on success.
    pub error: String,
}
