//! Action decoding: one raw block into a [`Target`].
//!
//! A target is exactly one of three shapes: an HTTP request blueprint, a
//! pause, or a comment echoed to the log. Request targets may carry a
//! [`Poller`] describing a retry-until policy.

use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use super::error::LineError;

/// HTTP methods a script line may use.
pub const SUPPORTED_METHODS: &[&str] = &["HEAD", "GET", "PUT", "POST", "PATCH", "OPTIONS"];

const DEFAULT_UNTIL_COUNT: u32 = 5;
const DEFAULT_STATUS_PATTERN: &str = r"^2\d\d$";
const DEFAULT_WAIT_BETWEEN_MS: u64 = 1000;

/// Retry-until policy attached to a request target.
///
/// Fields other than `active` are consulted only when `active` is true,
/// which happens iff the script line was prefixed with `POLL`.
#[derive(Debug, Clone)]
pub struct Poller {
    pub active: bool,
    /// Maximum attempts, including the first.
    pub until_count: u32,
    /// Pattern matched against the decimal status code; a match stops the
    /// loop. User-supplied patterns are taken verbatim (no anchoring).
    pub until_status: Regex,
    /// Milliseconds to wait between attempts.
    pub wait_between: u64,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            active: false,
            until_count: DEFAULT_UNTIL_COUNT,
            until_status: Regex::new(DEFAULT_STATUS_PATTERN)
                .expect("default status pattern compiles"),
            wait_between: DEFAULT_WAIT_BETWEEN_MS,
        }
    }
}

impl Poller {
    /// Decide whether another attempt should be made after attempt number
    /// `attempt` (1-based) produced `code`.
    ///
    /// `until_count` is a strict budget: at most `until_count` attempts are
    /// ever made, so the last permitted attempt never triggers a retry.
    pub fn should_retry(&self, attempt: i32, code: u16) -> bool {
        self.active
            && attempt >= 0
            && (attempt as u32) < self.until_count
            && !self.until_status.is_match(&code.to_string())
    }

    /// Parse a `key=value key=value` polling block (brackets stripped).
    /// Keys are case-insensitive; unknown keys are ignored.
    fn fill_from_block(&mut self, inner: &str) -> Result<(), String> {
        for piece in inner.split_whitespace() {
            let (key, value) = piece
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got: {}", piece))?;
            match key.to_ascii_lowercase().as_str() {
                "status" => {
                    self.until_status = Regex::new(value)
                        .map_err(|e| format!("invalid status pattern '{}': {}", value, e))?;
                }
                "count" => {
                    let count: u32 = value.parse().map_err(|_| {
                        format!("expected positive integer for count, got: {}", value)
                    })?;
                    if count == 0 {
                        return Err(format!(
                            "expected positive integer for count, got: {}",
                            value
                        ));
                    }
                    self.until_count = count;
                }
                "wait" => {
                    self.wait_between = value.parse().map_err(|_| {
                        format!("expected non-negative integer for wait, got: {}", value)
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "until status matches {}, up to {} attempts, {} ms between",
            self.until_status.as_str(),
            self.until_count,
            self.wait_between
        )
    }
}

/// An HTTP request blueprint decoded from a script block.
#[derive(Debug, Clone)]
pub struct RequestTarget {
    pub method: Method,
    pub url: Url,
    /// Body file, already resolved against the script's directory. The file
    /// is read at request time, so the server observes current contents.
    pub body_path: Option<PathBuf>,
    /// Case-insensitive, multi-valued header map copied into each request.
    pub headers: HeaderMap,
    pub poller: Poller,
}

impl RequestTarget {
    /// URL path with the query stripped, as recorded in results.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// One executable unit of a session script.
#[derive(Debug, Clone)]
pub enum Target {
    Request(RequestTarget),
    /// Pause for the given number of milliseconds. Zero is accepted and
    /// waits for nothing.
    Pause(u64),
    /// Free-form text echoed to the session log.
    Comment(String),
}

impl Target {
    /// Decode one raw action block. `start_line` is the 1-based source line
    /// of the block's first token; continuation-line errors are reported at
    /// `start_line` plus their offset. `script_dir` anchors `@body` paths.
    pub fn decode(raw: &str, start_line: usize, script_dir: &Path) -> Result<Target, LineError> {
        let lines: Vec<&str> = raw.lines().collect();
        let first = lines.first().map(|l| l.trim()).unwrap_or("");

        let mut head_split = first.splitn(2, char::is_whitespace);
        let head = head_split.next().unwrap_or("");
        let rest = head_split.next().map(str::trim);

        match head {
            "PAUSE" => {
                let arg = rest
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| LineError::new(start_line, "missing argument to PAUSE"))?;
                let millis: u64 = arg.parse().map_err(|_| {
                    LineError::new(
                        start_line,
                        format!("expected integer argument to PAUSE, got {}", arg),
                    )
                })?;
                Ok(Target::Pause(millis))
            }
            "COMMENT" => Ok(Target::Comment(rest.unwrap_or("").to_string())),
            _ => Self::decode_request(first, &lines, start_line, script_dir),
        }
    }

    fn decode_request(
        first: &str,
        lines: &[&str],
        start_line: usize,
        script_dir: &Path,
    ) -> Result<Target, LineError> {
        let bad = |offset: usize, reason: String| LineError::new(start_line + offset, reason);

        let mut tokens = first.split_whitespace();
        let mut method_token = tokens
            .next()
            .ok_or_else(|| bad(0, "empty action".to_string()))?;

        let mut poller = Poller::default();
        if method_token == "POLL" {
            poller.active = true;
            method_token = tokens
                .next()
                .ok_or_else(|| bad(0, "missing HTTP method after POLL".to_string()))?;
        }

        if !SUPPORTED_METHODS.contains(&method_token) {
            return Err(bad(0, format!("unsupported HTTP method: {}", method_token)));
        }
        // In-set tokens are always valid method names.
        let method = Method::from_bytes(method_token.as_bytes())
            .map_err(|e| bad(0, format!("unsupported HTTP method: {}", e)))?;

        let url_token = tokens
            .next()
            .ok_or_else(|| bad(0, format!("missing URL after {}", method_token)))?;
        if tokens.next().is_some() {
            return Err(bad(0, format!("unexpected text after URL: {}", first)));
        }
        let url = Url::parse(url_token)
            .map_err(|e| bad(0, format!("invalid URL {}: {}", url_token, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(bad(
                0,
                format!("invalid URL {}: expected http or https scheme", url_token),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut body_path = None;

        for (offset, line) in lines.iter().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(path) = line.strip_prefix('@') {
                let resolved = script_dir.join(path);
                let meta = std::fs::metadata(&resolved).map_err(|e| {
                    bad(offset, format!("invalid body file reference '{}': {}", path, e))
                })?;
                if !meta.is_file() {
                    return Err(bad(
                        offset,
                        format!("invalid body file reference '{}': not a regular file", path),
                    ));
                }
                body_path = Some(resolved);
            } else if let Some(block) = line.strip_prefix('[') {
                let inner = block.strip_suffix(']').ok_or_else(|| {
                    bad(
                        offset,
                        format!("bad poll parameters '{}': missing closing bracket", line),
                    )
                })?;
                poller
                    .fill_from_block(inner)
                    .map_err(|reason| bad(offset, format!("bad poll parameters '{}': {}", line, reason)))?;
            } else {
                let (name, value) = line.split_once(':').ok_or_else(|| {
                    bad(
                        offset,
                        format!("bad header '{}': expected two colon-delimited values", line),
                    )
                })?;
                let (name, value) = (name.trim(), value.trim());
                if name.is_empty() || value.is_empty() {
                    return Err(bad(
                        offset,
                        format!("bad header '{}': expected non-blank name and value", line),
                    ));
                }
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| bad(offset, format!("bad header '{}': {}", line, e)))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| bad(offset, format!("bad header '{}': {}", line, e)))?;
                headers.append(name, value);
            }
        }

        Ok(Target::Request(RequestTarget {
            method,
            url,
            body_path,
            headers,
            poller,
        }))
    }

    /// Render the target back to canonical script text. Parsing the
    /// canonical form yields an equivalent target.
    pub fn canonical(&self) -> String {
        match self {
            Target::Pause(millis) => format!("PAUSE {}", millis),
            Target::Comment(text) => format!("COMMENT {}", text),
            Target::Request(req) => {
                let mut out = String::new();
                if req.poller.active {
                    out.push_str("POLL ");
                }
                out.push_str(req.method.as_str());
                out.push(' ');
                out.push_str(req.url.as_str());
                for (name, value) in req.headers.iter() {
                    out.push('\n');
                    out.push_str(name.as_str());
                    out.push_str(": ");
                    out.push_str(value.to_str().unwrap_or_default());
                }
                if let Some(path) = &req.body_path {
                    out.push_str(&format!("\n@{}", path.display()));
                }
                if req.poller.active {
                    out.push_str(&format!(
                        "\n[status={} count={} wait={}]",
                        req.poller.until_status.as_str(),
                        req.poller.until_count,
                        req.poller.wait_between
                    ));
                }
                out
            }
        }
    }
}
