//! Flag value parsing utilities.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

use super::ConfigError;

/// Parse a duration string: `500ms`, `30s`, `2m`, `1h`, or plain seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let (num_str, unit) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, "ms")
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, "s")
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, "m")
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, "h")
    } else {
        // Plain number of seconds.
        return s
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("invalid duration: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    Ok(match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num * 60),
        _ => Duration::from_secs(num * 3600),
    })
}

/// Parse a `Name: value` (or `Name:value`) header flag.
pub fn parse_header(spec: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let (name, value) = spec.split_once(':').ok_or_else(|| ConfigError::Invalid {
        flag: "header".to_string(),
        message: format!("'{}' must be 'Name: value'", spec),
    })?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(ConfigError::Invalid {
            flag: "header".to_string(),
            message: format!("'{}' must have a non-blank name and value", spec),
        });
    }
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ConfigError::parse("header", spec, e))?;
    let value = HeaderValue::from_str(value).map_err(|e| ConfigError::parse("header", spec, e))?;
    Ok((name, value))
}

/// Parse a local bind address flag.
pub fn parse_local_addr(spec: &str) -> Result<IpAddr, ConfigError> {
    spec.parse().map_err(|e| ConfigError::parse("laddr", spec, e))
}
