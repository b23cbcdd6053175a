//! Session script parsing and the ordered action model.
//!
//! A script is a plain-text file describing what one simulated user does:
//! HTTP requests (optionally polled), pauses, and comments. This module
//! turns script text into a validated, ordered [`SessionScript`] with
//! line-precise diagnostics.
//!
//! Two validation modes exist:
//!
//! - **Strict** ([`SessionScript::parse`]) stops at the first error and is
//!   what the session runner uses.
//! - **Tolerant** ([`SessionScript::check`]) attaches errors to the
//!   offending actions and keeps going, which is what `korra validate`
//!   reports from.

mod error;
mod scan;
mod target;

use std::path::Path;

pub use error::{LineError, ScriptError};
pub use target::{Poller, RequestTarget, Target, SUPPORTED_METHODS};

use scan::scan_actions;

/// One entry in a script: the raw block text, its 1-based start line, and
/// either the decoded target or the validation error.
#[derive(Debug, Clone)]
pub struct SessionAction {
    pub raw: String,
    pub line: usize,
    pub target: Option<Target>,
    pub error: Option<LineError>,
}

impl SessionAction {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// An ordered list of actions plus the runner's cursor.
#[derive(Debug, Clone)]
pub struct SessionScript {
    actions: Vec<SessionAction>,
    current: usize,
}

impl SessionScript {
    /// Strict parse: returns the first validation error.
    pub fn parse(text: &str, script_dir: &Path) -> Result<Self, LineError> {
        let mut actions = Vec::new();
        for block in scan_actions(text) {
            let target = Target::decode(&block.raw, block.line, script_dir)?;
            actions.push(SessionAction {
                raw: block.raw,
                line: block.line,
                target: Some(target),
                error: None,
            });
        }
        Ok(Self {
            actions,
            current: 0,
        })
    }

    /// Tolerant parse: every action is returned, carrying its own error if
    /// decoding failed.
    pub fn check(text: &str, script_dir: &Path) -> Self {
        let actions = scan_actions(text)
            .into_iter()
            .map(|block| match Target::decode(&block.raw, block.line, script_dir) {
                Ok(target) => SessionAction {
                    raw: block.raw,
                    line: block.line,
                    target: Some(target),
                    error: None,
                },
                Err(error) => SessionAction {
                    raw: block.raw,
                    line: block.line,
                    target: None,
                    error: Some(error),
                },
            })
            .collect();
        Self {
            actions,
            current: 0,
        }
    }

    /// Strict parse of a script file; `@body` paths resolve against the
    /// file's parent directory.
    pub fn parse_file(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|error| ScriptError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, dir).map_err(|error| ScriptError::Invalid {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Tolerant parse of a script file.
    pub fn check_file(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|error| ScriptError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::check(&text, dir))
    }

    /// Merge run-wide default headers into every request target. Script
    /// headers stay in place; defaults accumulate alongside them.
    pub fn apply_default_headers(&mut self, headers: &reqwest::header::HeaderMap) {
        if headers.is_empty() {
            return;
        }
        for action in &mut self.actions {
            if let Some(Target::Request(request)) = action.target.as_mut() {
                for (name, value) in headers.iter() {
                    request.headers.append(name.clone(), value.clone());
                }
            }
        }
    }

    pub fn actions(&self) -> &[SessionAction] {
        &self.actions
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// True iff no action carries a validation error.
    pub fn is_valid(&self) -> bool {
        self.actions.iter().all(SessionAction::is_valid)
    }

    /// True while the cursor has not consumed every action.
    pub fn remains(&self) -> bool {
        self.current < self.actions.len()
    }

    /// 0-based cursor position; advances monotonically.
    pub fn cursor(&self) -> usize {
        self.current
    }

    /// Yield the next action and advance the cursor.
    pub fn advance(&mut self) -> Option<&SessionAction> {
        if self.current < self.actions.len() {
            let action = &self.actions[self.current];
            self.current += 1;
            Some(action)
        } else {
            None
        }
    }

    /// Human label for log lines, e.g. `3 of 7`. Positions are 1-based and
    /// clamped to the action count.
    pub fn progress_label(&self) -> String {
        let shown = (self.current + 1).min(self.actions.len().max(1));
        format!("{} of {}", shown, self.actions.len())
    }
}
