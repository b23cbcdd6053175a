//! Line scanner that groups script text into raw action blocks.
//!
//! The grammar is line-oriented: an action starts on the first non-blank,
//! non-`//` line and collects continuation lines until the next blank line,
//! internal comment, or the start of another action. Deciding "start of
//! another action" requires looking at the next line without consuming it,
//! so the scanner wraps a line iterator with a one-slot pushback.

use super::target::SUPPORTED_METHODS;

/// One grouped action: the joined lines and the 1-based line number of the
/// first token in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAction {
    pub raw: String,
    pub line: usize,
}

/// Line iterator with single-line lookahead.
struct PeekingLines<'a> {
    lines: std::str::Lines<'a>,
    peeked: Option<&'a str>,
    /// Number of the most recently consumed line (1-based; 0 before the first).
    consumed: usize,
}

impl<'a> PeekingLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            peeked: None,
            consumed: 0,
        }
    }

    /// Consume and return the next line.
    fn next_line(&mut self) -> Option<&'a str> {
        let line = match self.peeked.take() {
            Some(line) => Some(line),
            None => self.lines.next(),
        };
        if line.is_some() {
            self.consumed += 1;
        }
        line
    }

    /// Look at the next line without consuming it.
    fn peek(&mut self) -> Option<&'a str> {
        if self.peeked.is_none() {
            self.peeked = self.lines.next();
        }
        self.peeked
    }

    fn line_number(&self) -> usize {
        self.consumed
    }
}

fn is_internal_comment(line: &str) -> bool {
    line.starts_with("//")
}

/// True when the line opens a new action: `PAUSE`, `COMMENT`, an HTTP
/// method, or `POLL` followed by an HTTP method.
fn is_action_start(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    let first = match tokens.next() {
        Some(t) => t,
        None => return false,
    };
    match first {
        "PAUSE" | "COMMENT" => true,
        "POLL" => matches!(tokens.next(), Some(t) if SUPPORTED_METHODS.contains(&t)),
        other => SUPPORTED_METHODS.contains(&other),
    }
}

/// True for commands that are complete on their first line and never
/// absorb continuation lines.
fn is_single_line(line: &str) -> bool {
    matches!(
        line.split_whitespace().next(),
        Some("PAUSE") | Some("COMMENT")
    )
}

/// Group script text into raw action blocks.
///
/// Blank lines and `//` comments are discarded; they terminate the action
/// being collected. A line that opens a new action terminates the current
/// one but stays in the scanner for the next round.
pub fn scan_actions(text: &str) -> Vec<RawAction> {
    let mut actions = Vec::new();
    let mut scanner = PeekingLines::new(text);

    while let Some(line) = scanner.next_line() {
        let line = line.trim();
        if line.is_empty() || is_internal_comment(line) {
            continue;
        }

        let start = scanner.line_number();
        let mut current = vec![line.to_string()];

        if !is_single_line(line) {
            while let Some(next) = scanner.peek() {
                let next = next.trim();
                if next.is_empty() || is_internal_comment(next) {
                    scanner.next_line();
                    break;
                }
                if is_action_start(next) {
                    break;
                }
                scanner.next_line();
                current.push(next.to_string());
            }
        }

        actions.push(RawAction {
            raw: current.join("\n"),
            line: start,
        });
    }

    actions
}
