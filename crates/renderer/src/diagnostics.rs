//! Maps driver compile logs back onto the user's own source lines.
//!
//! Drivers report line numbers of the wrapped fragment source. Subtracting the
//! template header turns them into lines of the document the user edits. Three
//! log dialects are understood, tried in order:
//!
//! - ANGLE / WebGL style: `ERROR: 0:12: 'x' : undeclared identifier`
//! - Mesa: `0:12(5): error: 'x' undeclared`
//! - NVIDIA: `0(12) : error C1008: undefined variable "x"`
//!
//! Anything else is handed back untouched.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Diagnostic pinned to a line of the user's source.
///
/// `line` may be zero or negative when the driver blames the template
/// preamble; it is reported as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedError {
    pub line: i64,
    pub message: String,
}

/// What the error callback receives for a failed eval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShaderDiagnostic {
    Located(ParsedError),
    Raw { text: String },
}

impl ShaderDiagnostic {
    pub fn line(&self) -> Option<i64> {
        match self {
            ShaderDiagnostic::Located(parsed) => Some(parsed.line),
            ShaderDiagnostic::Raw { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ShaderDiagnostic::Located(parsed) => &parsed.message,
            ShaderDiagnostic::Raw { text } => text,
        }
    }
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderDiagnostic::Located(parsed) => write!(f, "line {}: {}", parsed.line, parsed.message),
            ShaderDiagnostic::Raw { text } => f.write_str(text.trim_end()),
        }
    }
}

fn patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"ERROR:\s+\d+:(\d+):\s+(.+)",
            r"(?m)^\s*\d+:(\d+)\(\d+\):\s*error:\s*(.+)",
            r"(?m)^\s*\d+\((\d+)\)\s*:\s*error\s*\w*:\s*(.+)",
        ]
        .map(|pattern| Regex::new(pattern).expect("diagnostic pattern is valid"))
    })
}

/// Translates a driver log into a user-relative diagnostic.
///
/// Falls back to the raw text when no known dialect matches or the line
/// number cannot be represented.
pub fn translate(diagnostic: &str, header_lines: usize) -> ShaderDiagnostic {
    for pattern in patterns() {
        let Some(captures) = pattern.captures(diagnostic) else {
            continue;
        };
        let line = match captures[1].parse::<i64>() {
            Ok(line) => line,
            Err(err) => {
                tracing::debug!(%err, "diagnostic line number out of range; keeping raw text");
                break;
            }
        };
        return ShaderDiagnostic::Located(ParsedError {
            line: line - header_lines as i64,
            message: captures[2].trim_end().to_string(),
        });
    }
    ShaderDiagnostic::Raw {
        text: diagnostic.to_string(),
    }
}
