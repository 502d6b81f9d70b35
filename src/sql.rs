//! SQL text handling.
//!
//! Query files are written for humans: line comments, indentation, blank
//! lines. Before a query is handed to `vsql -c` it is flattened to one line
//! with comments removed.

use crate::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--[^\n]*").expect("valid regex"))
}

fn line_break_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\n+\s*").expect("valid regex"))
}

/// Removes `--` comments through end of line. Line breaks are kept.
///
/// `--` inside string literals is not special-cased.
pub fn strip_comments(text: &str) -> String {
    line_comment().replace_all(text, "").into_owned()
}

/// Replaces every line break, with the blanks around it, by a single space.
pub fn single_line(text: &str) -> String {
    line_break_run().replace_all(text, " ").into_owned()
}

/// Comment-free, single-line form of `text`, trimmed.
pub fn sanitize(text: &str) -> String {
    single_line(&strip_comments(text)).trim().to_string()
}

/// SQL text read from a query file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText {
    raw: String,
}

impl QueryText {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Reads a query file.
    pub fn read(path: &Path) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    /// The query exactly as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The query as embedded into a `vsql -c` argument.
    pub fn sanitized(&self) -> String {
        sanitize(&self.raw)
    }

    /// True when nothing but comments and whitespace remain.
    pub fn is_blank(&self) -> bool {
        self.sanitized().is_empty()
    }
}
