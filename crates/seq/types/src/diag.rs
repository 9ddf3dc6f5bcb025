//! Diagnostics: spans, severities, and stable codes
//!
//! Every problem the toolchain can report travels through this one shape.
//! The parser and compiler never abort on bad input; they return a
//! best-effort result plus a `Vec<Diagnostic>`, and the caller decides what
//! severity is fatal for its purpose.

use serde::{Deserialize, Serialize};

// ── Spans ────────────────────────────────────────────────────────────

/// A half-open byte range into the source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span anchored at one position
    pub fn empty(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The smallest span covering both operands
    pub fn join(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ── Diagnostics ──────────────────────────────────────────────────────

/// How serious a diagnostic is
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One reported problem, anchored to a source span when one is known
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable machine-readable code from [`codes`]
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), span }
    }

    pub fn warn(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), span }
    }

    pub fn info(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self { severity: Severity::Info, code, message: message.into(), span }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} [{}] {} ({})", self.severity, self.code, self.message, span),
            None => write!(f, "{} [{}] {}", self.severity, self.code, self.message),
        }
    }
}

/// Stable diagnostic codes.
///
/// Codes are part of the external surface: downstream tools key on them, so
/// existing values must not be renumbered.
pub mod codes {
    /// Unparseable span turned into a syntax error node
    pub const PARSER_SYNTAX: &str = "P001";
    /// A command stem contained a disallowed character
    pub const PARSER_BAD_STEM: &str = "P002";
    /// A directive appeared where it cannot apply
    pub const PARSER_STRAY_DIRECTIVE: &str = "P003";

    /// Malformed time literal
    pub const TIME_FORMAT: &str = "T001";
    /// Normalized time exceeds the dialect maximum
    pub const TIME_MAX_RANGE: &str = "T002";
    /// Valid but unbalanced time literal; message carries the suggestion
    pub const TIME_UNBALANCED: &str = "T003";
    /// Step line had no usable time tag
    pub const TIME_MISSING: &str = "T004";

    /// Argument value outside the dictionary range
    pub const ARG_RANGE: &str = "A001";
    /// Symbol is not a member of the argument's enumeration
    pub const ARG_ENUM: &str = "A002";
    /// Repeat-group occurrence count or tuple width mismatch
    pub const ARG_ARITY: &str = "A003";
    /// Literal kind does not match the dictionary argument kind
    pub const ARG_TYPE: &str = "A004";
    /// Symbol does not name a declared variable
    pub const ARG_UNDECLARED: &str = "A005";

    /// Hardware commands take no arguments; extras were dropped
    pub const COMPILE_HW_ARGS: &str = "C001";
    /// Request block structure problem (unmatched begin or end)
    pub const COMPILE_REQUEST: &str = "C002";
    /// Ground-epoch tag missing its quoted epoch name
    pub const COMPILE_EPOCH_NAME: &str = "C003";
    /// Attachment directive with no step to attach to
    pub const COMPILE_ATTACH: &str = "C004";
    /// Duplicate declaration or directive
    pub const COMPILE_DUPLICATE: &str = "C005";
}
