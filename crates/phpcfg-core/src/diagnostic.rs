//! Diagnostics recorded while binding and building a routine

use mago_span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A problem in the PHP source found during graph construction.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub span: Span,
    pub severity: DiagnosticSeverity,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            severity: DiagnosticSeverity::Error,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            severity: DiagnosticSeverity::Warning,
        }
    }
}

pub const BREAK_INVALID_LEVEL: &str = "break.invalidLevel";
pub const BREAK_NON_CONSTANT_LEVEL: &str = "break.nonConstantLevel";
pub const BREAK_OUTSIDE_LOOP: &str = "break.outsideLoop";
pub const ARRAY_APPEND_READ: &str = "array.appendRead";
pub const UNSUPPORTED_SYNTAX: &str = "unsupported.syntax";
