//! Issues reported by graph checks

use phpcfg_core::DiagnosticSeverity;
use std::path::PathBuf;

/// Severity level for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Error - the code cannot behave as written
    Error,
    /// Warning - should be reviewed
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

impl From<DiagnosticSeverity> for Severity {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::Error => Severity::Error,
            DiagnosticSeverity::Warning => Severity::Warning,
        }
    }
}

/// A single issue found during analysis
#[derive(Debug, Clone)]
pub struct Issue {
    /// The check that found this issue (e.g., "deadCode.unreachable")
    pub check_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Finer-grained identifier, e.g. the diagnostic code behind `builder.diagnostic`
    pub identifier: Option<String>,
    /// Routine the issue was found in (`{main}`, `foo`, `Foo::bar`, ...)
    pub routine: Option<String>,
    /// Optional tip for fixing the issue
    pub tip: Option<String>,
}

impl Issue {
    /// Create a new error issue
    pub fn error(
        check_id: impl Into<String>,
        message: impl Into<String>,
        file: PathBuf,
        line: usize,
        column: usize,
    ) -> Self {
        Self::new(check_id, Severity::Error, message, file, line, column)
    }

    /// Create a new warning issue
    pub fn warning(
        check_id: impl Into<String>,
        message: impl Into<String>,
        file: PathBuf,
        line: usize,
        column: usize,
    ) -> Self {
        Self::new(check_id, Severity::Warning, message, file, line, column)
    }

    pub fn new(
        check_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file: PathBuf,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            severity,
            message: message.into(),
            file,
            line,
            column,
            identifier: None,
            routine: None,
            tip: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_routine(mut self, routine: impl Into<String>) -> Self {
        self.routine = Some(routine.into());
        self
    }

    /// Add a tip for fixing
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }
}

/// Collection of issues from analysis
#[derive(Debug, Default)]
pub struct IssueCollection {
    issues: Vec<Issue>,
}

impl IssueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Drop issues raised by the given checks.
    pub fn retain_checks(&mut self, disabled: &[String]) {
        self.issues.retain(|issue| !disabled.iter().any(|id| id == &issue.check_id));
    }

    /// Sort issues by file, then line, then column
    pub fn sort(&mut self) {
        self.issues.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.line.cmp(&b.line))
                .then_with(|| a.column.cmp(&b.column))
                .then_with(|| a.check_id.cmp(&b.check_id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_creation() {
        let issue = Issue::error(
            "label.undefined",
            "Label 'end' is used but never defined.",
            PathBuf::from("/test.php"),
            10,
            5,
        )
        .with_routine("foo")
        .with_identifier("goto.undefinedLabel")
        .with_tip("Declare the label with `end:`");

        assert_eq!(issue.check_id, "label.undefined");
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.line, 10);
        assert_eq!(issue.routine.as_deref(), Some("foo"));
        assert_eq!(issue.identifier, Some("goto.undefinedLabel".to_string()));
    }

    #[test]
    fn test_issue_collection() {
        let mut collection = IssueCollection::new();
        collection.add(Issue::error("test", "Error 1", PathBuf::from("/a.php"), 1, 1));
        collection.add(Issue::warning("test", "Warning 1", PathBuf::from("/b.php"), 2, 1));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.error_count(), 1);
        assert_eq!(collection.warning_count(), 1);
    }

    #[test]
    fn test_sort_and_retain() {
        let mut collection = IssueCollection::new();
        collection.add(Issue::warning("label.unused", "b", PathBuf::from("/a.php"), 9, 1));
        collection.add(Issue::error("deadCode.unreachable", "a", PathBuf::from("/a.php"), 3, 1));
        collection.sort();
        assert_eq!(collection.issues()[0].line, 3);

        collection.retain_checks(&["label.unused".to_string()]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.issues()[0].check_id, "deadCode.unreachable");
    }

    #[test]
    fn test_severity_from_diagnostic() {
        assert_eq!(Severity::from(DiagnosticSeverity::Warning), Severity::Warning);
        assert_eq!(Severity::from(DiagnosticSeverity::Error), Severity::Error);
    }
}
