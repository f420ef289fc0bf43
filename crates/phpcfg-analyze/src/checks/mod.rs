//! Checks run over the control flow graph of each routine

mod catch_type;
mod dead_code;
mod diagnostics;
mod labels;

pub use catch_type::UnknownCatchTypeCheck;
pub use dead_code::UnreachableCodeCheck;
pub use diagnostics::BuilderDiagnosticCheck;
pub use labels::{RedefinedLabelCheck, UndefinedLabelCheck, UnusedLabelCheck};

use crate::frontend::LineIndex;
use crate::issue::{Issue, Severity};
use crate::RoutineGraph;
use mago_span::Span;
use phpcfg_core::TypeTable;
use std::path::Path;

/// Context provided to checks during analysis
pub struct CheckContext<'a> {
    /// The file being analyzed
    pub file_path: &'a Path,
    /// The source code
    pub source: &'a str,
    pub lines: &'a LineIndex,
    /// Class-likes declared across the whole run, plus builtins
    pub types: &'a TypeTable,
}

impl CheckContext<'_> {
    /// Build an issue located at the start of `span`.
    pub fn issue(&self, check_id: &str, severity: Severity, message: impl Into<String>, span: Span) -> Issue {
        let (line, column) = self.lines.line_col(self.source, span.start.offset as usize);
        Issue::new(check_id, severity, message, self.file_path.to_path_buf(), line, column)
    }
}

/// Trait for graph checks
pub trait Check: Send + Sync {
    /// Unique identifier for this check (e.g., "label.undefined")
    fn id(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Run the check on one routine and return any issues found
    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue>;
}

/// Registry of all available checks
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in checks
    pub fn with_builtin_checks() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(UnreachableCodeCheck));
        registry.register(Box::new(UndefinedLabelCheck));
        registry.register(Box::new(RedefinedLabelCheck));
        registry.register(Box::new(UnusedLabelCheck));
        registry.register(Box::new(UnknownCatchTypeCheck));
        registry.register(Box::new(BuilderDiagnosticCheck));

        registry
    }

    /// Register a check
    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    /// Checks whose id is not in `disabled`
    pub fn enabled_checks(&self, disabled: &[String]) -> Vec<&dyn Check> {
        self.checks
            .iter()
            .filter(|c| !disabled.iter().any(|id| id == c.id()))
            .map(|c| c.as_ref())
            .collect()
    }

    /// Get all registered checks
    pub fn all_checks(&self) -> Vec<&dyn Check> {
        self.checks.iter().map(|c| c.as_ref()).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::frontend::parse_source;
    use phpcfg_core::{GraphBuilder, RoutineSymbols};

    /// Run one check over every routine of a PHP snippet.
    pub fn run_check(check: &dyn Check, source: &str) -> Vec<Issue> {
        let path = Path::new("test.php");
        let (file, error) = parse_source(path, source);
        assert!(error.is_none(), "unexpected parse error: {:?}", error);

        let mut types = TypeTable::with_builtins();
        for declaration in &file.declarations {
            types.declare(&declaration.name, declaration.parent.clone(), declaration.fields.clone());
        }
        let lines = LineIndex::new(source);
        let ctx = CheckContext { file_path: path, source, lines: &lines, types: &types };

        let mut issues = Vec::new();
        for routine in file.routines {
            let symbols = RoutineSymbols::for_routine(&types, &routine);
            let graph = GraphBuilder::build(&routine, &symbols);
            issues.extend(check.check(&RoutineGraph { routine, graph }, &ctx));
        }
        issues
    }
}
