//! Diagnostics recorded while binding and building the graph

use crate::checks::{Check, CheckContext};
use crate::issue::Issue;
use crate::RoutineGraph;

pub struct BuilderDiagnosticCheck;

impl Check for BuilderDiagnosticCheck {
    fn id(&self) -> &'static str {
        "builder.diagnostic"
    }

    fn description(&self) -> &'static str {
        "Reports invalid break levels, reads of appended array items and unsupported syntax"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        routine
            .graph
            .diagnostics()
            .iter()
            .map(|diagnostic| {
                ctx.issue(self.id(), diagnostic.severity.into(), diagnostic.message.clone(), diagnostic.span)
                    .with_identifier(diagnostic.code)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run_check;
    use crate::issue::Severity;

    #[test]
    fn test_break_outside_loop() {
        let issues = run_check(&BuilderDiagnosticCheck, "<?php\nfunction foo() {\n    break;\n}\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].identifier.as_deref(), Some("break.outsideLoop"));
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].line, 3);
    }

    #[test]
    fn test_break_level_too_deep() {
        let issues = run_check(&BuilderDiagnosticCheck, "<?php\nwhile ($a) {\n    break 2;\n}\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].identifier.as_deref(), Some("break.outsideLoop"));
    }

    #[test]
    fn test_valid_code_has_no_diagnostics() {
        let issues = run_check(
            &BuilderDiagnosticCheck,
            "<?php\nforeach ([1, 2] as $k => $v) {\n    if ($v) { continue; }\n    $a[] = $v;\n}\n",
        );
        assert!(issues.is_empty());
    }
}
