//! Check for catch clauses naming classes that cannot be resolved

use crate::checks::{Check, CheckContext};
use crate::issue::{Issue, Severity};
use crate::RoutineGraph;

pub struct UnknownCatchTypeCheck;

impl Check for UnknownCatchTypeCheck {
    fn id(&self) -> &'static str {
        "catch.unknownType"
    }

    fn description(&self) -> &'static str {
        "Detects caught classes that are neither declared nor builtin"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        routine
            .graph
            .blocks()
            .iter()
            .filter_map(|block| block.catch_info())
            .flat_map(|info| info.types.iter())
            .filter(|caught| caught.handle.is_none())
            .map(|caught| {
                ctx.issue(
                    self.id(),
                    Severity::Warning,
                    format!("Caught class {} not found.", caught.name),
                    caught.span,
                )
                .with_tip("Check the class name and its `use` import.")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run_check;

    #[test]
    fn test_builtin_and_declared_types_resolve() {
        let issues = run_check(
            &UnknownCatchTypeCheck,
            "<?php\nclass MyError extends Exception {}\ntry { f(); } catch (MyError | RuntimeException $e) { } catch (Throwable) { }\n",
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let issues = run_check(
            &UnknownCatchTypeCheck,
            "<?php\nfunction foo() {\n    try {\n        bar();\n    } catch (NoSuchException $e) {\n    }\n}\n",
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("NoSuchException"));
        assert_eq!(issues[0].line, 5);
    }

    #[test]
    fn test_nested_try_in_loop() {
        let issues = run_check(
            &UnknownCatchTypeCheck,
            "<?php\nforeach ($items as $item) {\n    try { f($item); } catch (Missing $e) { }\n}\n",
        );
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_catch_after_return_still_checked() {
        let issues = run_check(
            &UnknownCatchTypeCheck,
            "<?php
function f() {
    return;
    try { g(); } catch (Gone $e) { } catch (Exception $e) { }
}
",
        );
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("Gone"));
        assert_eq!(issues[0].line, 4);
    }
}
