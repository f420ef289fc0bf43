//! Check for code that no path from the routine entry reaches

use crate::checks::{Check, CheckContext};
use crate::issue::{Issue, Severity};
use crate::RoutineGraph;
use mago_span::Span;
use phpcfg_core::bound::BoundStmtKind;
use phpcfg_core::{BasicBlock, BlockId, ControlFlowGraph};
use std::collections::HashSet;

pub struct UnreachableCodeCheck;

impl Check for UnreachableCodeCheck {
    fn id(&self) -> &'static str {
        "deadCode.unreachable"
    }

    fn description(&self) -> &'static str {
        "Detects statements that can never be executed"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        unreachable_regions(&routine.graph)
            .into_iter()
            .map(|span| {
                ctx.issue(
                    self.id(),
                    Severity::Error,
                    "Unreachable statement - code above always terminates.",
                    span,
                )
            })
            .collect()
    }
}

/// The first code of every unreachable region.
///
/// Dead blocks are taken in source order of their first code. Each one not
/// yet covered is reported, and every dead block reachable from it is
/// absorbed into its region.
fn unreachable_regions(graph: &ControlFlowGraph) -> Vec<Span> {
    let mut candidates: Vec<(Span, BlockId)> = graph
        .unreachable_blocks()
        .iter()
        .filter_map(|id| first_code(graph.block(*id)).map(|span| (span, *id)))
        .collect();
    candidates.sort_by_key(|(span, id)| (span.start.offset, *id));

    let mut covered = HashSet::new();
    let mut regions = Vec::new();

    for (span, id) in candidates {
        if covered.contains(&id) {
            continue;
        }
        regions.push(span);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !covered.insert(current) {
                continue;
            }
            stack.extend(
                graph
                    .successors(current)
                    .into_iter()
                    .filter(|next| graph.block(*next).is_dead()),
            );
        }
    }

    regions
}

fn first_code(block: &BasicBlock) -> Option<Span> {
    block
        .statements()
        .iter()
        .find(|stmt| !matches!(stmt.kind, BoundStmtKind::Empty))
        .map(|stmt| stmt.span)
        .or_else(|| {
            block
                .edge()
                .and_then(|edge| edge.expressions().first().map(|expr| expr.span))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run_check;

    #[test]
    fn test_code_after_return() {
        let issues = run_check(
            &UnreachableCodeCheck,
            "<?php\nfunction foo() {\n    return 1;\n    echo 'never';\n    echo 'again';\n}\n",
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 4);
        assert_eq!(issues[0].column, 5);
        assert_eq!(issues[0].check_id, "deadCode.unreachable");
    }

    #[test]
    fn test_code_after_throw_and_exit() {
        let issues = run_check(
            &UnreachableCodeCheck,
            "<?php\nfunction a() {\n    throw new Exception('x');\n    echo 1;\n}\nfunction b() {\n    exit();\n    echo 2;\n}\n",
        );
        let lines: Vec<_> = issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![4, 8]);
    }

    #[test]
    fn test_dead_loop_is_one_region() {
        let issues = run_check(
            &UnreachableCodeCheck,
            "<?php\nfunction foo() {\n    return;\n    while (true) {\n        echo 1;\n    }\n}\n",
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 4);
    }

    #[test]
    fn test_code_after_infinite_loop() {
        let issues = run_check(&UnreachableCodeCheck, "<?php\nfor (;;) {\n    echo 1;\n}\necho 2;\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 5);
    }

    #[test]
    fn test_break_keeps_following_code_live() {
        let issues = run_check(
            &UnreachableCodeCheck,
            "<?php\nwhile (true) {\n    if ($x) {\n        break;\n    }\n}\necho 2;\n",
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_reachable_code() {
        let issues = run_check(
            &UnreachableCodeCheck,
            "<?php\nfunction foo($x) {\n    if ($x) {\n        return 1;\n    }\n    return 2;\n}\n",
        );
        assert!(issues.is_empty());
    }
}
