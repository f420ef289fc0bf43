//! Checks for `goto` labels

use crate::checks::{Check, CheckContext};
use crate::issue::{Issue, Severity};
use crate::RoutineGraph;

/// `goto` to a label the routine never defines.
pub struct UndefinedLabelCheck;

impl Check for UndefinedLabelCheck {
    fn id(&self) -> &'static str {
        "label.undefined"
    }

    fn description(&self) -> &'static str {
        "Detects goto statements targeting an undefined label"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        routine
            .graph
            .labels()
            .iter()
            .filter(|(_, info)| info.is_used() && !info.is_defined())
            .map(|(name, info)| {
                ctx.issue(self.id(), Severity::Error, format!("'goto' to undefined label '{}'.", name), info.span)
                    .with_tip(format!("Define the label with `{}:` in the same routine.", name))
            })
            .collect()
    }
}

/// A label defined more than once.
pub struct RedefinedLabelCheck;

impl Check for RedefinedLabelCheck {
    fn id(&self) -> &'static str {
        "label.redefined"
    }

    fn description(&self) -> &'static str {
        "Detects labels defined more than once in a routine"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        routine
            .graph
            .labels()
            .iter()
            .filter(|(_, info)| info.is_redefined())
            .map(|(name, info)| ctx.issue(self.id(), Severity::Error, format!("Label '{}' already defined.", name), info.span))
            .collect()
    }
}

/// A label no `goto` targets.
pub struct UnusedLabelCheck;

impl Check for UnusedLabelCheck {
    fn id(&self) -> &'static str {
        "label.unused"
    }

    fn description(&self) -> &'static str {
        "Detects labels that are never the target of a goto"
    }

    fn check(&self, routine: &RoutineGraph, ctx: &CheckContext<'_>) -> Vec<Issue> {
        routine
            .graph
            .labels()
            .iter()
            .filter(|(_, info)| info.is_defined() && !info.is_used())
            .map(|(name, info)| {
                ctx.issue(self.id(), Severity::Warning, format!("Label '{}' is never used.", name), info.span)
            })
            .collect()
    }
}
