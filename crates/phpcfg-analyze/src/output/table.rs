//! Table output format (default, human-readable)

use super::Formatter;
use crate::issue::{Issue, IssueCollection, Severity};
use std::collections::BTreeMap;

pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format(&self, issues: &IssueCollection) -> String {
        if issues.is_empty() {
            return " [OK] No errors\n".to_string();
        }

        let mut output = String::new();

        // Group by file, in path order
        let mut files: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
        for issue in issues.issues() {
            let path = issue.file.display().to_string();
            files.entry(path).or_default().push(issue);
        }

        for (file_path, file_issues) in &files {
            output.push_str(&format!("\n -- {} --\n\n", file_path));

            for issue in file_issues {
                let severity_marker = match issue.severity {
                    Severity::Error => "ERROR",
                    Severity::Warning => "WARNING",
                };

                output.push_str(&format!(
                    " {} Line {}: {}",
                    severity_marker,
                    issue.line,
                    issue.message
                ));
                if let Some(routine) = &issue.routine {
                    output.push_str(&format!(" (in {})", routine));
                }
                output.push('\n');

                if let Some(tip) = &issue.tip {
                    output.push_str(&format!("       Tip: {}\n", tip));
                }
            }
        }

        // Summary
        output.push_str(&format!(
            "\n [ERROR] Found {} error{}\n",
            issues.error_count(),
            if issues.error_count() == 1 { "" } else { "s" }
        ));

        if issues.warning_count() > 0 {
            output.push_str(&format!(
                " [WARNING] Found {} warning{}\n",
                issues.warning_count(),
                if issues.warning_count() == 1 { "" } else { "s" }
            ));
        }

        output
    }
}
