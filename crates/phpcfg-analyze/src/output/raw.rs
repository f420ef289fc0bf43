//! Raw output format
//!
//! Format: file:line:message
//!
//! One issue per line, no headers and no summary.

use super::Formatter;
use crate::issue::IssueCollection;

pub struct RawFormatter;

impl Formatter for RawFormatter {
    fn format(&self, issues: &IssueCollection) -> String {
        let mut output = String::new();

        // Sort issues by file then line for consistent output
        let mut sorted_issues: Vec<_> = issues.issues().iter().collect();
        sorted_issues.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.line.cmp(&b.line))
                .then_with(|| a.column.cmp(&b.column))
        });

        for issue in sorted_issues {
            output.push_str(&format!(
                "{}:{}:{}\n",
                issue.file.display(),
                issue.line,
                issue.message
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Issue;
    use std::path::PathBuf;

    #[test]
    fn test_raw_format() {
        let mut issues = IssueCollection::new();
        issues.add(Issue::warning(
            "label.unused",
            "Label 'end' is never used.",
            PathBuf::from("/path/to/file.php"),
            12,
            1,
        ));
        issues.add(Issue::error(
            "deadCode.unreachable",
            "Unreachable statement - code above always terminates.",
            PathBuf::from("/path/to/file.php"),
            10,
            5,
        ));

        let formatter = RawFormatter;
        let output = formatter.format(&issues);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "/path/to/file.php:10:Unreachable statement - code above always terminates.");
        assert!(lines[1].starts_with("/path/to/file.php:12:"));
    }
}
