//! JSON output format

use super::Formatter;
use crate::issue::{Issue, IssueCollection, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput {
    totals: Totals,
    files: BTreeMap<String, FileErrors>,
}

#[derive(Serialize)]
struct Totals {
    errors: usize,
    warnings: usize,
    file_errors: usize,
}

#[derive(Serialize)]
struct FileErrors {
    errors: usize,
    warnings: usize,
    messages: Vec<FileMessage>,
}

#[derive(Serialize)]
struct FileMessage {
    message: String,
    line: usize,
    column: usize,
    severity: String,
    check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    routine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tip: Option<String>,
}

impl Formatter for JsonFormatter {
    fn format(&self, issues: &IssueCollection) -> String {
        let mut files: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();

        // Group issues by file
        for issue in issues.issues() {
            let path = issue.file.display().to_string();
            files.entry(path).or_default().push(issue);
        }

        let file_errors: BTreeMap<String, FileErrors> = files
            .into_iter()
            .map(|(path, path_issues)| {
                let errors = path_issues
                    .iter()
                    .filter(|i| i.severity == Severity::Error)
                    .count();

                let messages = path_issues
                    .iter()
                    .map(|issue| FileMessage {
                        message: issue.message.clone(),
                        line: issue.line,
                        column: issue.column,
                        severity: issue.severity.to_string(),
                        check: issue.check_id.clone(),
                        identifier: issue.identifier.clone(),
                        routine: issue.routine.clone(),
                        tip: issue.tip.clone(),
                    })
                    .collect();

                let file = FileErrors {
                    errors,
                    warnings: path_issues.len() - errors,
                    messages,
                };
                (path, file)
            })
            .collect();

        let output = JsonOutput {
            totals: Totals {
                errors: issues.error_count(),
                warnings: issues.warning_count(),
                file_errors: file_errors.len(),
            },
            files: file_errors,
        };

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
