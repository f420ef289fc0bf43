//! Terminal reporting for phpcfg
//!
//! Issues are rendered by the analyzer's formatters; the table format gets
//! colored here. Graph dumps and the verbose summary are printed from here too.

use colored::*;
use phpcfg_analyze::dump::{DumpFormat, GraphDump};
use phpcfg_analyze::issue::IssueCollection;
use phpcfg_analyze::output::{format_issues, OutputFormat};
use phpcfg_analyze::Analysis;
use serde::Serialize;

/// Summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub routines: usize,
    pub blocks: usize,
    pub unreachable_blocks: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let graphs = analysis.files.iter().flat_map(|file| file.routines.iter());
        let mut summary = Summary {
            files: analysis.files.len(),
            errors: analysis.issues.error_count(),
            warnings: analysis.issues.warning_count(),
            ..Default::default()
        };
        for routine in graphs {
            summary.routines += 1;
            summary.blocks += routine.graph.len();
            summary.unreachable_blocks += routine.graph.unreachable_blocks().len();
        }
        summary
    }
}

/// Print issues in the chosen format
pub fn print_issues(issues: &IssueCollection, format: OutputFormat) {
    let rendered = format_issues(issues, format);
    match format {
        OutputFormat::Table => print!("{}", colorize_table(&rendered)),
        _ => print!("{}", rendered),
    }
}

/// Color the severity markers, file headers and tips of table output
fn colorize_table(text: &str) -> String {
    let mut output = String::with_capacity(text.len());

    for line in text.lines() {
        let colored_line = if let Some(rest) = line.strip_prefix(" ERROR ") {
            format!(" {} {}", "ERROR".red().bold(), rest)
        } else if let Some(rest) = line.strip_prefix(" WARNING ") {
            format!(" {} {}", "WARNING".yellow().bold(), rest)
        } else if line.starts_with(" [ERROR]") {
            line.red().bold().to_string()
        } else if line.starts_with(" [WARNING]") {
            line.yellow().to_string()
        } else if line.starts_with(" [OK]") {
            line.green().bold().to_string()
        } else if line.starts_with(" -- ") {
            line.bold().to_string()
        } else if line.trim_start().starts_with("Tip:") {
            line.dimmed().to_string()
        } else {
            line.to_string()
        };
        output.push_str(&colored_line);
        output.push('\n');
    }

    output
}

/// Render a set of graph dumps as one document
pub fn render_dumps(dumps: &[GraphDump], format: DumpFormat) -> String {
    match format {
        DumpFormat::Json => serde_json::to_string_pretty(dumps).unwrap_or_else(|_| "[]".to_string()),
        DumpFormat::Text | DumpFormat::Dot => dumps
            .iter()
            .map(|dump| dump.render(format))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Print the verbose summary to stderr so it never mixes with machine output
pub fn print_summary(summary: &Summary) {
    eprintln!();
    eprintln!("{}", "Summary".bold().underline());
    eprintln!("  Files analyzed: {}", summary.files);
    eprintln!("  Routines: {}", summary.routines);
    eprintln!("  Blocks: {} ({} unreachable)", summary.blocks, summary.unreachable_blocks);
    eprintln!("  Errors: {}", summary.errors);
    if summary.warnings > 0 {
        eprintln!("  Warnings: {}", summary.warnings);
    }
}
