//! Logging module for phpcfg-analyze
//!
//! Writes a trace of an analysis run (configuration, files, routines and
//! graph statistics) to a file for debugging.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use phpcfg_core::ControlFlowGraph;

/// Global logger instance
static LOGGER: Mutex<Option<AnalyzeLogger>> = Mutex::new(None);

/// Logger for analyze operations
pub struct AnalyzeLogger {
    file: File,
    path: PathBuf,
}

impl AnalyzeLogger {
    /// Create a new logger writing to the specified path
    pub fn new(log_path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)?;

        Ok(Self {
            file,
            path: log_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a log message
    pub fn log(&mut self, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(self.file, "[{}] {}", timestamp, message);
        let _ = self.file.flush();
    }

    /// Log a section header
    pub fn section(&mut self, title: &str) {
        let separator = "=".repeat(60);
        self.log(&separator);
        self.log(title);
        self.log(&separator);
    }

    /// Log a subsection
    pub fn subsection(&mut self, title: &str) {
        let separator = "-".repeat(40);
        self.log(&separator);
        self.log(title);
        self.log(&separator);
    }
}

/// Initialize the global logger
pub fn init_logger(log_path: Option<&Path>) -> std::io::Result<PathBuf> {
    let path = log_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(format!("/tmp/phpcfg-{}.log", timestamp))
        });

    let logger = AnalyzeLogger::new(&path)?;

    if let Ok(mut guard) = LOGGER.lock() {
        *guard = Some(logger);
    }

    Ok(path)
}

/// Log a message to the global logger
pub fn log(message: &str) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.log(message);
        }
    }
}

/// Log a section header
pub fn section(title: &str) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.section(title);
        }
    }
}

/// Log a subsection
pub fn subsection(title: &str) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.subsection(title);
        }
    }
}

/// Check if logging is enabled
pub fn is_enabled() -> bool {
    if let Ok(guard) = LOGGER.lock() {
        guard.is_some()
    } else {
        false
    }
}

/// Log configuration loading
pub fn log_config_load(path: &Path) {
    section("CONFIGURATION LOADING");
    log(&format!("Loading config from: {}", path.display()));
}

/// Log summary of configuration
pub fn log_config_summary(paths_count: usize, exclude_count: usize, disabled_checks: &[String]) {
    section("CONFIGURATION SUMMARY");
    log(&format!("Paths to analyze: {}", paths_count));
    log(&format!("Exclude patterns: {}", exclude_count));
    if disabled_checks.is_empty() {
        log("Disabled checks: none");
    } else {
        log(&format!("Disabled checks: {}", disabled_checks.join(", ")));
    }
}

/// Log analysis start
pub fn log_analysis_start(files_count: usize) {
    section("ANALYSIS START");
    log(&format!("Analyzing {} files", files_count));
}

/// Log the routines lowered from one file
pub fn log_file_routines(file: &Path, routines: usize, declarations: usize, parse_error: Option<&str>) {
    subsection(&format!("FILE {}", file.display()));
    log(&format!("Routines: {}, class-likes: {}", routines, declarations));
    if let Some(error) = parse_error {
        log(&format!("  Parse error: {}", error));
    }
}

/// Log the shape of one routine's graph
pub fn log_graph_stats(routine: &str, graph: &ControlFlowGraph) {
    if !is_enabled() {
        return;
    }
    let edges = graph.blocks().iter().filter(|b| b.edge().is_some()).count();
    log(&format!(
        "  {}: {} blocks, {} edges, {} unreachable, {} labels, {} diagnostics",
        routine,
        graph.len(),
        edges,
        graph.unreachable_blocks().len(),
        graph.labels().len(),
        graph.diagnostics().len()
    ));
}

/// Log analysis complete
pub fn log_analysis_complete(files_count: usize, total_issues: usize, errors: usize) {
    section("ANALYSIS COMPLETE");
    log(&format!("Files analyzed: {}", files_count));
    log(&format!("Total issues found: {}", total_issues));
    log(&format!("Errors: {}", errors));
    log(&format!("Warnings: {}", total_issues - errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_writes_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut logger = AnalyzeLogger::new(&path).unwrap();
        logger.section("ANALYSIS START");
        logger.log("Analyzing 3 files");
        assert_eq!(logger.path(), path.as_path());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ANALYSIS START"));
        assert!(content.contains("Analyzing 3 files"));
        assert!(content.contains(&"=".repeat(60)));
    }

    #[test]
    fn test_graph_stats_without_logger() {
        let file = crate::Analyzer::with_defaults().analyze_source(Path::new("a.php"), "<?php\necho 1;\n");
        assert!(!is_enabled());
        log_graph_stats("{main}", &file.routines[0].graph);
        assert!(!is_enabled());
    }
}
