//! phpcfg-analyze: PHP front end, graph checks and reporting for phpcfg
//!
//! This crate connects real PHP source to `phpcfg-core`:
//!
//! - `frontend`: parses files with mago and lowers them into routines
//! - `checks`: graph checks (dead code, labels, catch types, builder diagnostics)
//! - Multiple output formats (raw, json, table, github) and graph dumps (text, json, dot)
//! - `logging`: optional file log of an analysis run
//!
//! # Example
//!
//! ```no_run
//! use phpcfg_analyze::{Analyzer, AnalyzeOptions, output::OutputFormat};
//! use std::path::Path;
//!
//! let analyzer = Analyzer::new(AnalyzeOptions::default());
//! let analysis = analyzer.analyze_paths(&[Path::new("src/")]).unwrap();
//!
//! let output = phpcfg_analyze::output::format_issues(&analysis.issues, OutputFormat::Table);
//! println!("{}", output);
//! ```

pub mod checks;
pub mod dump;
pub mod frontend;
pub mod issue;
pub mod logging;
pub mod output;

use checks::{CheckContext, CheckRegistry};
use frontend::{LineIndex, LoweredFile};
use issue::{Issue, IssueCollection};
use phpcfg_core::ast::{Routine, RoutineKind};
use phpcfg_core::{ControlFlowGraph, GraphBuilder, RoutineSymbols, TypeTable};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Library-side analysis settings
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Check ids to skip
    pub disabled_checks: Vec<String>,
    /// Path prefixes or glob patterns of files to skip
    pub exclude: Vec<String>,
    /// Build and check graphs for closures and arrow functions
    pub analyze_closures: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            disabled_checks: Vec::new(),
            exclude: Vec::new(),
            analyze_closures: true,
        }
    }
}

impl AnalyzeOptions {
    /// Whether a discovered file matches one of the exclude entries.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        for exclude in &self.exclude {
            let prefix = exclude.trim_end_matches('/');
            if !prefix.is_empty() && (path.starts_with(prefix) || path.components().any(|c| c.as_os_str() == prefix)) {
                logging::log(&format!("EXCLUDED: {} (matched prefix: {})", path.display(), exclude));
                return true;
            }
            if exclude.contains('*') {
                if let Ok(pattern) = glob::Pattern::new(exclude) {
                    let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    if pattern.matches(&text) || pattern.matches(&file_name) {
                        logging::log(&format!("EXCLUDED: {} (matched glob: {})", path.display(), exclude));
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// One routine and its graph
#[derive(Debug)]
pub struct RoutineGraph {
    pub routine: Routine,
    pub graph: ControlFlowGraph,
}

/// Graphs and issues of one file
#[derive(Debug)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub routines: Vec<RoutineGraph>,
    pub issues: IssueCollection,
}

impl FileAnalysis {
    pub fn routine(&self, name: &str) -> Option<&RoutineGraph> {
        self.routines
            .iter()
            .find(|r| r.routine.name.eq_ignore_ascii_case(name.trim_start_matches('\\')))
    }
}

/// Result of analyzing a set of paths
#[derive(Debug, Default)]
pub struct Analysis {
    pub files: Vec<FileAnalysis>,
    /// Every issue of every file, sorted
    pub issues: IssueCollection,
}

/// A file read and lowered, before its graphs are built.
struct ParsedFile {
    path: PathBuf,
    source: String,
    lowered: LoweredFile,
    parse_error: Option<String>,
}

/// Main analyzer that builds graphs and runs checks
pub struct Analyzer {
    options: AnalyzeOptions,
    registry: CheckRegistry,
}

impl Analyzer {
    /// Create a new analyzer with the given options
    pub fn new(options: AnalyzeOptions) -> Self {
        let registry = CheckRegistry::with_builtin_checks();
        Self { options, registry }
    }

    /// Create analyzer with default options
    pub fn with_defaults() -> Self {
        Self::new(AnalyzeOptions::default())
    }

    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Analyze a single file
    pub fn analyze_file(&self, path: &Path) -> Result<FileAnalysis, AnalyzeError> {
        let source = fs::read_to_string(path)?;
        Ok(self.analyze_source(path, &source))
    }

    /// Analyze source code with a given path. Only class-likes declared in
    /// this source are known besides the builtins.
    pub fn analyze_source(&self, path: &Path, source: &str) -> FileAnalysis {
        let parsed = parse(path, source.to_string());
        let types = build_type_table(std::slice::from_ref(&parsed));
        self.analyze_parsed(parsed, &types)
    }

    /// Analyze multiple paths (files or directories)
    pub fn analyze_paths(&self, paths: &[&Path]) -> Result<Analysis, AnalyzeError> {
        if paths.is_empty() {
            return Err(AnalyzeError::NoPaths);
        }
        let files = self.collect_files(paths)?;
        logging::log_analysis_start(files.len());

        // Read and lower every file in parallel
        let parsed: Vec<ParsedFile> = files
            .par_iter()
            .filter_map(|file| match fs::read_to_string(file) {
                Ok(source) => Some(parse(file, source)),
                Err(e) => {
                    // Log error but continue
                    eprintln!("Warning: Failed to read {}: {}", file.display(), e);
                    None
                }
            })
            .collect();

        for file in &parsed {
            logging::log_file_routines(
                &file.path,
                file.lowered.routines.len(),
                file.lowered.declarations.len(),
                file.parse_error.as_deref(),
            );
        }

        let types = build_type_table(&parsed);

        let mut files: Vec<FileAnalysis> = parsed
            .into_par_iter()
            .map(|file| self.analyze_parsed(file, &types))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut combined = IssueCollection::new();
        for file in &files {
            combined.extend(file.issues.issues().iter().cloned());
        }
        combined.sort();

        logging::log_analysis_complete(files.len(), combined.len(), combined.error_count());
        Ok(Analysis { files, issues: combined })
    }

    /// PHP files under the given paths, minus exclusions, in path order.
    pub fn collect_files(&self, paths: &[&Path]) -> Result<Vec<PathBuf>, AnalyzeError> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                files.push(path.to_path_buf());
            } else if path.is_dir() {
                for entry in WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    let entry_path = entry.path();
                    if entry_path.is_file()
                        && entry_path.extension().map(|e| e == "php").unwrap_or(false)
                        && !self.options.is_excluded(entry_path)
                    {
                        files.push(entry_path.to_path_buf());
                    }
                }
            } else {
                return Err(AnalyzeError::PathNotFound(path.to_path_buf()));
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    fn analyze_parsed(&self, file: ParsedFile, types: &TypeTable) -> FileAnalysis {
        let ParsedFile { path, source, lowered, parse_error } = file;
        let lines = LineIndex::new(&source);
        let mut issues = IssueCollection::new();

        if let Some(error) = parse_error {
            issues.add(Issue::error("parse.error", error, path.clone(), 1, 1));
        }

        let ctx = CheckContext { file_path: &path, source: &source, lines: &lines, types };
        let checks = self.registry.enabled_checks(&self.options.disabled_checks);

        let mut routines = Vec::new();
        for routine in lowered.routines {
            let is_closure = matches!(routine.kind, RoutineKind::Closure { .. } | RoutineKind::ArrowFunction { .. });
            if is_closure && !self.options.analyze_closures {
                continue;
            }

            let symbols = RoutineSymbols::for_routine(types, &routine);
            let graph = GraphBuilder::build(&routine, &symbols);
            logging::log_graph_stats(&routine.name, &graph);

            let routine_graph = RoutineGraph { routine, graph };
            for check in &checks {
                issues.extend(
                    check
                        .check(&routine_graph, &ctx)
                        .into_iter()
                        .map(|issue| issue.with_routine(routine_graph.routine.name.clone())),
                );
            }
            routines.push(routine_graph);
        }

        issues.sort();
        FileAnalysis { path, routines, issues }
    }
}

fn parse(path: &Path, source: String) -> ParsedFile {
    let (lowered, parse_error) = frontend::parse_source(path, &source);
    ParsedFile { path: path.to_path_buf(), source, lowered, parse_error }
}

/// Builtins plus every class-like declared in the given files. The first
/// declaration of a name wins, in path order.
fn build_type_table(files: &[ParsedFile]) -> TypeTable {
    let mut ordered: Vec<&ParsedFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut types = TypeTable::with_builtins();
    for file in ordered {
        for declaration in &file.lowered.declarations {
            types.declare(&declaration.name, declaration.parent.clone(), declaration.fields.clone());
        }
    }
    types
}

/// Errors that can occur during analysis
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No paths given for analysis")]
    NoPaths,

    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_creation() {
        let analyzer = Analyzer::with_defaults();
        assert!(analyzer.options().analyze_closures);
        assert!(!analyzer.registry().all_checks().is_empty());
    }

    #[test]
    fn test_analyze_simple_php() {
        let analyzer = Analyzer::with_defaults();
        let file = analyzer.analyze_source(Path::new("test.php"), "<?php\necho 'hello';\n");
        assert!(file.issues.is_empty());
        assert_eq!(file.routines.len(), 1);
        assert!(file.routine("{main}").is_some());
    }

    #[test]
    fn test_issues_carry_routine_name() {
        let analyzer = Analyzer::with_defaults();
        let file = analyzer.analyze_source(
            Path::new("test.php"),
            "<?php\nfunction foo() {\n    return;\n    echo 1;\n}\n",
        );
        assert_eq!(file.issues.len(), 1);
        assert_eq!(file.issues.issues()[0].routine.as_deref(), Some("foo"));
    }

    #[test]
    fn test_disabled_checks_and_closures() {
        let options = AnalyzeOptions {
            disabled_checks: vec!["label.unused".to_string()],
            analyze_closures: false,
            ..AnalyzeOptions::default()
        };
        let analyzer = Analyzer::new(options);
        let file = analyzer.analyze_source(
            Path::new("test.php"),
            "<?php\nunused:\n$f = function () { return; echo 1; };\n",
        );
        assert!(file.issues.is_empty());
        assert_eq!(file.routines.len(), 1);
    }

    #[test]
    fn test_is_excluded() {
        let options = AnalyzeOptions {
            exclude: vec!["vendor/".to_string(), "*.generated.php".to_string()],
            ..AnalyzeOptions::default()
        };
        assert!(options.is_excluded(Path::new("project/vendor/lib/a.php")));
        assert!(options.is_excluded(Path::new("src/models.generated.php")));
        assert!(!options.is_excluded(Path::new("src/vendors.php")));
    }

    #[test]
    fn test_analyze_paths_requires_paths() {
        let analyzer = Analyzer::with_defaults();
        assert!(matches!(analyzer.analyze_paths(&[]), Err(AnalyzeError::NoPaths)));
    }
}
