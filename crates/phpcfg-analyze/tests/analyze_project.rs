//! End-to-end analysis of small PHP projects on disk

use phpcfg_analyze::issue::Severity;
use phpcfg_analyze::output::{format_issues, OutputFormat};
use phpcfg_analyze::{AnalyzeError, AnalyzeOptions, Analyzer};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

#[test]
fn test_classes_resolve_across_files() {
    let dir = project(&[
        (
            "src/Errors.php",
            "<?php\nnamespace App;\nclass NotFound extends \\RuntimeException {}\n",
        ),
        (
            "src/Service.php",
            "<?php\nnamespace App\\Http;\nuse App\\NotFound;\nfunction handle() {\n    try {\n        load();\n    } catch (NotFound $e) {\n        return null;\n    } catch (Gone $e) {\n        return false;\n    }\n}\n",
        ),
    ]);

    let analyzer = Analyzer::with_defaults();
    let analysis = analyzer.analyze_paths(&[dir.path()]).unwrap();

    assert_eq!(analysis.files.len(), 2);
    let unknown: Vec<_> = analysis
        .issues
        .issues()
        .iter()
        .filter(|i| i.check_id == "catch.unknownType")
        .collect();
    assert_eq!(unknown.len(), 1);
    assert!(unknown[0].message.contains("App\\Http\\Gone"));
    assert_eq!(unknown[0].line, 9);
    assert_eq!(unknown[0].routine.as_deref(), Some("App\\Http\\handle"));
}

#[test]
fn test_excludes_and_non_php_files() {
    let dir = project(&[
        ("src/a.php", "<?php\necho 1;\n"),
        ("src/notes.txt", "not php"),
        ("vendor/lib/b.php", "<?php\nreturn;\necho 2;\n"),
        ("src/cache.generated.php", "<?php\nreturn;\necho 3;\n"),
    ]);

    let options = AnalyzeOptions {
        exclude: vec!["vendor/".to_string(), "*.generated.php".to_string()],
        ..AnalyzeOptions::default()
    };
    let analyzer = Analyzer::new(options);
    let files = analyzer.collect_files(&[dir.path()]).unwrap();

    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("src/a.php"));

    let analysis = analyzer.analyze_paths(&[dir.path()]).unwrap();
    assert!(analysis.issues.is_empty());
}

#[test]
fn test_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let analyzer = Analyzer::with_defaults();
    assert!(matches!(
        analyzer.analyze_paths(&[missing.as_path()]),
        Err(AnalyzeError::PathNotFound(_))
    ));
}

#[test]
fn test_report_formats() {
    let dir = project(&[(
        "app.php",
        "<?php\nfunction run() {\n    goto done;\n}\nfunction stop() {\n    exit(1);\n    echo 'x';\n}\n",
    )]);

    let analysis = Analyzer::with_defaults().analyze_paths(&[dir.path()]).unwrap();
    let issues = &analysis.issues;
    assert_eq!(issues.error_count(), 2);
    assert!(issues.issues().iter().all(|i| i.severity == Severity::Error));

    let raw = format_issues(issues, OutputFormat::Raw);
    assert_eq!(raw.lines().count(), 2);
    assert!(raw.contains(":3:'goto' to undefined label 'done'."));
    assert!(raw.contains(":7:Unreachable statement"));

    let json: serde_json::Value = serde_json::from_str(&format_issues(issues, OutputFormat::Json)).unwrap();
    assert_eq!(json["totals"]["errors"], 2);

    let github = format_issues(issues, OutputFormat::Github);
    assert!(github.contains("title=label.undefined"));
}

#[test]
fn test_parse_error_is_reported() {
    let dir = project(&[("broken.php", "<?php\nfunction {\n")]);
    let analysis = Analyzer::with_defaults().analyze_paths(&[dir.path()]).unwrap();
    assert!(analysis.issues.issues().iter().any(|i| i.check_id == "parse.error"));
}

#[test]
fn test_analyze_single_file() {
    let dir = project(&[("one.php", "<?php\n$f = fn($x) => $x + 1;\necho $f(1);\n")]);
    let analysis = Analyzer::with_defaults()
        .analyze_paths(&[Path::new(&dir.path().join("one.php"))])
        .unwrap();

    let file = &analysis.files[0];
    assert_eq!(file.routines.len(), 2);
    assert!(file.routine("{closure#1}").is_some());
    assert!(analysis.issues.is_empty());
}
