//! phpcfg CLI - control flow graphs and flow checks for PHP
//!
//! Builds a control flow graph for every routine (script body, functions,
//! methods, closures) and reports what the graphs reveal:
//! - deadCode.unreachable: statements no path reaches
//! - label.undefined / label.redefined / label.unused: goto label misuse
//! - catch.unknownType: catch clauses naming unknown classes
//! - builder.diagnostic: invalid break/continue levels, unsupported syntax
//!
//! With `--dump` the graphs themselves are printed as text, JSON or dot.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use phpcfg_analyze::dump::{DumpFormat, GraphDump};
use phpcfg_analyze::output::OutputFormat;
use phpcfg_analyze::{logging, Analysis, Analyzer};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use config::Config;
use output::{print_issues, print_summary, render_dumps, Summary};

#[derive(Parser)]
#[command(name = "phpcfg")]
#[command(version)]
#[command(about = "Control flow graphs and flow checks for PHP")]
struct Cli {
    /// Files or directories to analyze
    #[arg(required_unless_present = "list_checks")]
    paths: Vec<PathBuf>,

    /// Output format: raw, json, table, github. Overrides config file.
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Print the graphs instead of issues: text, json, dot
    #[arg(long, value_name = "FORMAT")]
    dump: Option<String>,

    /// Only dump the routine with this name (e.g. `App\User::save`, `{main}`)
    #[arg(long, value_name = "NAME", requires = "dump")]
    routine: Option<String>,

    /// Checks to skip (can be specified multiple times)
    #[arg(long, value_name = "CHECK")]
    disable: Vec<String>,

    /// Path to config file (default: auto-detect .phpcfg.toml)
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Write a debug log (default: /tmp/phpcfg-<timestamp>.log)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// List available checks and exit
    #[arg(long)]
    list_checks: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.list_checks {
        let analyzer = Analyzer::with_defaults();
        println!("{}", "Available checks:".bold());
        for check in analyzer.registry().all_checks() {
            println!("  {} - {}", check.id().green(), check.description());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(log_path) = &cli.log_file {
        match logging::init_logger(log_path.as_deref()) {
            Ok(path) => {
                if cli.verbose {
                    eprintln!("{}: Debug log writing to {}", "Debug".bold(), path.display());
                }
            }
            Err(e) => {
                eprintln!("{}: Failed to initialize debug log: {}", "Warning".yellow(), e);
            }
        }
    }

    let config = load_config(&cli)?;

    let output_format = match &cli.format {
        Some(name) => OutputFormat::from_str(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: raw, json, table, github",
                name
            )
        })?,
        None => config.output_format()?.unwrap_or_default(),
    };

    let dump_format = match &cli.dump {
        Some(name) => Some(DumpFormat::from_str(name).ok_or_else(|| {
            anyhow::anyhow!("Invalid dump format '{}'. Valid options: text, json, dot", name)
        })?),
        None => None,
    };

    let options = config.analyze_options(&cli.disable);
    logging::log_config_summary(cli.paths.len(), options.exclude.len(), &options.disabled_checks);
    let analyzer = Analyzer::new(options);

    let known: Vec<&str> = analyzer.registry().all_checks().iter().map(|c| c.id()).collect();
    for id in &analyzer.options().disabled_checks {
        if !known.contains(&id.as_str()) {
            eprintln!(
                "{}: Unknown check '{}'. Use --list-checks to see available checks.",
                "Warning".yellow(),
                id
            );
        }
    }

    if cli.verbose {
        eprintln!(
            "{}: {}",
            "Analyzing".bold(),
            cli.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        );
    }

    let paths: Vec<&Path> = cli.paths.iter().map(|p| p.as_path()).collect();
    let analysis = analyzer.analyze_paths(&paths)?;

    if let Some(format) = dump_format {
        print_dumps(&analysis, format, cli.routine.as_deref())?;
        return Ok(ExitCode::SUCCESS);
    }

    print_issues(&analysis.issues, output_format);

    if cli.verbose {
        print_summary(&Summary::from_analysis(&analysis));
    }

    if analysis.issues.error_count() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    if cli.no_config {
        return Ok(Config::default());
    }

    let found = match &cli.config {
        Some(path) => Some((Config::load_path(path)?, path.clone())),
        None => Config::load()?,
    };

    match found {
        Some((config, path)) => {
            logging::log_config_load(&path);
            if cli.verbose {
                eprintln!("{}: {}", "Using config".bold(), path.display());
            }
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn print_dumps(analysis: &Analysis, format: DumpFormat, routine: Option<&str>) -> Result<()> {
    let mut dumps = Vec::new();

    for file in &analysis.files {
        let source = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read {}", file.path.display()))?;
        match routine {
            Some(name) => {
                if let Some(graph) = file.routine(name) {
                    dumps.push(GraphDump::new(graph, &source));
                }
            }
            None => dumps.extend(file.routines.iter().map(|graph| GraphDump::new(graph, &source))),
        }
    }

    if let Some(name) = routine {
        if dumps.is_empty() {
            anyhow::bail!("Routine '{}' not found", name);
        }
    }

    println!("{}", render_dumps(&dumps, format));
    Ok(())
}
