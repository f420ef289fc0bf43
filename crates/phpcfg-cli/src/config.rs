//! Configuration file support for phpcfg
//!
//! Loads `.phpcfg.toml` from current directory or parent directories.

use anyhow::{Context, Result};
use phpcfg_analyze::output::OutputFormat;
use phpcfg_analyze::AnalyzeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".phpcfg.toml";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub checks: ChecksConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Glob patterns to exclude from analysis
    pub exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Check ids to skip
    pub disabled: Vec<String>,
    /// Whether closures and arrow functions get their own graphs (default: true)
    pub closures: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: raw, json, table or github
    pub format: Option<String>,
}

impl Config {
    /// Load config from `.phpcfg.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// The configured output format, if any
    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        match &self.output.format {
            Some(name) => OutputFormat::from_str(name)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("Invalid output format '{}' in config", name)),
            None => Ok(None),
        }
    }

    /// Analyzer options with extra disabled checks from the command line
    pub fn analyze_options(&self, cli_disabled: &[String]) -> AnalyzeOptions {
        let mut disabled_checks = self.checks.disabled.clone();
        for id in cli_disabled {
            if !disabled_checks.contains(id) {
                disabled_checks.push(id.clone());
            }
        }

        AnalyzeOptions {
            disabled_checks,
            exclude: self.paths.exclude.clone(),
            analyze_closures: self.checks.closures.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn test_load_basic_config() {
        let temp = TempDir::new().unwrap();
        create_config(
            temp.path(),
            r#"
[paths]
exclude = ["vendor/", "*.generated.php"]

[checks]
disabled = ["label.unused"]
closures = false

[output]
format = "json"
"#,
        );

        let (config, path) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join(CONFIG_FILE));
        assert_eq!(
            config.paths.exclude,
            vec!["vendor/".to_string(), "*.generated.php".to_string()]
        );
        assert_eq!(config.checks.disabled, vec!["label.unused".to_string()]);
        assert_eq!(config.output_format().unwrap(), Some(OutputFormat::Json));

        let options = config.analyze_options(&[]);
        assert!(!options.analyze_closures);
        assert_eq!(options.exclude.len(), 2);
    }

    #[test]
    fn test_load_empty_config() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "");

        let (config, _) = Config::load_from(temp.path().to_path_buf())
            .unwrap()
            .unwrap();

        assert!(config.checks.disabled.is_empty());
        assert!(config.paths.exclude.is_empty());
        assert!(config.output_format().unwrap().is_none());
        assert!(config.analyze_options(&[]).analyze_closures);
    }

    #[test]
    fn test_config_found_in_parent() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[checks]\ndisabled = [\"deadCode.unreachable\"]\n");
        let nested = temp.path().join("src/Http");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = Config::load_from(nested).unwrap().unwrap();
        assert_eq!(path, temp.path().join(CONFIG_FILE));
        assert_eq!(config.checks.disabled, vec!["deadCode.unreachable".to_string()]);
    }

    #[test]
    fn test_no_config_found() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_from(temp.path().to_path_buf()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let temp = TempDir::new().unwrap();
        create_config(temp.path(), "[paths\nexclude = 3");
        let err = Config::load_from(temp.path().to_path_buf()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn test_invalid_output_format() {
        let config = Config {
            output: OutputConfig {
                format: Some("xml".to_string()),
            },
            ..Default::default()
        };
        assert!(config.output_format().is_err());
    }

    #[test]
    fn test_cli_disabled_checks_merge() {
        let config = Config {
            checks: ChecksConfig {
                disabled: vec!["label.unused".to_string()],
                closures: None,
            },
            ..Default::default()
        };

        let options = config.analyze_options(&["label.unused".to_string(), "catch.unknownType".to_string()]);
        assert_eq!(
            options.disabled_checks,
            vec!["label.unused".to_string(), "catch.unknownType".to_string()]
        );
    }
}
