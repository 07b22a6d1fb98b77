//! Validator configuration
//!
//! Loaded from a TOML or YAML file; every field has a default so an empty
//! file is valid. Command-line flags override file values.
//!
//! ```toml
//! schemas_dir = "assets/schemas"
//! report_mode = "first"
//! include_evals = true
//! report_unrecognized = false
//! exclude = ["^drafts/", "\\.example\\.yml$"]
//! ```

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ValidationError};

/// How many violations to keep per file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Report every violation
    #[default]
    All,
    /// Stop at the first violation
    First,
}

/// Settings for a [`crate::Validator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Directory of `*-schema-*.json` files; bundled schemas when unset
    pub schemas_dir: Option<PathBuf>,
    /// Violations kept per file
    pub report_mode: ReportMode,
    /// Validate files under `evals/` in batch mode
    pub include_evals: bool,
    /// Report files whose class cannot be determined in batch mode
    pub report_unrecognized: bool,
    /// Regular expressions matched against paths relative to the batch root
    pub exclude: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            schemas_dir: None,
            report_mode: ReportMode::All,
            include_evals: true,
            report_unrecognized: false,
            exclude: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `.toml`, `.yml` or `.yaml` file.
    ///
    /// A relative `schemas_dir` is resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::FileError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let mut config: ValidatorConfig = match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| {
                ValidationError::config(format!("Invalid config '{}': {}", path.display(), e))
            })?,
            "yaml" | "yml" => {
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&content).map_err(|e| {
                        ValidationError::config(format!(
                            "Invalid config '{}': {}",
                            path.display(),
                            e
                        ))
                    })?
                }
            }
            _ => {
                return Err(ValidationError::InvalidInput(format!(
                    "Unsupported config format: {}. Supported formats: toml, yaml, yml",
                    extension
                )))
            }
        };

        if let (Some(dir), Some(base)) = (config.schemas_dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.schemas_dir = Some(base.join(dir));
            }
        }

        config.exclude_patterns()?;
        tracing::debug!(path = %path.display(), "loaded validator config");
        Ok(config)
    }

    /// Set the schemas directory
    pub fn with_schemas_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schemas_dir = Some(dir.into());
        self
    }

    /// Set the report mode
    pub fn with_report_mode(mut self, mode: ReportMode) -> Self {
        self.report_mode = mode;
        self
    }

    /// Include or skip eval suites in batch mode
    pub fn with_include_evals(mut self, include: bool) -> Self {
        self.include_evals = include;
        self
    }

    /// Report files of unknown class in batch mode
    pub fn with_report_unrecognized(mut self, report: bool) -> Self {
        self.report_unrecognized = report;
        self
    }

    /// Add an exclude pattern
    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Compile the exclude patterns
    pub fn exclude_patterns(&self) -> Result<Vec<Regex>> {
        self.exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ValidationError::config(format!("Invalid exclude pattern '{}': {}", pattern, e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.report_mode, ReportMode::All);
        assert!(config.include_evals);
        assert!(!config.report_unrecognized);
        assert!(config.schemas_dir.is_none());
    }

    #[test]
    fn test_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "mxcp-validate.toml",
            "schemas_dir = \"schemas\"\nreport_mode = \"first\"\ninclude_evals = false\nexclude = [\"^drafts/\"]\n",
        );
        let config = ValidatorConfig::from_file(&path).unwrap();
        assert_eq!(config.report_mode, ReportMode::First);
        assert!(!config.include_evals);
        assert_eq!(config.schemas_dir, Some(dir.path().join("schemas")));
        assert_eq!(config.exclude, vec!["^drafts/".to_string()]);
    }

    #[test]
    fn test_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "validate.yml", "report_unrecognized: true\n");
        let config = ValidatorConfig::from_file(&path).unwrap();
        assert!(config.report_unrecognized);
        assert!(config.include_evals);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "validate.yaml", "");
        assert_eq!(ValidatorConfig::from_file(&path).unwrap(), ValidatorConfig::default());
    }

    #[test]
    fn test_absolute_schemas_dir_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "v.toml", "schemas_dir = \"/opt/mxcp/schemas\"\n");
        let config = ValidatorConfig::from_file(&path).unwrap();
        assert_eq!(config.schemas_dir, Some(PathBuf::from("/opt/mxcp/schemas")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "v.toml", "strictness = 3\n");
        let err = ValidatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ValidationError::Config(_)));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "v.toml", "exclude = [\"(unclosed\"]\n");
        let err = ValidatorConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid exclude pattern"));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "v.ini", "x=1");
        let err = ValidatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInput(_)));
    }

    #[test]
    fn test_builders() {
        let config = ValidatorConfig::new()
            .with_schemas_dir("/s")
            .with_report_mode(ReportMode::First)
            .with_include_evals(false)
            .with_report_unrecognized(true)
            .with_exclude("^tmp/");
        assert_eq!(config.schemas_dir, Some(PathBuf::from("/s")));
        assert_eq!(config.report_mode, ReportMode::First);
        assert!(!config.include_evals);
        assert!(config.report_unrecognized);
        assert_eq!(config.exclude_patterns().unwrap().len(), 1);
    }
}
