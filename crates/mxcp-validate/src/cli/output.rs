//! Output formatting for the validator CLI
//!
//! Table output is written file by file while a batch runs; JSON and YAML
//! output describe the whole run as one document.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::document::DocumentClass;
use crate::error::{Result, ValidationError};
use crate::validation::{Outcome, ValidationResult, Violation};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// One validated file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutput {
    /// Path as shown to the user
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<DocumentClass>,
    pub status: String,
    /// Schema violations
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    /// Parse, detection or read error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl FileOutput {
    /// Build from a result, showing `path` relative to `base` when possible
    pub fn from_result(result: &ValidationResult, base: Option<&Path>) -> Self {
        let shown = base
            .and_then(|base| result.path.strip_prefix(base).ok())
            .unwrap_or(&result.path);

        let (error, line, column) = match &result.outcome {
            Outcome::ParseError(failure) => {
                (Some(failure.message.clone()), failure.line, failure.column)
            }
            Outcome::Unrecognized { reason } => (Some(reason.clone()), None, None),
            Outcome::Unreadable { message } => (Some(message.clone()), None, None),
            Outcome::Valid | Outcome::Violations(_) => (None, None, None),
        };

        Self {
            path: shown.display().to_string(),
            class: result.class,
            status: result.status().to_string(),
            violations: result.violations().to_vec(),
            error,
            line,
            column,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == "valid"
    }
}

/// A whole batch run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub root: String,
    /// Where the schemas were loaded from
    pub schemas: String,
    pub valid: bool,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub files: Vec<FileOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RunOutput {
    pub fn new(root: &Path, schemas: impl Into<String>) -> Self {
        Self {
            root: root.display().to_string(),
            schemas: schemas.into(),
            valid: true,
            valid_count: 0,
            invalid_count: 0,
            files: Vec::new(),
            duration_ms: None,
        }
    }

    /// Count a file and keep it for structured output
    pub fn record(&mut self, file: FileOutput) {
        if file.is_valid() {
            self.valid_count += 1;
        } else {
            self.invalid_count += 1;
            self.valid = false;
        }
        self.files.push(file);
    }
}

/// Render any serializable value as JSON or YAML
pub fn render_structured<T: Serialize, W: Write>(
    value: &T,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| ValidationError::SerializationError(e.to_string()))?,
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| ValidationError::SerializationError(e.to_string()))?,
        OutputFormat::Table => {
            return Err(ValidationError::InternalError(
                "table output is not a structured format".to_string(),
            ))
        }
    };
    writeln!(out, "{}", text)?;
    Ok(())
}

/// Streams human-readable results
pub struct TableWriter<W: Write> {
    out: W,
    quiet: bool,
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    /// Banner printed before a batch
    pub fn header(&mut self, root: &Path, schemas: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            self.out,
            "{} {} ({})",
            "Validating".cyan().bold(),
            root.display(),
            schemas.dimmed()
        )?;
        writeln!(self.out, "{}", "-".repeat(60))?;
        Ok(())
    }

    /// One file line plus indented error lines
    pub fn file(&mut self, file: &FileOutput) -> Result<()> {
        if file.is_valid() {
            if !self.quiet {
                writeln!(self.out, "{} {}", "+".green(), file.path)?;
            }
            return Ok(());
        }

        let class = file
            .class
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        writeln!(self.out, "{} {}{}", "x".red(), file.path, class.dimmed())?;

        for violation in &file.violations {
            writeln!(
                self.out,
                "  {} {}",
                format!("At {}:", violation.path).cyan(),
                violation.message
            )?;
        }
        if let Some(error) = &file.error {
            let label = match file.status.as_str() {
                "parse-error" => "Parse error:",
                "unrecognized" => "Unrecognized:",
                _ => "Error:",
            };
            writeln!(self.out, "  {} {}", label.yellow(), error)?;
        }
        Ok(())
    }

    /// Totals printed after a batch
    pub fn footer(&mut self, run: &RunOutput) -> Result<()> {
        writeln!(self.out, "{}", "-".repeat(60))?;
        let invalid = run.invalid_count.to_string();
        let invalid = if run.invalid_count > 0 {
            invalid.red().bold()
        } else {
            invalid.normal()
        };
        writeln!(
            self.out,
            "Results: {} valid, {} invalid",
            run.valid_count.to_string().green(),
            invalid
        )?;
        if let Some(duration) = run.duration_ms {
            writeln!(self.out, "Completed in {}", format_duration(duration).dimmed())?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format a duration in human-readable format
pub fn format_duration(ms: u64) -> String {
    if ms >= 60000 {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) / 1000;
        format!("{}m {}s", minutes, seconds)
    } else if ms >= 1000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParseFailure;
    use crate::validation::{FieldPath, ViolationKind};
    use std::path::PathBuf;

    fn plain() {
        colored::control::set_override(false);
    }

    fn violation() -> Violation {
        Violation {
            path: FieldPath::from_pointer("/tool/language"),
            message: r#""javascript" is not one of ["sql","python"]"#.to_string(),
            kind: ViolationKind::Enum {
                allowed: vec!["sql".to_string(), "python".to_string()],
            },
            schema_path: "/properties/tool/properties/language/enum".to_string(),
        }
    }

    fn result(path: &str, outcome: Outcome) -> ValidationResult {
        ValidationResult {
            path: PathBuf::from(path),
            class: Some(DocumentClass::Tool),
            outcome,
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500), "500ms");
        assert_eq!(format_duration(1500), "1.50s");
        assert_eq!(format_duration(65000), "1m 5s");
    }

    #[test]
    fn test_file_output_relative_path() {
        let r = result("/proj/tools/a.yml", Outcome::Valid);
        let output = FileOutput::from_result(&r, Some(Path::new("/proj")));
        assert_eq!(output.path, PathBuf::from("tools/a.yml").display().to_string());
        assert!(output.is_valid());
    }

    #[test]
    fn test_file_output_parse_error() {
        let r = result(
            "tools/a.yml",
            Outcome::ParseError(ParseFailure::new("YAML parsing error: bad").at(3, 7)),
        );
        let output = FileOutput::from_result(&r, None);
        assert_eq!(output.status, "parse-error");
        assert_eq!(output.error.as_deref(), Some("YAML parsing error: bad"));
        assert_eq!((output.line, output.column), (Some(3), Some(7)));
        assert!(output.violations.is_empty());
    }

    #[test]
    fn test_run_output_counts() {
        let mut run = RunOutput::new(Path::new("/proj"), "bundled schemas");
        run.record(FileOutput::from_result(&result("a.yml", Outcome::Valid), None));
        run.record(FileOutput::from_result(
            &result("b.yml", Outcome::Violations(vec![violation()])),
            None,
        ));
        assert_eq!(run.valid_count, 1);
        assert_eq!(run.invalid_count, 1);
        assert!(!run.valid);
    }

    #[test]
    fn test_structured_json() {
        let r = result("tools/b.yml", Outcome::Violations(vec![violation()]));
        let output = FileOutput::from_result(&r, None);
        let mut buf = Vec::new();
        render_structured(&output, OutputFormat::Json, &mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["class"], "tool");
        assert_eq!(json["violations"][0]["path"], "tool.language");
        assert_eq!(json["violations"][0]["kind"], "enum");
        assert_eq!(json["violations"][0]["allowed"][1], "python");
    }

    #[test]
    fn test_structured_rejects_table() {
        let mut buf = Vec::new();
        assert!(render_structured(&1, OutputFormat::Table, &mut buf).is_err());
    }

    #[test]
    fn test_table_writer_lines() {
        plain();
        let mut table = TableWriter::new(Vec::new(), false);
        let good = FileOutput::from_result(&result("tools/a.yml", Outcome::Valid), None);
        let bad = FileOutput::from_result(
            &result("tools/b.yml", Outcome::Violations(vec![violation()])),
            None,
        );
        let mut run = RunOutput::new(Path::new("."), "bundled schemas");
        table.file(&good).unwrap();
        table.file(&bad).unwrap();
        run.record(good);
        run.record(bad);
        table.footer(&run).unwrap();

        let text = String::from_utf8(table.into_inner()).unwrap();
        assert!(text.contains("+ tools/a.yml"));
        assert!(text.contains("x tools/b.yml (tool)"));
        assert!(text.contains(r#"  At tool.language: "javascript" is not one of"#));
        assert!(text.contains("Results: 1 valid, 1 invalid"));
    }

    #[test]
    fn test_table_writer_quiet_hides_valid() {
        plain();
        let mut table = TableWriter::new(Vec::new(), true);
        table
            .file(&FileOutput::from_result(&result("tools/a.yml", Outcome::Valid), None))
            .unwrap();
        assert!(table.into_inner().is_empty());
    }
}
