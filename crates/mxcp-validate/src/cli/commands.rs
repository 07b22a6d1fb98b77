//! CLI command definitions for the MXCP validator

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::output::{render_structured, FileOutput, OutputFormat, RunOutput, TableWriter};
use super::ExitCode;
use crate::config::{ReportMode, ValidatorConfig};
use crate::document::{DocumentClass, PathPattern, PATH_RULES};
use crate::error::{Result, ValidationError};
use crate::validation::Validator;

/// MXCP validator CLI
///
/// Validate MXCP site, config, tool, resource, prompt and eval files
/// against their JSON schemas.
#[derive(Parser, Debug)]
#[command(name = "mxcp-validate")]
#[command(about = "Validate MXCP YAML files against their JSON schemas", long_about = None)]
#[command(version)]
pub struct ValidateCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print invalid files and totals
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Validator config file (TOML or YAML)
    #[arg(long, global = true, env = "MXCP_VALIDATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of *-schema-*.json files to use instead of the bundled schemas
    #[arg(long, global = true, env = "MXCP_VALIDATE_SCHEMAS_DIR")]
    pub schemas_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ValidateCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum ValidateCommands {
    /// Validate a single file
    ///
    /// The document class is taken from the file location (mxcp-site.yml,
    /// config.yml, tools/, resources/, prompts/, evals/) or its top-level keys.
    File {
        /// Path to the YAML or JSON file
        path: PathBuf,

        /// Validate as this class instead of detecting it
        #[arg(long, value_enum)]
        class: Option<DocumentClass>,

        /// Report every violation or only the first
        #[arg(long, value_enum)]
        report: Option<ReportMode>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Validate every MXCP file below a directory
    All {
        /// Project or templates directory
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Report every violation or only the first
        #[arg(long, value_enum)]
        report: Option<ReportMode>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Do not validate eval suites
        #[arg(long)]
        skip_evals: bool,

        /// Report files whose class cannot be detected as invalid
        #[arg(long)]
        report_unrecognized: bool,
    },

    /// List the schemas in use and the files they apply to
    Schemas {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub schemas_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn from_cli(cli: &ValidateCli) -> Self {
        Self {
            quiet: cli.quiet,
            config: cli.config.clone(),
            schemas_dir: cli.schemas_dir.clone(),
        }
    }

    /// Config file values with command-line overrides applied
    pub fn validator_config(&self) -> Result<ValidatorConfig> {
        let mut config = match &self.config {
            Some(path) => ValidatorConfig::from_file(path)?,
            None => ValidatorConfig::default(),
        };
        if let Some(dir) = &self.schemas_dir {
            config.schemas_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

/// Batch-only flags of the `all` command
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchFlags {
    pub report: Option<ReportMode>,
    pub skip_evals: bool,
    pub report_unrecognized: bool,
}

/// Execute the file command
pub fn execute_file<W: Write>(
    options: &RunOptions,
    path: &Path,
    class: Option<DocumentClass>,
    report: Option<ReportMode>,
    format: OutputFormat,
    out: &mut W,
) -> Result<ExitCode> {
    if !path.is_file() {
        return Err(ValidationError::invalid_input(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let mut config = options.validator_config()?;
    if let Some(mode) = report {
        config.report_mode = mode;
    }
    let validator = Validator::from_config(config)?;

    let result = match class {
        Some(class) => validator.validate_as(path, class),
        None => validator.validate(path),
    };
    tracing::info!(path = %path.display(), status = result.status(), "validated file");

    let file = FileOutput::from_result(&result, None);
    match format {
        OutputFormat::Table => {
            let mut table = TableWriter::new(&mut *out, options.quiet);
            table.file(&file)?;
        }
        OutputFormat::Json | OutputFormat::Yaml => render_structured(&file, format, out)?,
    }

    Ok(ExitCode::from_validation_result(result.is_valid()))
}

/// Execute the all command
pub fn execute_all<W: Write>(
    options: &RunOptions,
    root: &Path,
    flags: BatchFlags,
    format: OutputFormat,
    out: &mut W,
) -> Result<ExitCode> {
    let mut config = options.validator_config()?;
    if let Some(mode) = flags.report {
        config.report_mode = mode;
    }
    if flags.skip_evals {
        config.include_evals = false;
    }
    if flags.report_unrecognized {
        config.report_unrecognized = true;
    }

    let start = Instant::now();
    let validator = Validator::from_config(config)?;
    let run = validator.validate_all(root)?;
    let schemas = validator.registry().source().to_string();
    let mut summary = RunOutput::new(root, schemas.clone());

    match format {
        OutputFormat::Table => {
            let mut table = TableWriter::new(&mut *out, options.quiet);
            table.header(root, &schemas)?;
            for result in run {
                let file = FileOutput::from_result(&result, Some(root));
                table.file(&file)?;
                summary.record(file);
            }
            summary.duration_ms = Some(start.elapsed().as_millis() as u64);
            table.footer(&summary)?;
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            for result in run {
                summary.record(FileOutput::from_result(&result, Some(root)));
            }
            summary.duration_ms = Some(start.elapsed().as_millis() as u64);
            render_structured(&summary, format, out)?;
        }
    }

    tracing::info!(
        root = %root.display(),
        valid = summary.valid_count,
        invalid = summary.invalid_count,
        "batch validation finished"
    );

    Ok(ExitCode::from_validation_result(summary.valid))
}

/// One row of the schemas listing
#[derive(Debug, Clone, Serialize)]
pub struct SchemaEntry {
    pub class: DocumentClass,
    pub schema: String,
    pub description: String,
    /// Path patterns that select this class
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SchemaListing {
    source: String,
    schemas: Vec<SchemaEntry>,
}

/// Execute the schemas command
pub fn execute_schemas<W: Write>(
    options: &RunOptions,
    format: OutputFormat,
    out: &mut W,
) -> Result<ExitCode> {
    let validator = Validator::from_config(options.validator_config()?)?;
    let listing = SchemaListing {
        source: validator.registry().source().to_string(),
        schemas: schema_entries(),
    };

    match format {
        OutputFormat::Table => print_schema_table(&listing, out)?,
        OutputFormat::Json | OutputFormat::Yaml => render_structured(&listing, format, out)?,
    }
    Ok(ExitCode::Success)
}

/// Every class with its schema and path patterns
pub fn schema_entries() -> Vec<SchemaEntry> {
    DocumentClass::ALL
        .iter()
        .map(|class| SchemaEntry {
            class: *class,
            schema: class.schema_id().to_string(),
            description: class.description().to_string(),
            patterns: PATH_RULES
                .iter()
                .filter(|(_, c)| c == class)
                .map(|(pattern, _)| pattern_label(pattern))
                .collect(),
        })
        .collect()
}

fn pattern_label(pattern: &PathPattern) -> String {
    match pattern {
        PathPattern::FileName(_) => pattern.to_string(),
        PathPattern::Directory(_) => format!("{}**", pattern),
    }
}

fn print_schema_table<W: Write>(listing: &SchemaListing, out: &mut W) -> Result<()> {
    use colored::Colorize;

    writeln!(out, "{} {}", "Schemas:".cyan().bold(), listing.source)?;
    writeln!(out)?;
    for entry in &listing.schemas {
        writeln!(
            out,
            "  {:<10} {:<22} {}",
            entry.class.to_string().bold(),
            entry.schema,
            entry.patterns.join(", ").dimmed()
        )?;
    }
    Ok(())
}
