//! CLI module for the MXCP validator
//!
//! Validates single files or whole project trees and lists the schemas in
//! use, with table, JSON or YAML output.

pub mod commands;
pub mod output;

pub use commands::{RunOptions, ValidateCli, ValidateCommands};
pub use output::{FileOutput, OutputFormat, RunOutput};

use crate::error::ValidationError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every validated file is valid
    Success = 0,
    /// At least one file is invalid
    ValidationFailed = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema files missing or malformed
    SchemaError = 5,
    /// Validator configuration invalid
    ConfigError = 6,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Exit code for a finished validation
    pub fn from_validation_result(all_valid: bool) -> Self {
        if all_valid {
            ExitCode::Success
        } else {
            ExitCode::ValidationFailed
        }
    }

    /// Exit code for an error that stopped the command
    pub fn from_error(err: &ValidationError) -> Self {
        match err {
            ValidationError::InvalidInput(_) | ValidationError::ParseError(_) => {
                ExitCode::InvalidInput
            }
            ValidationError::FileError(_) => ExitCode::FileError,
            ValidationError::SchemaLoad(_) => ExitCode::SchemaError,
            ValidationError::Config(_) => ExitCode::ConfigError,
            ValidationError::SerializationError(_) | ValidationError::InternalError(_) => {
                ExitCode::InternalError
            }
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: ValidateCli) -> Result<ExitCode, ValidationError> {
    let options = RunOptions::from_cli(&cli);
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        ValidateCommands::File {
            path,
            class,
            report,
            format,
        } => commands::execute_file(&options, &path, class, report, format, &mut stdout),
        ValidateCommands::All {
            root,
            report,
            format,
            skip_evals,
            report_unrecognized,
        } => commands::execute_all(
            &options,
            &root,
            commands::BatchFlags {
                report,
                skip_evals,
                report_unrecognized,
            },
            format,
            &mut stdout,
        ),
        ValidateCommands::Schemas { format } => {
            commands::execute_schemas(&options, format, &mut stdout)
        }
    }
}
