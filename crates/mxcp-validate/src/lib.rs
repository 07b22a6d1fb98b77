//! MXCP Validator
//!
//! Checks MXCP YAML files (project `mxcp-site.yml`, user `config.yml`,
//! tool, resource, prompt and eval definitions) against the JSON schema of
//! their class and reports every violation with the field path it occurs at.
//!
//! ## Architecture
//!
//! 1. **Document** (`document`): document classes, class resolution from
//!    path or content, and YAML/JSON parsing into a JSON value tree.
//!
//! 2. **Schema** (`schema`): the schema registry, loaded from the bundled
//!    schemas or a directory, with cross-file `$ref` resolution.
//!
//! 3. **Validation** (`validation`): the validator, violations, field paths
//!    and per-file results, including lazy batch runs.
//!
//! 4. **Discovery** (`discovery`): deterministic traversal of a project tree
//!    with dbt and virtual environment skip rules.
//!
//! 5. **Config** (`config`): validator settings from TOML or YAML.
//!
//! 6. **CLI** (`cli`): the `mxcp-validate` command.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Validate one file, class detected from its location
//! mxcp-validate file tools/search.yml
//!
//! # Validate a whole project with JSON output
//! mxcp-validate all ./my-project --format json
//!
//! # Show which schema applies to which files
//! mxcp-validate schemas
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mxcp_validate::Validator;
//! use std::path::Path;
//!
//! let validator = Validator::builtin().unwrap();
//! for result in validator.validate_all(Path::new("my-project")).unwrap() {
//!     for message in result.messages() {
//!         println!("{}: {}", result.path.display(), message);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod schema;
pub mod validation;

pub use cli::{ExitCode, OutputFormat, ValidateCli, ValidateCommands};
pub use config::{ReportMode, ValidatorConfig};
pub use discovery::{Candidate, Discovery, SkipReason, SkipRules};
pub use document::{
    class_from_content, class_from_location, class_from_path, project_root, Document,
    DocumentClass, ParseFailure,
};
pub use error::{Result, ValidationError};
pub use schema::{SchemaRegistry, SchemaSource};
pub use validation::{
    FieldPath, Outcome, ValidationResult, ValidationRun, Validator, Violation, ViolationKind,
};

/// Validator version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI application
///
/// This is the main entry point for the CLI binary.
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use mxcp_validate::{run_cli, ValidateCli};
///
/// fn main() {
///     let cli = ValidateCli::parse();
///     let exit_code = run_cli(cli);
///     std::process::exit(exit_code.into());
/// }
/// ```
pub fn run_cli(cli: ValidateCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
