//! MXCP validator CLI
//!
//! # Usage
//!
//! ```bash
//! mxcp-validate file tools/search.yml
//! mxcp-validate all ./my-project --report first
//! mxcp-validate --schemas-dir ./schemas schemas
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success - every file is valid
//! - 1: At least one file is invalid
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema files missing or malformed
//! - 6: Validator configuration invalid
//! - 10: Internal error

use clap::Parser;
use mxcp_validate::{run_cli, ValidateCli};
use tracing::Level;

fn main() {
    // Parse first so -v can set the log level
    let cli = ValidateCli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr, stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
