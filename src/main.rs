//! Binary entry point for crmstore.
//!
//! Prints one JSON result line per command on stdout; logs go to stderr.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use crmstore::cli::{self, Cli};
use crmstore::observability;
use crmstore::PersistenceAdapter;
use std::process::ExitCode;

// Synchronous main: the marketing client and the Postgres store block on
// their own runtimes.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let adapter = PersistenceAdapter::new(config);
    let result = cli::run(&cli.command, &adapter);
    adapter.close();

    match result {
        Ok(output) => {
            println!("{}", output.to_json_line());
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}
