//! Quarry CLI - Local SQL query-engine clusters on Docker

use std::process::ExitCode;

use clap::Parser;

use quarry_cli::cli::Cli;
use quarry_cli::domain::{USER_ERROR_EXIT, UserError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // User errors: short message, optional hint, distinct exit code,
            // no error chain. Everything else: chain only in verbose mode.
            if let Some(user) = e.downcast_ref::<UserError>() {
                eprintln!("[e] {user}");
                if let Some(hint) = user.hint() {
                    eprintln!("[i] hint: {hint}");
                }
                ExitCode::from(USER_ERROR_EXIT)
            } else {
                eprintln!("[e] {e}");
                if verbose {
                    for cause in e.chain().skip(1) {
                        eprintln!("    caused by: {cause}");
                    }
                }
                ExitCode::FAILURE
            }
        }
    }
}
