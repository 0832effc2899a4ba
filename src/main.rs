//! Shipyard CLI - release automation for embedded networking SDKs
//!
//! Entry point for the `shipyard` release command.

use clap::Parser;

use shipyard::cli::commands::release;
use shipyard::cli::output::display_error;
use shipyard::cli::ReleaseCli;

#[tokio::main]
async fn main() {
    let cli = ReleaseCli::parse();

    match release::execute(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
