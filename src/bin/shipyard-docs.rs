//! `shipyard-docs`
//!
//! Generates the API documentation of a checkout.

use clap::Parser;

use shipyard::cli::commands::docs;
use shipyard::cli::output::display_error;
use shipyard::cli::DocsCli;

#[tokio::main]
async fn main() {
    let cli = DocsCli::parse();

    match docs::execute(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
