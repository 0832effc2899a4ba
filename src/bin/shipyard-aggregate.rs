//! `shipyard-aggregate`
//!
//! Packs a released workspace with prebuilt binaries and uploads it.

use clap::Parser;

use shipyard::cli::commands::aggregate;
use shipyard::cli::output::display_error;
use shipyard::cli::AggregateCli;

#[tokio::main]
async fn main() {
    let cli = AggregateCli::parse();

    match aggregate::execute(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
