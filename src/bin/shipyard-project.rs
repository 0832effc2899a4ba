//! `shipyard-project`
//!
//! Creates a CMake build directory for one preset.

use clap::Parser;

use shipyard::cli::commands::project;
use shipyard::cli::output::display_error;
use shipyard::cli::ProjectCli;

#[tokio::main]
async fn main() {
    let cli = ProjectCli::parse();

    match project::execute(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
