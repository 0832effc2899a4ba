//! `shipyard-project` command

use anyhow::Result;

use crate::cli::output::status;
use crate::cli::{logging, ProjectCli};
use crate::core::project::ProjectCreator;

fn print_presets(creator: &ProjectCreator) {
    println!("Valid presets:");
    for name in creator.preset_names() {
        println!("    {name}");
    }
}

/// Create and configure a build directory
pub async fn execute(cli: &ProjectCli) -> Result<i32> {
    logging::init(cli.common.verbose, None)?;
    let top = cli.common.top()?;
    let (config, presets) = super::load_configs(&cli.common, &top)?;
    let creator = ProjectCreator::new(&top, config, presets);

    let Some(preset) = cli.preset.as_deref() else {
        println!("Usage: shipyard-project <preset> [output-folder]");
        println!();
        print_presets(&creator);
        return Ok(1);
    };
    if !creator.preset_names().iter().any(|name| name == preset) {
        eprintln!("{} Not found: \"{preset}\"", status::ERROR);
        print_presets(&creator);
        return Ok(1);
    }

    let outcome = creator.create(preset, cli.output.as_deref()).await?;
    println!(
        "{} Configured {} ({})",
        status::SUCCESS,
        outcome.build_dir.display(),
        outcome.packages.toolchain.name
    );
    Ok(0)
}
