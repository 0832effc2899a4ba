//! `shipyard-aggregate` command

use anyhow::Result;

use crate::cli::output::status;
use crate::cli::{logging, AggregateCli};
use crate::core::aggregate::Aggregator;

/// Aggregate the released workspace with prebuilt binaries
pub async fn execute(cli: &AggregateCli) -> Result<i32> {
    logging::init(cli.common.verbose, None)?;
    let top = cli.common.top()?;
    let (config, _) = super::load_configs(&cli.common, &top)?;

    let branch = cli.branch.as_deref().filter(|b| !b.is_empty());
    let outcome = Aggregator::new(&top, config)
        .with_workspace(&cli.workspace)
        .with_binaries(&cli.binaries)
        .run(branch)
        .await?;

    for image in &outcome.images {
        println!("{} {}", status::INFO, image.display());
    }
    if !outcome.uploaded {
        println!("{} No upload command configured", status::WARNING);
    }
    println!("{} {}", status::SUCCESS, outcome.archive.display());
    Ok(0)
}
