//! `shipyard` release command

use anyhow::{Context, Result};

use crate::cli::output::{status, status_prefix};
use crate::cli::{logging, ReleaseCli};
use crate::config::defaults;
use crate::core::context::ReleaseContext;
use crate::core::orchestrator::ReleaseOrchestrator;

/// Execute a release
pub async fn execute(cli: &ReleaseCli) -> Result<i32> {
    let top = cli.common.top()?;
    let (config, presets) = super::load_configs(&cli.common, &top)?;
    let internal_tools = config.internal_tools_available(&top);

    // Options are validated before anything on disk is touched
    let options = cli.options().normalize(internal_tools)?;
    let ctx = ReleaseContext::new(&top, config, presets, options);
    ctx.layout
        .prepare()
        .context("Failed to prepare the workspace")?;
    logging::init(
        cli.common.verbose,
        Some(&ctx.layout.output().join(defaults::BUILD_LOG)),
    )?;

    if cli.no_compile && ctx.options.compile {
        tracing::warn!("--no-compile needs the internal tools, compiling anyway");
    }
    tracing::info!("Release options: {:?}", ctx.options);

    let outcome = ReleaseOrchestrator::new(ctx).run().await?;

    println!(
        "{} Release archive: {}",
        status::INFO,
        outcome.release_archive.display()
    );
    if let Some(check) = &outcome.check_archive {
        println!("{} Compatibility archive: {}", status::INFO, check.display());
    }
    println!(
        "{} {}: {}",
        status_prefix(&outcome.status),
        outcome.release_name,
        outcome.status
    );
    Ok(outcome.exit_code())
}
