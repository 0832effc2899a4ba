//! `shipyard-docs` command

use anyhow::{Context, Result};

use crate::cli::output::status;
use crate::cli::{logging, DocsCli};
use crate::core::context::WorkspaceLayout;
use crate::core::docs::{doc_revision, find_interpreter, DocBuilder};
use crate::infra::command::{CommandRunner, StderrPolicy};
use crate::infra::filesystem;
use crate::infra::git::SourceIdentity;

/// Generate the API documentation in the checkout
pub async fn execute(cli: &DocsCli) -> Result<i32> {
    logging::init(cli.common.verbose, None)?;
    let top = cli.common.top()?;
    let (config, _) = super::load_configs(&cli.common, &top)?;

    let layout = WorkspaceLayout::new(&top, &config);
    filesystem::create_dir_all(layout.output()).context("Failed to create the output directory")?;
    let identity = SourceIdentity::resolve(&top, None)?;

    let builder = DocBuilder::new(
        config.docs.clone(),
        find_interpreter(&config.tools.interpreters),
        doc_revision(&config.friendly_name_cur),
        identity.sha,
    )
    .with_policy(StderrPolicy::Strict);
    if builder.is_empty() {
        println!("{} No documentation generators configured", status::WARNING);
        return Ok(0);
    }

    let runner = CommandRunner::new(layout.output()).with_working_dir(&top);
    let workspace = layout.workspace();
    let documents = builder
        .generate(&runner, &top, &[layout.output(), workspace.as_path()])
        .await
        .context("Documentation generation failed")?;
    for document in documents {
        println!("{} {}", status::SUCCESS, document.display());
    }
    Ok(0)
}
