//! Release orchestration
//!
//! Runs the release pipeline for a checkout:
//!
//! 1. install the companion bundle and resolve the source identity
//! 2. build the source archive and populate the workspace
//! 3. copyright check, and with internal checks the release note and LICENSE
//! 4. per release preset: install packages, then compile (inline or one task
//!    per preset) and, with internal checks, generate its license manifest
//! 5. post-build command steps and the API documentation
//! 6. prune the workspace, pack the compatibility and release archives
//! 7. write the result tree as JSON and HTML and copy the final images
//!
//! Checks, compiles and documentation are steps: their failures are recorded
//! and the release continues. Everything else is structural and aborts the
//! release on failure.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::cli::output;
use crate::config::release::CommandStep;
use crate::config::Preset;
use crate::core::build_script::CompileScript;
use crate::core::checks;
use crate::core::collector::{Collector, Reporter};
use crate::core::context::{ReleaseContext, WorkspaceLayout};
use crate::core::docs::{doc_revision, find_interpreter, DocBuilder};
use crate::core::prune::PruneRules;
use crate::core::result_tree::{Metadata, ResultNode, Status};
use crate::core::step::{attempt, step};
use crate::core::artifacts;
use crate::error::ReleaseError;
use crate::infra::archive;
use crate::infra::command::CommandLine;
use crate::infra::filesystem;
use crate::infra::git::SourceIdentity;
use crate::infra::grid::GridJob;
use crate::infra::toolchain::ResolvedPackages;

/// Result group of the per-preset compiles
pub const BINARIES_GROUP: &str = "binaries";

/// Result group of the per-preset license manifests
pub const LICENSES_GROUP: &str = "binaries-licenses";

/// What a finished release produced
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    /// Aggregate status of the result tree
    pub status: Status,
    /// Final result tree
    pub tree: ResultNode,
    /// `<product>-<git_id>@<branch>`
    pub release_name: String,
    /// Compile tasks spawned (zero when compiling sequentially)
    pub spawned_workers: usize,
    /// Release archive
    pub release_archive: PathBuf,
    /// Backward-compatibility archive, when a companion bundle exists
    pub check_archive: Option<PathBuf>,
}

impl ReleaseOutcome {
    /// Process exit code: 0 when every step passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        i32::from(self.status.is_failed())
    }
}

struct PresetBuild {
    name: String,
    preset: Preset,
    packages: ResolvedPackages,
}

/// Runs releases
#[derive(Debug, Clone)]
pub struct ReleaseOrchestrator {
    ctx: Arc<ReleaseContext>,
}

impl ReleaseOrchestrator {
    /// Create an orchestrator for a prepared context
    pub fn new(ctx: ReleaseContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Release context
    pub fn context(&self) -> &ReleaseContext {
        &self.ctx
    }

    /// Run the release. The workspace and output directory must have been
    /// prepared with [`WorkspaceLayout::prepare`].
    pub async fn run(&self) -> Result<ReleaseOutcome, ReleaseError> {
        let ctx = &*self.ctx;
        tracing::info!("Releasing {} with {:?}", ctx.layout.top().display(), ctx.options);

        artifacts::install_companion(ctx).await?;
        let identity = SourceIdentity::resolve(ctx.layout.top(), ctx.options.branch.as_deref())?;
        let release_name = identity.release_name(&ctx.config.product);
        tracing::info!("Release name: {release_name}");

        let (collector, reporter) = Collector::spawn(root_node(&ctx.config.report_name, &identity));

        artifacts::create_source_archive(ctx, &identity).await?;
        self.run_checks(&reporter).await?;
        let spawned_workers = self.compile_all(&reporter).await?;
        self.post_build(&reporter, &identity).await?;

        filesystem::remove_all(&ctx.layout.workspace_tar())?;
        PruneRules::from(&ctx.config.prune).apply(&ctx.layout.workspace())?;
        let check_archive = artifacts::pack_check_archive(ctx, &release_name)?;

        drop(reporter);
        let tree = collector.finish().await?;

        let workspace = ctx.layout.workspace();
        let output_dir = ctx.layout.output();
        tree.to_file(&workspace.join(&ctx.config.json_status))?;
        let release_archive = artifacts::pack_release(ctx, &release_name)?;
        tree.to_file(&output_dir.join(&ctx.config.json_status))?;
        filesystem::write_file(
            &output_dir.join(&ctx.config.html_status),
            &tree.tree_view_render(),
        )?;

        let status = tree.status();
        println!("combined status: {status}");
        artifacts::copy_images(ctx)?;
        tree.dump();

        Ok(ReleaseOutcome {
            status,
            tree,
            release_name,
            spawned_workers,
            release_archive,
            check_archive,
        })
    }

    async fn run_checks(&self, reporter: &Reporter) -> Result<(), ReleaseError> {
        let ctx = &*self.ctx;
        step(reporter, "Copyright", checks::copyright(ctx)).await?;

        if ctx.options.internal_checks {
            match attempt("Release note", checks::release_note(ctx)).await? {
                Some(node) => reporter.record(node),
                None => reporter.record_status("Release note", Status::Failed),
            }
            step(reporter, "LicenseFile", checks::license_file(ctx)).await?;
        }
        Ok(())
    }

    async fn compile_all(&self, reporter: &Reporter) -> Result<usize, ReleaseError> {
        let ctx = &*self.ctx;
        let binaries = reporter.group(BINARIES_GROUP);
        let licenses = ctx
            .options
            .internal_checks
            .then(|| reporter.group(LICENSES_GROUP));

        let mut handles = Vec::new();
        let mut first_error = None;
        for (name, preset) in ctx.presets.release_presets(&ctx.config.targets) {
            let packages = match ctx
                .installer
                .install_preset(&ctx.runner, &name, &preset, false)
                .await
            {
                Ok(packages) => packages,
                Err(e) => {
                    first_error = Some(e);
                    break;
                }
            };
            let build = PresetBuild {
                name,
                preset,
                packages,
            };

            if ctx.options.parallel {
                let ctx = Arc::clone(&self.ctx);
                let binaries = binaries.clone();
                let licenses = licenses.clone();
                handles.push(tokio::spawn(async move {
                    compile_preset(&ctx, &build, &binaries, licenses.as_ref()).await
                }));
            } else if let Err(e) = compile_preset(ctx, &build, &binaries, licenses.as_ref()).await {
                first_error = Some(e);
                break;
            }
        }

        // Compiles already started are joined even when a later install failed
        let spawned = handles.len();
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| ReleaseError::Internal(format!("compile worker failed: {e}")))
                .and_then(|r| r);
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(spawned),
        }
    }

    async fn post_build(&self, reporter: &Reporter, identity: &SourceIdentity) -> Result<(), ReleaseError> {
        let ctx = &*self.ctx;
        for command_step in &ctx.config.post_build {
            step(reporter, &command_step.name, run_command_step(ctx, command_step)).await?;
        }

        let docs = DocBuilder::new(
            ctx.config.docs.clone(),
            find_interpreter(&ctx.config.tools.interpreters),
            doc_revision(&ctx.config.friendly_name_cur),
            identity.sha.clone(),
        );
        if docs.is_empty() {
            tracing::debug!("No documentation generators configured");
            return Ok(());
        }
        let workspace = ctx.layout.workspace();
        let destinations = [ctx.layout.output(), workspace.as_path()];
        step(reporter, "API Doc", async {
            docs.generate(&ctx.runner, &workspace, &destinations)
                .await
                .map(|_| ())
        })
        .await?;
        Ok(())
    }
}

fn root_node(name: &str, identity: &SourceIdentity) -> ResultNode {
    let mut metadata = Metadata::new();
    metadata.insert("branch".to_string(), json!(identity.branch));
    metadata.insert("sha".to_string(), json!(identity.sha_long));
    metadata.insert("name".to_string(), json!(identity.git_id));
    ResultNode::with_metadata(name, Status::Ok, metadata)
}

async fn compile_preset(
    ctx: &ReleaseContext,
    build: &PresetBuild,
    binaries: &Reporter,
    licenses: Option<&Reporter>,
) -> Result<(), ReleaseError> {
    let script = CompileScript::new(
        &build.name,
        &build.preset,
        &build.packages,
        &ctx.installer,
        &ctx.config.build,
        ctx.layout.workspace_name(),
    )
    .render(ctx.options.compile)?;

    let spinner = (!ctx.options.parallel)
        .then(|| output::create_spinner(&format!("Compiling {}", build.name)));
    // Cleared before the step reports its outcome
    let compile = async {
        let result = run_compile(ctx, &build.name, script).await;
        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }
        result
    };
    let status = step(binaries, &build.name, compile).await?;
    tracing::info!("Compile of {} finished: {status}", build.name);

    if let Some(licenses) = licenses {
        step(
            licenses,
            &build.name,
            checks::binary_licenses(ctx, &build.name, &build.preset, &build.packages),
        )
        .await?;
    }
    Ok(())
}

async fn run_compile(ctx: &ReleaseContext, name: &str, script: String) -> Result<(), ReleaseError> {
    if !ctx.options.simplegrid {
        ctx.runner.run(&CommandLine::shell(script), Some(name)).await?;
        return Ok(());
    }

    // Grid paths are relative to the checkout root
    let ws = ctx.layout.workspace_name();
    let job = GridJob::new(&ctx.config.grid, format!("{ws}/{ws}.tar"), script)
        .with_artifacts(format!("{ws}/{}", WorkspaceLayout::preset_dir(name)))
        .with_output(format!("{ws}/{name}.tar"))
        .with_log(format!("{ws}/sg-{name}.log"))
        .with_meta("config", name);
    ctx.runner.run(&job.command(), Some(name)).await?;

    let top = ctx.layout.top();
    let tar = top.join(job.output());
    archive::unpack(&tar, top)?;
    filesystem::remove_all(&tar)?;
    filesystem::copy_into(&top.join(job.log()), ctx.layout.output())?;
    Ok(())
}

async fn run_command_step(ctx: &ReleaseContext, command_step: &CommandStep) -> Result<(), ReleaseError> {
    let workspace = ctx.layout.workspace().display().to_string();
    let output_dir = ctx.layout.output().display().to_string();
    for command in &command_step.commands {
        let command = command
            .replace("{ws}", &workspace)
            .replace("{output}", &output_dir);
        ctx.runner
            .run(&CommandLine::shell(command), command_step.log.as_deref())
            .await?;
    }
    Ok(())
}
