//! Command-line interface module
//!
//! Argument parsing for the four binaries and the glue that turns parsed
//! arguments into core calls. Business logic lives in [`crate::core`].

pub mod commands;
pub mod logging;
pub mod output;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Args, Parser};

use crate::config::defaults;
use crate::core::context::ReleaseOptions;

/// Version string including the commit the tool was built from
pub fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| match option_env!("VERGEN_GIT_SHA") {
        Some(sha) => format!("{} ({sha})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Arguments shared by every binary
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Checkout to work in
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub top: PathBuf,

    /// Release configuration [default: <top>/.cmake/release.yaml]
    #[arg(long, value_name = "FILE")]
    pub release_config: Option<PathBuf>,

    /// Preset definitions [default: <top>/.cmake/cmake-presets.yaml]
    #[arg(long, value_name = "FILE")]
    pub presets: Option<PathBuf>,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CommonArgs {
    /// Absolute checkout path
    pub fn top(&self) -> Result<PathBuf> {
        self.top
            .canonicalize()
            .with_context(|| format!("Checkout {} not found", self.top.display()))
    }
}

/// Build, check and package a release of the checkout
#[derive(Parser, Debug)]
#[command(name = "shipyard")]
#[command(author, version = long_version(), about, long_about = None)]
pub struct ReleaseCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Compile all presets concurrently
    #[arg(short = 'j', long)]
    pub parallel: bool,

    /// Compile on the build grid (implies --parallel)
    #[arg(short, long)]
    pub simplegrid: bool,

    /// Skip compilation (implies --internal-checks when the tools exist)
    #[arg(long)]
    pub no_compile: bool,

    /// Run the internal release checks (release note, licenses)
    #[arg(short, long)]
    pub internal_checks: bool,

    /// Branch name recorded in the release [default: current branch]
    #[arg(long, env = "BRANCH_NAME")]
    pub branch: Option<String>,
}

impl ReleaseCli {
    /// Release switches as given, before normalization
    pub fn options(&self) -> ReleaseOptions {
        ReleaseOptions::new()
            .with_parallel(self.parallel)
            .with_simplegrid(self.simplegrid)
            .with_no_compile(self.no_compile)
            .with_internal_checks(self.internal_checks)
            .with_branch(self.branch.clone())
    }
}

/// Create a CMake build directory for one preset
#[derive(Parser, Debug)]
#[command(name = "shipyard-project")]
#[command(author, version = long_version(), about, long_about = None)]
pub struct ProjectCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Preset to configure; lists the presets when omitted
    pub preset: Option<String>,

    /// Build directory [default: build-<preset>]
    pub output: Option<PathBuf>,
}

/// Generate the API documentation of the checkout
#[derive(Parser, Debug)]
#[command(name = "shipyard-docs")]
#[command(author, version = long_version(), about, long_about = None)]
pub struct DocsCli {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Combine a released workspace with prebuilt binaries and upload it
#[derive(Parser, Debug)]
#[command(name = "shipyard-aggregate")]
#[command(author, version = long_version(), about, long_about = None)]
pub struct AggregateCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Released workspace directory
    #[arg(long, default_value = defaults::AGGREGATE_WORKSPACE)]
    pub workspace: String,

    /// Tar holding the prebuilt binaries
    #[arg(long, default_value = defaults::AGGREGATE_BINARIES)]
    pub binaries: String,

    /// Branch name recorded in the archive name [default: current branch]
    #[arg(long, env = "BRANCH_NAME")]
    pub branch: Option<String>,
}
