//! CLI command implementations
//!
//! One submodule per binary. Each `execute` returns the process exit code.

pub mod aggregate;
pub mod docs;
pub mod project;
pub mod release;

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::CommonArgs;
use crate::config::{PresetSet, ReleaseConfig};
use crate::core::context::ReleaseContext;

/// Load the configuration files named by the common arguments
pub(crate) fn load_configs(common: &CommonArgs, top: &Path) -> Result<(ReleaseConfig, PresetSet)> {
    ReleaseContext::load_configs(top, common.release_config.as_deref(), common.presets.as_deref())
        .context("Failed to load configuration")
}
