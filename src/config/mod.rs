//! Configuration and constants
//!
//! - [`defaults`] - Default values and fixed conventions
//! - [`release`] - Release settings (`release.yaml`)
//! - [`presets`] - Build presets (`cmake-presets.yaml`)

pub mod defaults;
pub mod presets;
pub mod release;

pub use presets::{PackageRef, Preset, PresetSet};
pub use release::ReleaseConfig;
