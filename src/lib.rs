//! Shipyard - release automation for embedded networking SDKs
//!
//! Builds every release preset of an SDK checkout, runs the copyright,
//! release-note and license checks, packages the release archives and
//! reports the outcome of every step as a result tree.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing, logging setup and output formatting
//! - [`core`] - Release pipeline, result reporting and build logic
//! - [`infra`] - Processes, filesystem, archives, git and package installs
//! - [`config`] - Configuration files and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
