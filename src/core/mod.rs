//! Core release logic
//!
//! Process execution, filesystem and archive helpers live in
//! [`crate::infra`]; this module decides what runs when and how results are
//! reported.
//!
//! # Submodules
//!
//! - [`result_tree`] - Hierarchical pass/fail results and their reports
//! - [`collector`] - Collector task owning the result tree
//! - [`step`] - Failure-isolating step wrapper
//! - [`context`] - Release options, workspace layout and shared context
//! - [`build_script`] - Per-preset compile scripts
//! - [`checks`] - Copyright, release note and license generators
//! - [`docs`] - API documentation generation
//! - [`prune`] - Workspace pruning before packaging
//! - [`artifacts`] - Source archive, companion bundle and release archives
//! - [`orchestrator`] - The release pipeline
//! - [`project`] - Developer build directories
//! - [`aggregate`] - Artifact aggregation and upload

pub mod aggregate;
pub mod artifacts;
pub mod build_script;
pub mod checks;
pub mod collector;
pub mod context;
pub mod docs;
pub mod orchestrator;
pub mod project;
pub mod prune;
pub mod result_tree;
pub mod step;
