//! Infrastructure layer
//!
//! Handles all I/O operations: external processes, filesystem, archives,
//! package installation and repository metadata.

pub mod archive;
pub mod command;
pub mod filesystem;
pub mod git;
pub mod grid;
pub mod toolchain;
