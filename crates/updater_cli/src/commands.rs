//! Command modules for the updater CLI.
//!
//! - `scan_cmd`: finds deployment manifests and prints their overrides as JSON
//! - `update_cmd`: applies overrides to a single file, a bundle, or a whole
//!   environment

pub mod scan_cmd;
pub mod update_cmd;
