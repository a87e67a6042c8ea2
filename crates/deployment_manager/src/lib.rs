//! Deployment override pipeline
//!
//! This crate finds `deployment.yml` manifests in a directory tree, fills in
//! template placeholders in the overrides they declare, and applies those
//! overrides to the bundle files of an environment.
//!
//! ```text
//! scan (ManifestScanner) -> apply_templates -> BatchApplier::apply_all
//! ```

pub mod applier;
pub mod errors;
pub mod manifest;
pub mod scanner;
pub mod templates;

pub use applier::{write_bundle, BatchApplier, BUNDLE_FILENAME};
pub use errors::{DeploymentError, DeploymentResult};
pub use manifest::{DeploymentFile, OverrideConfig, DEPLOYMENT_FILENAME};
pub use scanner::{collect_overrides, scan_for_deployment_files, ManifestScanner};
pub use templates::{apply_template_value, apply_templates, parse_template_pair};
