//! End-to-end tests for the scan and update pipeline.
//!
//! These tests run the `scan` command against a tree of manifests and feed its
//! JSON output into `update deployments`, the same way a deployment job pipes
//! one into the other.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tracing::info;
use updater_cli::commands::scan_cmd::{self, ScanArgs};
use updater_cli::commands::update_cmd::{self, UpdateCommands};
use updater_cli::config::UpdaterConfig;
use updater_cli::errors::Error;

/// Initialize logging for tests.
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_test_writer()
        .try_init();
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, contents).expect("Failed to write file");
}

fn bundle(app: &str, tag: &str) -> String {
    format!(
        "package main\n\nbundle: {{\n\tapiVersion: \"v1alpha1\"\n\tname: \"{app}\"\n\tinstances: {app}: {{\n\t\tnamespace: \"{app}\"\n\t\tvalues: image: tag: \"{tag}\"\n\t}}\n}}\n"
    )
}

fn scan(root: &Path, templates: Vec<(String, String)>) -> String {
    let args = ScanArgs {
        path: root.to_path_buf(),
        templates,
    };
    let mut out = Vec::new();
    scan_cmd::execute(&args, &UpdaterConfig::default(), &mut out).expect("Scan failed");
    String::from_utf8(out).expect("Output is not UTF-8")
}

fn update_deployments(root: &Path, environment: &str, json: &str, atomic: bool) -> Result<(), Error> {
    let cmd = UpdateCommands::Deployments {
        root_dir: root.to_path_buf(),
        environment: environment.to_string(),
        input: None,
        atomic,
    };
    update_cmd::execute(&cmd, &UpdaterConfig::default(), &mut json.as_bytes(), &mut Vec::new())
}

fn read_tag(bundle: &Path, instance: &str) -> serde_json::Value {
    let doc = cue_document::read_file(bundle).expect("Failed to read bundle");
    let path = cue_document::PathExpression::from_segments([
        "bundle",
        "instances",
        instance,
        "values",
        "image",
        "tag",
    ])
    .expect("Failed to build path");
    doc.lookup(&path).expect("Failed to look up tag")
}

#[test]
fn test_scan_then_update_deployments() {
    init_test_logging();
    info!("Testing scan output piped into update deployments");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manifests = temp_dir.path().join("services");
    let deploy = temp_dir.path().join("deploy");

    write(
        &manifests,
        "api/deployment.yml",
        "overrides:\n  - app: api\n    path: image.tag\n    value: TAG\n",
    );
    write(
        &manifests,
        "web/deployment.yml",
        "overrides:\n  - app: web\n    instance: web-canary\n    path: image.tag\n    value: TAG\n",
    );
    write(&manifests, "broken/deployment.yml", "overrides: [unterminated");
    write(&deploy, "prod/api/bundle.cue", &bundle("api", "v1"));
    write(&deploy, "prod/web/bundle.cue", &bundle("web", "v1"));

    let json = scan(&manifests, vec![("TAG".to_string(), "v2".to_string())]);
    update_deployments(&deploy, "prod", &json, false).expect("Update failed");

    let api = deploy.join("prod/api/bundle.cue");
    let web = deploy.join("prod/web/bundle.cue");
    assert_eq!(read_tag(&api, "api"), "v2");
    assert_eq!(read_tag(&web, "web"), "v1");
    assert_eq!(read_tag(&web, "web-canary"), "v2");
}

#[test]
fn test_atomic_update_leaves_environment_untouched_on_failure() {
    init_test_logging();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let original = bundle("api", "v1");
    write(temp_dir.path(), "staging/api/bundle.cue", &original);

    let json = r#"[
        {"app": "api", "path": "image.tag", "value": "v2"},
        {"app": "worker", "path": "image.tag", "value": "v2"}
    ]"#;
    let result = update_deployments(temp_dir.path(), "staging", json, true);

    assert!(result.is_err());
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("staging/api/bundle.cue"))
            .expect("Failed to read bundle"),
        original
    );
}

#[test]
fn test_environments_are_isolated() {
    init_test_logging();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write(temp_dir.path(), "dev/api/bundle.cue", &bundle("api", "v1"));
    write(temp_dir.path(), "prod/api/bundle.cue", &bundle("api", "v1"));

    update_deployments(
        temp_dir.path(),
        "dev",
        r#"[{"app": "api", "path": "image.tag", "value": "v9"}]"#,
        false,
    )
    .expect("Update failed");

    assert_eq!(read_tag(&temp_dir.path().join("dev/api/bundle.cue"), "api"), "v9");
    assert_eq!(read_tag(&temp_dir.path().join("prod/api/bundle.cue"), "api"), "v1");
}
