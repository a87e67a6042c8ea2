use super::*;

#[test]
fn test_parse_manifest() {
    let yaml = r#"
overrides:
  - app: foo
    path: bar
    value: baz
  - app: api
    instance: api-canary
    path: image.tag
    value: "1.2"
"#;

    let manifest: DeploymentFile = serde_yaml::from_str(yaml).expect("Failed to parse manifest");

    assert_eq!(
        manifest.overrides,
        vec![
            OverrideConfig::new("foo", "bar", "baz"),
            OverrideConfig::new("api", "image.tag", "1.2").with_instance("api-canary"),
        ]
    );
}

#[test]
fn test_manifest_without_overrides_is_empty() {
    let manifest: DeploymentFile =
        serde_yaml::from_str("other: field\n").expect("Failed to parse manifest");
    assert!(manifest.overrides.is_empty());
}

#[test]
fn test_override_requires_value() {
    let yaml = "overrides:\n  - app: foo\n    path: bar\n";
    assert!(serde_yaml::from_str::<DeploymentFile>(yaml).is_err());
}

#[test]
fn test_override_serializes_empty_instance() {
    let json = serde_json::to_string(&OverrideConfig::new("foo", "bar", "baz"))
        .expect("Failed to serialize override");
    assert_eq!(
        json,
        r#"{"app":"foo","instance":"","path":"bar","value":"baz"}"#
    );
}

#[test]
fn test_instance_name_defaults_to_app() {
    let plain = OverrideConfig::new("svc", "a", "b");
    assert_eq!(plain.instance_name(), "svc");

    let named = plain.with_instance("svc-blue");
    assert_eq!(named.instance_name(), "svc-blue");
}
