use super::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn path(s: &str) -> PathExpression {
    PathExpression::parse(s).expect("Failed to parse path")
}

#[test]
fn test_compile_and_lookup() {
    let doc = ConfigDocument::compile("package deploy\n\nimage: tag: \"v1\"\n")
        .expect("Failed to compile document");

    assert_eq!(doc.package(), Some("deploy"));
    assert_eq!(doc.lookup(&path("image.tag")).expect("Lookup failed"), json!("v1"));
    assert_eq!(
        doc.lookup(&path("image")).expect("Lookup failed"),
        json!({"tag": "v1"})
    );
}

#[test]
fn test_lookup_missing_segment() {
    let doc = ConfigDocument::compile("a: b: 1\n").expect("Failed to compile document");

    for missing in ["c", "a.c", "a.b.c"] {
        match doc.lookup(&path(missing)) {
            Err(Error::PathNotFound { path }) => assert_eq!(path, missing),
            other => panic!("Expected PathNotFound for {missing}, got {other:?}"),
        }
    }
}

#[test]
fn test_exists_does_not_require_concrete_values() {
    let doc = ConfigDocument::compile("a: string\n").expect("Failed to compile document");

    assert!(doc.exists(&path("a")).expect("exists failed"));
    assert!(!doc.exists(&path("b")).expect("exists failed"));
    assert!(matches!(doc.to_value(), Err(Error::Evaluation { .. })));
}

#[test]
fn test_compile_rejects_invalid_source() {
    match ConfigDocument::compile("a: {\n\tb: 1\n\tc: \n}") {
        Err(Error::Compile { line, .. }) => assert!(line >= 3),
        other => panic!("Expected compile error, got {other:?}"),
    }
}

#[test]
fn test_compile_rejects_invalid_utf8() {
    let bytes = b"a: 1\nb: \"\xff\"\n";

    match ConfigDocument::compile(bytes) {
        Err(Error::Compile { line, column, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, 5);
        }
        other => panic!("Expected compile error, got {other:?}"),
    }
}

#[test]
fn test_compile_accepts_json() {
    let doc = ConfigDocument::compile(r#"{"a": {"b": [1, "two"]}, "c": null}"#)
        .expect("Failed to compile document");

    assert_eq!(
        doc.to_value().expect("Failed to export document"),
        json!({"a": {"b": [1, "two"]}, "c": null})
    );
}

#[test]
fn test_render_drops_comments_and_definitions() {
    let source = "package main\n\n// note\n#Port: int\nport: #Port & 8080 @tag(port)\nname: \"api\"\n";
    let doc = ConfigDocument::compile(source).expect("Failed to compile document");

    assert_eq!(
        doc.render().expect("Failed to render document"),
        "package main\n\nport: 8080\nname: \"api\"\n"
    );
}

#[test]
fn test_read_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file = temp_dir.path().join("bundle.cue");
    fs::write(&file, "bundle: name: \"svc\"\n").expect("Failed to write file");

    let doc = read_file(&file).expect("Failed to read file");

    assert_eq!(doc.lookup(&path("bundle.name")).expect("Lookup failed"), json!("svc"));
}

#[test]
fn test_read_file_missing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file = temp_dir.path().join("absent.cue");

    assert!(matches!(read_file(&file), Err(Error::SourceRead { .. })));
}
