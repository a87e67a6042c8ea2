use super::*;
use crate::parser::parse;
use serde_json::json;

fn eval(source: &str) -> Result<Value> {
    let file = parse(source).expect("Failed to parse source");
    export(&file)
}

fn eval_ok(source: &str) -> Value {
    eval(source).expect("Failed to evaluate source")
}

fn eval_reason(source: &str) -> String {
    match eval(source) {
        Err(Error::Evaluation { reason, .. }) => reason,
        other => panic!("Expected evaluation error, got {other:?}"),
    }
}

#[test]
fn test_export_plain_values() {
    let value = eval_ok("a: 1\nb: \"two\"\nc: [true, null]\nd: {e: 2.5}\n");
    assert_eq!(
        value,
        json!({"a": 1, "b": "two", "c": [true, null], "d": {"e": 2.5}})
    );
}

#[test]
fn test_export_preserves_declaration_order() {
    let value = eval_ok("zeta: 1\nalpha: 2\nmid: 3\n");
    let keys: Vec<&String> = value.as_object().expect("Expected object").keys().collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);
}

#[test]
fn test_duplicate_fields_unify() {
    let value = eval_ok("a: b: 1\na: c: 2\na: b: 1\n");
    assert_eq!(value, json!({"a": {"b": 1, "c": 2}}));
}

#[test]
fn test_conflicting_scalars() {
    let reason = eval_reason("a: 1\na: 2\n");
    assert!(reason.contains("conflicting values"), "reason: {reason}");
}

#[test]
fn test_kind_constrains_value() {
    assert_eq!(eval_ok("a: string & \"x\"\n"), json!({"a": "x"}));
    assert_eq!(eval_ok("a: int\na: 3\n"), json!({"a": 3}));
    assert_eq!(eval_ok("a: number & 1.5\n"), json!({"a": 1.5}));

    let reason = eval_reason("a: int & \"x\"\n");
    assert!(reason.contains("conflicting values"), "reason: {reason}");
}

#[test]
fn test_incomplete_value_is_reported_with_path() {
    match eval("bundle: values: tag: string\n") {
        Err(Error::Evaluation { path, reason }) => {
            assert_eq!(path, "bundle.values.tag");
            assert!(reason.contains("incomplete value string"));
        }
        other => panic!("Expected evaluation error, got {other:?}"),
    }
}

#[test]
fn test_definitions_hidden_and_optional_fields_are_not_exported() {
    let value = eval_ok("#Def: {x: int}\n_hidden: 1\nopt?: string\nkept: 2\n");
    assert_eq!(value, json!({"kept": 2}));
}

#[test]
fn test_optional_field_made_concrete_is_exported() {
    let value = eval_ok("a?: string\na: \"set\"\n");
    assert_eq!(value, json!({"a": "set"}));
}

#[test]
fn test_references_resolve_lexically() {
    let value = eval_ok("name: \"api\"\nsvc: {\n\tlabel: name\n\tport: 80\n\ttarget: port\n}\n");
    assert_eq!(
        value,
        json!({"name": "api", "svc": {"label": "api", "port": 80, "target": 80}})
    );
}

#[test]
fn test_selector_references() {
    let value = eval_ok("defaults: image: tag: \"v1\"\napp: tag: defaults.image.tag\n");
    assert_eq!(
        value,
        json!({"defaults": {"image": {"tag": "v1"}}, "app": {"tag": "v1"}})
    );
}

#[test]
fn test_definition_embedding_resolves_relative_to_use_site() {
    let source = r#"
#Instance: {
	name: string
	host: name
}
a: #Instance & {name: "alpha"}
b: {
	#Instance
	name: "beta"
}
"#;
    let value = eval_ok(source);
    assert_eq!(
        value,
        json!({
            "a": {"name": "alpha", "host": "alpha"},
            "b": {"name": "beta", "host": "beta"}
        })
    );
}

#[test]
fn test_disjunction_default() {
    assert_eq!(
        eval_ok("env: *\"dev\" | \"prod\"\n"),
        json!({"env": "dev"})
    );
    assert_eq!(
        eval_ok("env: *\"dev\" | \"prod\"\nenv: \"prod\"\n"),
        json!({"env": "prod"})
    );
    assert_eq!(
        eval_ok("replicas: *1 | int\n"),
        json!({"replicas": 1})
    );
}

#[test]
fn test_disjunction_without_default_is_incomplete() {
    let reason = eval_reason("env: \"dev\" | \"prod\"\n");
    assert!(reason.contains("unresolved disjunction"), "reason: {reason}");
}

#[test]
fn test_disjunction_with_no_match() {
    let reason = eval_reason("env: \"dev\" | \"prod\"\nenv: \"qa\"\n");
    assert!(reason.contains("no disjunct"), "reason: {reason}");
}

#[test]
fn test_lists_unify_elementwise() {
    assert_eq!(
        eval_ok("l: [int, \"b\"]\nl: [1, string]\n"),
        json!({"l": [1, "b"]})
    );
    let reason = eval_reason("l: [1]\nl: [1, 2]\n");
    assert!(reason.contains("incompatible list lengths"), "reason: {reason}");
}

#[test]
fn test_struct_and_scalar_conflict() {
    let reason = eval_reason("a: {b: 1}\na: 2\n");
    assert!(reason.contains("conflicting values"), "reason: {reason}");
}

#[test]
fn test_unresolved_reference() {
    let reason = eval_reason("a: missing\n");
    assert!(reason.contains("\"missing\" not found"), "reason: {reason}");
}

#[test]
fn test_reference_cycle() {
    let reason = eval_reason("a: b\nb: a\n");
    assert!(reason.contains("cycle"), "reason: {reason}");
}

#[test]
fn test_long_reference_chain_is_bounded() {
    let mut source = String::new();
    for i in 0..1000 {
        source.push_str(&format!("a{i}: a{}\n", i + 1));
    }
    source.push_str("a1000: 1\n");
    let reason = eval_reason(&source);
    assert!(reason.contains("reference chain too long"), "reason: {reason}");
}

#[test]
fn test_short_reference_chain_resolves() {
    let value = eval_ok("a0: a1\na1: a2\na2: a3\na3: \"x\"\n");
    assert_eq!(value, json!({"a0": "x", "a1": "x", "a2": "x", "a3": "x"}));
}

#[test]
fn test_structural_cycle_is_bounded() {
    let reason = eval_reason("a: b: a\n");
    assert!(reason.contains("structural cycle"), "reason: {reason}");
}

#[test]
fn test_lookup_and_exists() {
    let file = parse("a: b: c: 1\n#D: x: 2\n").expect("Failed to parse source");
    let path = |p: &str| -> Vec<String> { p.split('.').map(String::from).collect() };

    assert_eq!(
        lookup(&file, &path("a.b")).expect("lookup failed"),
        Some(json!({"c": 1}))
    );
    assert_eq!(lookup(&file, &path("a.x")).expect("lookup failed"), None);
    assert!(exists(&file, &path("#D.x")).expect("exists failed"));
    assert!(!exists(&file, &path("a.b.c.d")).expect("exists failed"));
}
