use super::*;

fn tokens(source: &str) -> Vec<Token> {
    tokenize(source)
        .expect("Failed to tokenize source")
        .into_iter()
        .map(|t| t.token)
        .collect()
}

#[test]
fn test_tokenize_simple_field() {
    assert_eq!(
        tokens("foo: 1"),
        vec![
            Token::Ident("foo".to_string()),
            Token::Colon,
            Token::Number("1".to_string()),
            Token::Comma,
            Token::Eof,
        ]
    );
}

#[test]
fn test_newline_inserts_comma_after_values_only() {
    let toks = tokens("a: {\n\tb: \"x\"\n}\n");
    assert_eq!(
        toks,
        vec![
            Token::Ident("a".to_string()),
            Token::Colon,
            Token::LBrace,
            Token::Ident("b".to_string()),
            Token::Colon,
            Token::String("x".to_string()),
            Token::Comma,
            Token::RBrace,
            Token::Comma,
            Token::Eof,
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    let toks = tokens("// leading comment\nfoo: true // trailing\n");
    assert_eq!(
        toks,
        vec![
            Token::Ident("foo".to_string()),
            Token::Colon,
            Token::Ident("true".to_string()),
            Token::Comma,
            Token::Eof,
        ]
    );
}

#[test]
fn test_string_escapes() {
    let toks = tokens(r#"s: "tab\there \"quoted\" é""#);
    assert_eq!(toks[2], Token::String("tab\there \"quoted\" é".to_string()));
}

#[test]
fn test_surrogate_pair_escape() {
    let toks = tokens(r#"s: "\ud83d\ude00""#);
    assert_eq!(toks[2], Token::String("😀".to_string()));
}

#[test]
fn test_multiline_string_strips_indentation() {
    let source = "s: \"\"\"\n\t\tline one\n\t\t  line two\n\t\t\"\"\"\n";
    let toks = tokens(source);
    assert_eq!(toks[2], Token::String("line one\n  line two".to_string()));
}

#[test]
fn test_numbers() {
    let toks = tokens("a: 1_000, b: 2.5, c: 1e10, d: 3.0E-2");
    let numbers: Vec<Token> = toks
        .into_iter()
        .filter(|t| matches!(t, Token::Number(_)))
        .collect();
    assert_eq!(
        numbers,
        vec![
            Token::Number("1000".to_string()),
            Token::Number("2.5".to_string()),
            Token::Number("1e10".to_string()),
            Token::Number("3.0e-2".to_string()),
        ]
    );
}

#[test]
fn test_attribute_is_single_token() {
    let toks = tokens("tag: string @timoni(runtime:string:TAG)\n");
    assert_eq!(
        toks,
        vec![
            Token::Ident("tag".to_string()),
            Token::Colon,
            Token::Ident("string".to_string()),
            Token::Attribute,
            Token::Comma,
            Token::Eof,
        ]
    );
}

#[test]
fn test_definition_and_hidden_identifiers() {
    let toks = tokens("#Def: _hidden");
    assert_eq!(toks[0], Token::Ident("#Def".to_string()));
    assert_eq!(toks[2], Token::Ident("_hidden".to_string()));
}

#[test]
fn test_ellipsis() {
    let toks = tokens("[...]");
    assert_eq!(toks[1], Token::Ellipsis);
}

#[test]
fn test_interpolation_is_rejected() {
    let result = tokenize(r#"s: "hello \(name)""#);
    match result {
        Err(Error::Compile { message, .. }) => assert!(message.contains("interpolation")),
        other => panic!("Expected compile error, got {other:?}"),
    }
}

#[test]
fn test_unterminated_string_reports_position() {
    let result = tokenize("a: 1\nb: \"open\n");
    match result {
        Err(Error::Compile { line, column, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, 4);
        }
        other => panic!("Expected compile error, got {other:?}"),
    }
}

#[test]
fn test_unsupported_operator() {
    let result = tokenize("a: 1 + 2");
    assert!(matches!(result, Err(Error::Compile { .. })));
}

#[test]
fn test_hex_literal_is_rejected() {
    let result = tokenize("a: 0x10");
    assert!(matches!(result, Err(Error::Compile { .. })));
}
