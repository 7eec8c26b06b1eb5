use super::api::{parse_key_path, PathParser, Rule};
use super::ast::PathSegment;

use pest::consumes_to;
use pest::fails_with;
use pest::parses_to;

fn key(k: &str) -> PathSegment {
    PathSegment::Key(k.to_string())
}

#[test]
fn test_single_identifier_tokens() {
    parses_to! {
        parser: PathParser,
        input: "items",
        rule: Rule::path,
        tokens: [
            path(0, 5, [
                identifier(0, 5),
                EOI(5, 5)
            ])
        ]
    };
}

#[test]
fn test_member_and_index_tokens() {
    parses_to! {
        parser: PathParser,
        input: "a.b[2]",
        rule: Rule::path,
        tokens: [
            path(0, 6, [
                identifier(0, 1),
                dot_member(1, 3, [identifier(2, 3)]),
                bracket_index(3, 6, [index(4, 5)]),
                EOI(6, 6)
            ])
        ]
    };
}

#[test]
fn test_leading_digit_is_rejected() {
    fails_with! {
        parser: PathParser,
        input: "1abc",
        rule: Rule::path,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_parse_nested_path() {
    let path = parse_key_path("items[0].name").unwrap();
    assert_eq!(
        path.segments,
        vec![key("items"), PathSegment::Index(0), key("name")]
    );
    assert_eq!(path.head(), "items");
    assert_eq!(path.tail().len(), 2);
}

#[test]
fn test_parse_quoted_keys() {
    let path = parse_key_path("map['k y'][\"it's\"]").unwrap();
    assert_eq!(path.segments, vec![key("map"), key("k y"), key("it's")]);
}

#[test]
fn test_parse_trims_whitespace() {
    let path = parse_key_path("  count ").unwrap();
    assert!(path.is_simple());
    assert_eq!(path.head(), "count");
}

#[test]
fn test_reserved_prefix_identifiers_parse() {
    let path = parse_key_path("$data._x").unwrap();
    assert_eq!(path.segments, vec![key("$data"), key("_x")]);
}

#[test]
fn test_malformed_paths() {
    for expr in &["", "a.", "a[", "a[x]", "a..b", "a b", "a['b]", "a[-1]"] {
        assert!(parse_key_path(expr).is_err(), "{:?} should not parse", expr);
    }
}

#[test]
fn test_display_round_trips() {
    for expr in &["a", "a.b", "items[0].name", "map['k y']", "m[\"it's\"]"] {
        let path = parse_key_path(expr).unwrap();
        assert_eq!(&path.to_string(), expr);
        assert_eq!(parse_key_path(&path.to_string()).unwrap(), path);
    }
}

#[test]
fn test_error_maps_to_syntax_error() {
    use crate::runner::ds::error::JErrorType;
    let err: JErrorType = parse_key_path("a.").unwrap_err().into();
    assert!(matches!(err, JErrorType::SyntaxError(_)));
}
