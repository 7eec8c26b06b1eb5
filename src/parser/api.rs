use pest::error::{Error, ErrorVariant};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{KeyPath, PathSegment};
use crate::runner::ds::error::JErrorType;

#[derive(Parser)]
#[grammar = "parser/path_grammar.pest"] // relative to src
pub struct PathParser;

/// Parses a watch expression such as `items[0].name` or `map['k y']`.
/// Surrounding whitespace is ignored.
pub fn parse_key_path(expr: &str) -> Result<KeyPath, Error<Rule>> {
    let mut pairs = PathParser::parse(Rule::path, expr.trim())?;
    let path = match pairs.next() {
        Some(p) => p,
        None => {
            return Err(Error::new_from_pos(
                ErrorVariant::CustomError {
                    message: "empty key path".to_string(),
                },
                pest::Position::from_start(expr),
            ))
        }
    };
    let mut segments = vec![];
    for pair in path.into_inner() {
        match pair.as_rule() {
            Rule::identifier => segments.push(PathSegment::Key(pair.as_str().to_string())),
            Rule::dot_member => segments.push(PathSegment::Key(inner_str(pair))),
            Rule::bracket_key => segments.push(PathSegment::Key(inner_str(pair))),
            Rule::bracket_index => segments.push(build_index(pair)?),
            Rule::EOI => {}
            _ => return Err(get_unexpected_error(&pair)),
        }
    }
    Ok(KeyPath { segments })
}

fn inner_str(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn build_index(pair: Pair<Rule>) -> Result<PathSegment, Error<Rule>> {
    let span = pair.as_span();
    let digits = inner_str(pair);
    digits.parse::<usize>().map(PathSegment::Index).map_err(|_| {
        Error::new_from_span(
            ErrorVariant::CustomError {
                message: format!("index out of range: {}", digits),
            },
            span,
        )
    })
}

fn get_unexpected_error(pair: &Pair<Rule>) -> Error<Rule> {
    Error::new_from_span(
        ErrorVariant::CustomError {
            message: format!("unexpected rule {:?}", pair.as_rule()),
        },
        pair.as_span(),
    )
}

impl From<Error<Rule>> for JErrorType {
    fn from(e: Error<Rule>) -> Self {
        JErrorType::SyntaxError(format!("invalid key path: {}", e))
    }
}
