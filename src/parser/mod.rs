mod api;
pub mod ast;
#[cfg(test)]
mod unit_tests;

pub use api::{parse_key_path, PathParser, Rule};
pub use ast::{KeyPath, PathSegment};
