//! Global runtime configuration (`Vue.config`) and its TOML file form.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

lazy_static! {
    static ref DEFAULT_KEY_CODES: HashMap<&'static str, KeyCode> = {
        let mut m = HashMap::new();
        m.insert("esc", KeyCode::Single(27));
        m.insert("tab", KeyCode::Single(9));
        m.insert("enter", KeyCode::Single(13));
        m.insert("space", KeyCode::Single(32));
        m.insert("up", KeyCode::Single(38));
        m.insert("left", KeyCode::Single(37));
        m.insert("right", KeyCode::Single(39));
        m.insert("down", KeyCode::Single(40));
        m.insert("delete", KeyCode::Multiple(vec![8, 46]));
        m
    };
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A key alias maps to one key code or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyCode {
    Single(u32),
    Multiple(Vec<u32>),
}

impl KeyCode {
    pub fn codes(&self) -> Vec<u32> {
        match self {
            KeyCode::Single(c) => vec![*c],
            KeyCode::Multiple(cs) => cs.clone(),
        }
    }

    pub fn matches(&self, code: u32) -> bool {
        match self {
            KeyCode::Single(c) => *c == code,
            KeyCode::Multiple(cs) => cs.contains(&code),
        }
    }
}

/// Receives every error raised inside hooks, watcher callbacks and render
/// functions, along with a short description of where it happened.
pub type ErrorHandler = Rc<dyn Fn(&JErrorType, &str)>;

/// Merges a custom option: `(parent value, child value) -> merged value`.
pub type MergeStrategy = Rc<dyn Fn(&JsValue, &JsValue) -> JsValue>;

/// The runtime's global settings.
///
/// Data fields load from TOML with the runtime's own (camelCase) names:
/// ```toml
/// silent = true
/// ignoredElements = ["my-widget"]
///
/// [keyCodes]
/// f1 = 112
/// media = [179, 180]
/// ```
/// `errorHandler` and `optionMergeStrategies` hold functions and are set in code.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Suppress logging of unhandled runtime errors and warnings.
    pub silent: bool,
    pub devtools: bool,
    /// Custom element tags the runtime leaves alone.
    pub ignored_elements: Vec<String>,
    pub key_codes: IndexMap<String, KeyCode>,
    #[serde(skip)]
    pub error_handler: Option<ErrorHandler>,
    #[serde(skip)]
    pub option_merge_strategies: IndexMap<String, MergeStrategy>,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolves a key alias; configured codes shadow the built-in ones.
    pub fn key_code(&self, alias: &str) -> Option<KeyCode> {
        self.key_codes
            .get(alias)
            .or_else(|| DEFAULT_KEY_CODES.get(alias))
            .cloned()
    }

    pub fn is_ignored_element(&self, tag: &str) -> bool {
        self.ignored_elements.iter().any(|t| t == tag)
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn with_merge_strategy(mut self, option: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.option_merge_strategies.insert(option.into(), strategy);
        self
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("silent", &self.silent)
            .field("devtools", &self.devtools)
            .field("ignored_elements", &self.ignored_elements)
            .field("key_codes", &self.key_codes)
            .field("error_handler", &self.error_handler.is_some())
            .field(
                "option_merge_strategies",
                &self.option_merge_strategies.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config() {
        let config = GlobalConfig::parse("").unwrap();
        assert!(!config.silent);
        assert!(config.ignored_elements.is_empty());
        assert!(config.key_codes.is_empty());
        assert!(config.error_handler.is_none());
    }

    #[test]
    fn test_parse_camel_case_fields() {
        let config = GlobalConfig::parse(
            r#"
            silent = true
            devtools = true
            ignoredElements = ["x-chart"]

            [keyCodes]
            f1 = 112
            media = [179, 180]
            "#,
        )
        .unwrap();
        assert!(config.silent);
        assert!(config.devtools);
        assert!(config.is_ignored_element("x-chart"));
        assert_eq!(config.key_code("f1"), Some(KeyCode::Single(112)));
        assert_eq!(config.key_code("media"), Some(KeyCode::Multiple(vec![179, 180])));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = GlobalConfig::parse("slient = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builtin_key_aliases() {
        let config = GlobalConfig::new();
        assert_eq!(config.key_code("enter"), Some(KeyCode::Single(13)));
        assert!(config.key_code("delete").unwrap().matches(46));
        assert!(config.key_code("delete").unwrap().matches(8));
        assert_eq!(config.key_code("f13"), None);
    }

    #[test]
    fn test_configured_alias_shadows_builtin() {
        let config = GlobalConfig::parse("[keyCodes]\nenter = 108\n").unwrap();
        assert_eq!(config.key_code("enter").unwrap().codes(), vec![108]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "silent = true").unwrap();
        let config = GlobalConfig::load(file.path()).unwrap();
        assert!(config.silent);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GlobalConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
