//! Global assets and settings of a runtime.
//!
//! - [`AssetRegistry`]: directives, element directives, filters, global
//!   components and installed plugins, keyed by name.
//! - [`GlobalConfig`]: the global settings object, loadable from TOML.
//! - [`RuntimePlugin`]: a bundle of registrations installed through `use`.

pub mod config;
pub mod registry;
pub mod types;

pub use config::{ConfigError, GlobalConfig, KeyCode};
pub use registry::AssetRegistry;
pub use types::{DirectiveBinding, DirectiveDef, FilterDef, PluginInfo, RuntimePlugin};
