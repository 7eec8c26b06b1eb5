//! # vmkit - typed view-model adapter for a reactive UI runtime
//!
//! A strongly typed front for a Vue-style reactivity runtime:
//! - Configuration builder that turns methods, computed properties and hooks
//!   into ordered mixin fragments
//! - View-model facade over live instances (watch, events, mounting, data
//!   transfer to and from plain objects and JSON)
//! - Identity registry from data objects to their view models
//! - Creator pool for reusable component data
//! - Directive, filter, plugin and global-config registration
//! - A headless, in-process runtime implementing the runtime traits
//!
//! ## Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use vmkit::adapter::{Host, ViewModel};
//! use vmkit::runner::ds::{JsObject, JsValue};
//! use vmkit::runner::HeadlessRuntime;
//!
//! let runtime = HeadlessRuntime::new();
//! let host = Host::new(Rc::new(runtime.clone()));
//!
//! let model = JsObject::from_entries(vec![("count", JsValue::from(1))]);
//! let vm = ViewModel::new(&host, "#app", &model).unwrap();
//!
//! vm.set("count", 2).unwrap();
//! assert_eq!(vm.get("count").unwrap(), JsValue::from(2));
//! assert_eq!(host.view_model_of(&model).unwrap(), vm);
//! ```
//!
//! ## Watching
//!
//! Watch expressions are key paths such as `a`, `a.b`, `items[0].name` or
//! `map['k y']`. Callbacks run when the runtime flushes its update queue;
//! with the headless runtime that is an explicit `flush()`.
//!
//! ```ignore
//! let stop = vm.watch("count", |v| {
//!     println!("count is now {}", v);
//!     Ok(())
//! })?;
//! vm.set("count", 3)?;
//! runtime.flush();
//! stop.unwatch();
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser for watch key paths
//! - **[`runner`]** - The runtime boundary
//!   - **[`runner::api`]** - `Runtime` and `Instance` traits
//!   - **[`runner::ds`]** - Values, objects, arrays and the runtime error type
//!   - **[`runner::plugin`]** - Asset registries, plugins and global config
//!   - **[`runner::headless`]** - The in-process reference runtime used by tests and examples
//! - **[`adapter`]** - Host, options builder, view models, registry and pool

#[macro_use]
extern crate lazy_static;

pub mod adapter;
pub mod parser;
pub mod runner;

pub use adapter::{Component, Host, Options, ViewModel, VmError};
