//! The runtime boundary and the in-process reference runtime.

pub mod api;
pub mod ds;
pub mod headless;
pub mod plugin;
pub mod types;

pub use api::{Instance, Runtime};
pub use headless::HeadlessRuntime;
