//! The typed adapter over a reactivity runtime.
//!
//! A `Host` owns the runtime handle together with the identity registry and
//! the creator pool. `Options` builds configurations, `ViewModel` wraps live
//! instances, and `Directive`/`Filter` register assets.

pub mod array;
mod component;
mod directive;
mod error;
mod filter;
mod host;
mod identity;
mod model;
mod option;
mod pool;
mod viewmodel;

pub use self::component::Component;
pub use self::directive::{Directive, DirectiveContext};
pub use self::error::VmError;
pub use self::filter::Filter;
pub use self::host::Host;
pub use self::identity::IdentityRegistry;
pub use self::model::{DataModel, Method};
pub use self::option::{Fragment, Options};
pub use self::pool::{Access, CreatorFn, CreatorPool};
pub use self::viewmodel::ViewModel;
