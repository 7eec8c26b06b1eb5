use tracing::debug;

use crate::adapter::error::VmError;
use crate::adapter::host::Host;
use crate::adapter::option::{adopt, Options};
use crate::adapter::viewmodel::ViewModel;
use crate::runner::types::{ComponentCtor, Config};

/// A reusable component definition.
#[derive(Clone)]
pub struct Component {
    host: Host,
    ctor: ComponentCtor,
}

impl Component {
    pub(crate) fn new(host: &Host, ctor: ComponentCtor) -> Self {
        Component {
            host: host.clone(),
            ctor,
        }
    }

    pub fn ctor(&self) -> &ComponentCtor {
        &self.ctor
    }

    pub fn cid(&self) -> u64 {
        self.ctor.cid()
    }

    pub fn name(&self) -> Option<&str> {
        self.ctor.name()
    }

    pub fn new_view_model(&self) -> Result<ViewModel, VmError> {
        self.instantiate(Config::new())
    }

    /// Instantiates with per-instance options layered over the component's.
    pub fn new_view_model_with(&self, options: Options) -> Result<ViewModel, VmError> {
        self.instantiate(options.into_config())
    }

    /// Registers the component globally under `name`.
    pub fn register(&self, name: &str) {
        self.host.component(name, self)
    }

    fn instantiate(&self, config: Config) -> Result<ViewModel, VmError> {
        debug!(cid = self.cid(), name = ?self.name(), "instantiating component");
        let instance = self.host.runtime().instantiate(&self.ctor, config)?;
        Ok(adopt(&self.host, instance))
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("ctor", &self.ctor)
            .finish_non_exhaustive()
    }
}
