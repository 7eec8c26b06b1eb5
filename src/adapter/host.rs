use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::adapter::component::Component;
use crate::adapter::error::VmError;
use crate::adapter::identity::IdentityRegistry;
use crate::adapter::model::DataModel;
use crate::adapter::option::Options;
use crate::adapter::pool::CreatorPool;
use crate::adapter::viewmodel::ViewModel;
use crate::runner::api::Runtime;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::GlobalConfig;
use crate::runner::plugin::types::RuntimePlugin;
use crate::runner::types::{Config, RenderFn};

/// Owns the adapter's process-wide state next to the runtime it drives.
///
/// Clones share the same runtime, identity registry and creator pool.
#[derive(Clone)]
pub struct Host {
    runtime: Rc<dyn Runtime>,
    registry: IdentityRegistry,
    pool: CreatorPool,
}

impl Host {
    pub fn new(runtime: Rc<dyn Runtime>) -> Self {
        debug!("adapter host initialised");
        Host {
            runtime,
            registry: IdentityRegistry::new(),
            pool: CreatorPool::new(),
        }
    }

    pub fn runtime(&self) -> &Rc<dyn Runtime> {
        &self.runtime
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &CreatorPool {
        &self.pool
    }

    /// Starts a configuration builder bound to this host.
    pub fn options(&self) -> Options {
        Options::new(self)
    }

    /// Drops every registry entry and creator.
    pub fn teardown(&self) {
        info!(entries = self.registry.len(), "tearing down adapter host");
        self.registry.clear();
        self.pool.clear();
    }

    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.runtime.next_tick(Box::new(callback))
    }

    pub fn set(&self, target: &JsValue, key: &str, value: impl Into<JsValue>) -> Result<(), VmError> {
        Ok(self.runtime.set(target, key, value.into())?)
    }

    pub fn delete(&self, target: &JsValue, key: &str) -> Result<(), VmError> {
        Ok(self.runtime.delete(target, key)?)
    }

    pub fn use_plugin(&self, plugin: Rc<dyn RuntimePlugin>) -> Result<(), VmError> {
        Ok(self.runtime.use_plugin(plugin)?)
    }

    /// Registers a global mixin; `Options::into_config` builds one.
    pub fn mixin(&self, fragment: Config) {
        self.runtime.mixin(fragment)
    }

    pub fn compile(&self, template: &str) -> Result<RenderFn, VmError> {
        Ok(self.runtime.compile(template)?)
    }

    pub fn config(&self) -> GlobalConfig {
        self.runtime.config()
    }

    pub fn configure(&self, mut update: impl FnMut(&mut GlobalConfig)) {
        self.runtime.configure(&mut update)
    }

    /// Loads the data fields of the global config from a TOML file. Handlers
    /// and merge strategies already set in code are kept.
    pub fn load_config(&self, path: &Path) -> Result<(), VmError> {
        let loaded = GlobalConfig::load(path)?;
        debug!(path = %path.display(), "loaded global config");
        self.configure(|config: &mut GlobalConfig| {
            config.silent = loaded.silent;
            config.devtools = loaded.devtools;
            config.ignored_elements = loaded.ignored_elements.clone();
            config.key_codes = loaded.key_codes.clone();
        });
        Ok(())
    }

    pub fn extend(&self, config: Config) -> Result<Component, VmError> {
        let ctor = self.runtime.extend(config)?;
        Ok(Component::new(self, ctor))
    }

    /// Registers `component` globally under `name`.
    pub fn component(&self, name: &str, component: &Component) {
        self.runtime.component(name, component.ctor().clone())
    }

    /// The globally registered component `name`, if any.
    pub fn get_component(&self, name: &str) -> Option<Component> {
        self.runtime
            .get_component(name)
            .map(|ctor| Component::new(self, ctor))
    }

    /// Defines a component whose instances are backed by models from
    /// `creator`, then registers it globally under `name`. The creator pool
    /// entry shares the name.
    pub fn component_from_creator<M: DataModel + 'static>(
        &self,
        name: &str,
        creator: impl Fn() -> M + 'static,
        template: &str,
        replace: bool,
    ) -> Result<Component, VmError> {
        let component = self
            .options()
            .set_name(name)
            .set_data_creator(name, creator)
            .set_template(template)
            .set_replace(replace)
            .new_component()?;
        component.register(name);
        Ok(component)
    }

    pub fn view_model_of<M: DataModel + ?Sized>(&self, model: &M) -> Result<ViewModel, VmError> {
        self.registry.lookup(model.object().id())
    }
}
