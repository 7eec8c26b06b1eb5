//! The configuration builder.
//!
//! Methods, computed properties and lifecycle hooks are not written into the
//! configuration directly. Each becomes a fragment, and `assemble` hands the
//! fragments to the runtime as its mixin list, so the runtime's own merge
//! decides precedence: fragments apply in insertion order and the builder's
//! own options win.
//!
//! When the data object is known, a `beforeCreate` hook ahead of every
//! fragment registers the instance in the identity registry, so lookups
//! already succeed inside the instance's own hooks.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::adapter::component::Component;
use crate::adapter::error::VmError;
use crate::adapter::host::Host;
use crate::adapter::model::{method_fn, DataModel, Method};
use crate::adapter::viewmodel::ViewModel;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::types::{
    ComponentCtor, ComputedDef, Config, CreateElement, DataSource, GetterFn, HookFn, InstanceRef,
    LifeCycleEvent, MethodFn, MountTarget, SetterFn, VNode,
};

/// One mixin contributed by the builder.
#[derive(Clone)]
pub enum Fragment {
    Method(String, MethodFn),
    Computed(String, ComputedDef),
    Hook(LifeCycleEvent, HookFn),
    Raw(Config),
}

impl Fragment {
    pub fn to_config(&self) -> Config {
        match self {
            Fragment::Method(name, method) => Config::new().with_method(name.clone(), method.clone()),
            Fragment::Computed(name, def) => Config::new().with_computed(name.clone(), def.clone()),
            Fragment::Hook(event, hook) => Config::new().with_hook(*event, hook.clone()),
            Fragment::Raw(config) => config.clone(),
        }
    }
}

/// Accumulates a configuration, then instantiates it.
///
/// The terminal operations take the builder by value.
pub struct Options {
    host: Host,
    config: Config,
    components: IndexMap<String, ComponentCtor>,
    props: Vec<String>,
    fragments: Vec<Fragment>,
    tracker: Option<HookFn>,
}

impl Options {
    pub fn new(host: &Host) -> Self {
        Options {
            host: host.clone(),
            config: Config::new(),
            components: IndexMap::new(),
            props: vec![],
            fragments: vec![],
            tracker: None,
        }
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Selector, element, or `MountTarget::Factory`.
    pub fn set_el(mut self, el: impl Into<MountTarget>) -> Self {
        self.config.el = Some(el.into());
        self
    }

    pub fn set_el_factory(self, factory: impl Fn() -> JsValue + 'static) -> Self {
        self.set_el(MountTarget::factory(factory))
    }

    pub fn set_template(mut self, template: impl Into<String>) -> Self {
        self.config.template = Some(template.into());
        self
    }

    pub fn set_parent(mut self, parent: &ViewModel) -> Self {
        self.config.parent = Some(parent.instance().clone());
        self
    }

    pub fn set_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.config.delimiters = Some((open.into(), close.into()));
        self
    }

    pub fn set_data<M: DataModel + ?Sized>(mut self, model: &M) -> Self {
        let object = model.object();
        let key = object.id();
        let registry = self.host.registry().downgrade();
        let tracker: HookFn = Rc::new(move |instance: &InstanceRef| -> Result<(), JErrorType> {
            if !instance.options().is_functional() {
                registry.track(key, &ViewModel::from_instance(instance.clone()));
            }
            Ok(())
        });
        self.tracker = Some(tracker);
        self.config.data = Some(DataSource::Object(object));
        self
    }

    /// Like `set_data`, and also exposes the model's described methods.
    pub fn set_data_with_methods<M: DataModel + ?Sized>(self, model: &M) -> Self {
        let methods = methods_of(model);
        let mut this = self.set_data(model);
        if !methods.is_empty() {
            this.config.methods = Some(methods);
        }
        this
    }

    /// Backs every instance with a model from the creator pool entry `name`,
    /// registering `factory` for it.
    ///
    /// Each instantiation reads the entry three times: once for the model's
    /// methods and once for the registry key, both in `beforeCreate`, then
    /// once for the data object.
    pub fn set_data_creator<M: DataModel + 'static>(
        mut self,
        name: &str,
        factory: impl Fn() -> M + 'static,
    ) -> Self {
        self.host.pool().register(
            name,
            Rc::new(move || -> Rc<dyn DataModel> { Rc::new(factory()) }),
        );

        let (pool, registry) = (self.host.pool().clone(), self.host.registry().downgrade());
        let creator = name.to_string();
        let tracker: HookFn = Rc::new(move |instance: &InstanceRef| -> Result<(), JErrorType> {
            if instance.options().is_functional() {
                return Ok(());
            }
            let model = pool.access(&creator)?.value;
            instance.install_methods(methods_of(&*model));
            let key = pool.access(&creator)?.value.object().id();
            registry.track(key, &ViewModel::from_instance(instance.clone()));
            Ok(())
        });
        self.tracker = Some(tracker);

        let pool = self.host.pool().clone();
        let creator = name.to_string();
        self.config.data = Some(DataSource::Factory(Rc::new(move || {
            pool.access(&creator)
                .map(|access| access.value.object())
                .map_err(JErrorType::from)
        })));
        self
    }

    /// A functional instance is stateless: its data is ignored and its
    /// render output is not kept reactive.
    pub fn set_functional(mut self, functional: bool) -> Self {
        self.config.functional = Some(functional);
        self
    }

    /// Whether the rendered root replaces the mount element (the default)
    /// or renders inside it.
    pub fn set_replace(mut self, replace: bool) -> Self {
        self.config.replace = Some(replace);
        self
    }

    pub fn set_prop_value(mut self, name: impl Into<String>, value: impl Into<JsValue>) -> Self {
        self.config
            .props_data
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn add_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&ViewModel, &[JsValue]) -> Result<JsValue, VmError> + 'static,
    ) -> Self {
        let method: Method = Rc::new(method);
        self.fragments
            .push(Fragment::Method(name.into(), method_fn(method)));
        self
    }

    pub fn add_computed(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&ViewModel) -> Result<JsValue, VmError> + 'static,
    ) -> Self {
        let def = ComputedDef {
            get: getter_fn(getter),
            set: None,
        };
        self.fragments.push(Fragment::Computed(name.into(), def));
        self
    }

    pub fn add_computed_with_setter(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&ViewModel) -> Result<JsValue, VmError> + 'static,
        setter: impl Fn(&ViewModel, JsValue) -> Result<(), VmError> + 'static,
    ) -> Self {
        let setter: SetterFn = Rc::new(move |instance: &InstanceRef, value: JsValue| {
            setter(&ViewModel::from_instance(instance.clone()), value).map_err(JErrorType::from)
        });
        let def = ComputedDef {
            get: getter_fn(getter),
            set: Some(setter),
        };
        self.fragments.push(Fragment::Computed(name.into(), def));
        self
    }

    /// Adds a hook fragment. Hooks for one event run in the order added, all
    /// before the hook set with `set_hook`.
    pub fn on_lifecycle_event(
        mut self,
        event: LifeCycleEvent,
        hook: impl Fn(&ViewModel) -> Result<(), VmError> + 'static,
    ) -> Self {
        self.fragments.push(Fragment::Hook(event, hook_fn(hook)));
        self
    }

    /// Sets the configuration's own hook for `event`, replacing a previous one.
    pub fn set_hook(
        mut self,
        event: LifeCycleEvent,
        hook: impl Fn(&ViewModel) -> Result<(), VmError> + 'static,
    ) -> Self {
        self.config.hooks.insert(event, vec![hook_fn(hook)]);
        self
    }

    pub fn mixin(mut self, fragment: Config) -> Self {
        self.fragments.push(Fragment::Raw(fragment));
        self
    }

    pub fn add_sub_component(mut self, name: impl Into<String>, component: &Component) -> Self {
        self.components.insert(name.into(), component.ctor().clone());
        self
    }

    pub fn add_prop<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        for name in names {
            let name = name.into();
            if !self.props.contains(&name) {
                self.props.push(name);
            }
        }
        self
    }

    pub fn set_render(
        mut self,
        render: impl Fn(&ViewModel, &CreateElement) -> Result<VNode, VmError> + 'static,
    ) -> Self {
        self.config.render = Some(Rc::new(
            move |instance: &InstanceRef, h: &CreateElement| -> Result<VNode, JErrorType> {
                render(&ViewModel::from_instance(instance.clone()), h).map_err(JErrorType::from)
            },
        ));
        self
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Writes the collected sub-components, props and fragments into the
    /// configuration. Empty collections leave their entry absent. Calling it
    /// again rewrites the same entries.
    pub fn assemble(&mut self) -> &Config {
        if !self.components.is_empty() {
            self.config.components = Some(self.components.clone());
        }
        if !self.props.is_empty() {
            self.config.props = Some(self.props.clone());
        }
        let tracker = self
            .tracker
            .as_ref()
            .map(|hook| Config::new().with_hook(LifeCycleEvent::BeforeCreate, hook.clone()));
        let mixins: Vec<Config> = tracker
            .into_iter()
            .chain(self.fragments.iter().map(Fragment::to_config))
            .collect();
        if !mixins.is_empty() {
            self.config.mixins = Some(mixins);
        }
        trace!(
            components = self.components.len(),
            props = self.props.len(),
            fragments = self.fragments.len(),
            "assembled options"
        );
        &self.config
    }

    pub fn into_config(mut self) -> Config {
        self.assemble();
        self.config
    }

    pub fn new_view_model(self) -> Result<ViewModel, VmError> {
        let host = self.host.clone();
        let config = self.into_config();
        debug!(name = ?config.name, "instantiating view model");
        let instance = host.runtime().new_instance(config)?;
        Ok(adopt(&host, instance))
    }

    /// Creates a reusable component. A mount target, if any, must be a
    /// factory so every instance gets its own element.
    pub fn new_component(self) -> Result<Component, VmError> {
        if let Some(el) = &self.config.el {
            if !el.is_factory() {
                return Err(VmError::InvalidMountTarget(format!("{:?}", el)));
            }
        }
        let host = self.host.clone();
        let config = self.into_config();
        debug!(name = ?config.name, "defining component");
        host.extend(config)
    }
}

fn getter_fn(getter: impl Fn(&ViewModel) -> Result<JsValue, VmError> + 'static) -> GetterFn {
    Rc::new(move |instance: &InstanceRef| {
        getter(&ViewModel::from_instance(instance.clone())).map_err(JErrorType::from)
    })
}

fn hook_fn(hook: impl Fn(&ViewModel) -> Result<(), VmError> + 'static) -> HookFn {
    Rc::new(move |instance: &InstanceRef| {
        hook(&ViewModel::from_instance(instance.clone())).map_err(JErrorType::from)
    })
}

fn methods_of<M: DataModel + ?Sized>(model: &M) -> IndexMap<String, MethodFn> {
    model
        .describe_methods()
        .into_iter()
        .map(|(name, method)| (name, method_fn(method)))
        .collect()
}

/// Wraps a fresh instance. Data that came from somewhere other than the
/// builder (a raw mixin, say) is registered here if no hook did it already.
pub(crate) fn adopt(host: &Host, instance: InstanceRef) -> ViewModel {
    let vm = ViewModel::from_instance(instance);
    let options = vm.options();
    if options.data.is_some() && !options.is_functional() && !vm.is_destroyed() {
        let key = vm.data().id();
        let tracked = host
            .registry()
            .lookup(key)
            .map_or(false, |found| found.uid() == vm.uid());
        if !tracked {
            host.registry().downgrade().track(key, &vm);
        }
    }
    vm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::JsObject;
    use crate::runner::headless::HeadlessRuntime;

    fn host() -> Host {
        Host::new(Rc::new(HeadlessRuntime::new()))
    }

    #[test]
    fn test_absent_collections_stay_absent() {
        let mut options = host().options().set_name("plain");
        let config = options.assemble();
        assert!(config.props.is_none());
        assert!(config.components.is_none());
        assert!(config.mixins.is_none());
    }

    #[test]
    fn test_fragment_order_is_insertion_order() {
        let options = host()
            .options()
            .add_method("a", |_: &ViewModel, _: &[JsValue]| Ok(JsValue::Undefined))
            .on_lifecycle_event(LifeCycleEvent::Created, |_: &ViewModel| Ok(()))
            .mixin(Config::new().with_custom("k", JsValue::from(1)));
        let kinds: Vec<&str> = options
            .fragments()
            .iter()
            .map(|f| match f {
                Fragment::Method(..) => "method",
                Fragment::Computed(..) => "computed",
                Fragment::Hook(..) => "hook",
                Fragment::Raw(..) => "raw",
            })
            .collect();
        assert_eq!(kinds, vec!["method", "hook", "raw"]);
    }

    #[test]
    fn test_props_dedupe() {
        let config = host()
            .options()
            .add_prop(["title", "size"])
            .add_prop(vec!["title".to_string()])
            .into_config();
        assert_eq!(config.props, Some(vec!["title".to_string(), "size".to_string()]));
    }

    #[test]
    fn test_set_hook_replaces_own_hook() {
        let config = host()
            .options()
            .set_hook(LifeCycleEvent::Mounted, |_: &ViewModel| Ok(()))
            .set_hook(LifeCycleEvent::Mounted, |_: &ViewModel| Ok(()))
            .into_config();
        assert_eq!(config.hook_count(LifeCycleEvent::Mounted), 1);
    }

    #[test]
    fn test_component_rejects_selector_target() {
        let result = host().options().set_el("#app").new_component();
        assert!(matches!(result, Err(VmError::InvalidMountTarget(_))));

        let result = host()
            .options()
            .set_el(JsValue::from("div"))
            .new_component();
        assert!(matches!(result, Err(VmError::InvalidMountTarget(_))));
    }

    #[test]
    fn test_instance_without_data_is_not_registered() {
        let host = host();
        let vm = host.options().new_view_model().unwrap();
        assert!(host.registry().is_empty());
        assert!(host.registry().lookup(vm.data().id()).is_err());

        let model = JsObject::from_entries(vec![("a", JsValue::from(1))]);
        host.options().set_data(&model).new_view_model().unwrap();
        assert!(host.registry().contains(model.id()));
    }
}
