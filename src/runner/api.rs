//! The surface a reactivity runtime exposes to the adapter.
//!
//! Both traits are object safe; the adapter only ever holds `Rc<dyn Runtime>`
//! and `Rc<dyn Instance>`.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::array_object::JsArray;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::GlobalConfig;
use crate::runner::plugin::types::{DirectiveDef, FilterDef, RuntimePlugin};
use crate::runner::types::{
    ArrayMutation, ComponentCtor, Config, InstanceRef, ListenerFn, ListenerId, MethodFn,
    MountTarget, RenderFn, TickFn, Unwatch, VNode, WatchFn,
};

/// Global runtime surface (`Vue.*`).
pub trait Runtime {
    /// Creates a component constructor from a configuration.
    fn extend(&self, config: Config) -> Result<ComponentCtor, JErrorType>;

    /// `new Vue(config)`.
    fn new_instance(&self, config: Config) -> Result<InstanceRef, JErrorType>;

    /// `new Ctor(config)`.
    fn instantiate(&self, ctor: &ComponentCtor, config: Config) -> Result<InstanceRef, JErrorType>;

    fn next_tick(&self, callback: TickFn);

    /// Reactive field write on an object, or index write on an array.
    fn set(&self, target: &JsValue, key: &str, value: JsValue) -> Result<(), JErrorType>;

    fn delete(&self, target: &JsValue, key: &str) -> Result<(), JErrorType>;

    /// Installs a plugin. Installing the same plugin again does nothing.
    fn use_plugin(&self, plugin: Rc<dyn RuntimePlugin>) -> Result<(), JErrorType>;

    /// Registers a global mixin applied to every instance created afterwards.
    fn mixin(&self, fragment: Config);

    fn compile(&self, template: &str) -> Result<RenderFn, JErrorType>;

    fn config(&self) -> GlobalConfig;

    fn configure(&self, update: &mut dyn FnMut(&mut GlobalConfig));

    fn directive(&self, name: &str, def: DirectiveDef);

    fn element_directive(&self, name: &str, def: DirectiveDef);

    fn filter(&self, name: &str, def: FilterDef);

    fn component(&self, name: &str, ctor: ComponentCtor);

    /// `Vue.component(name)`: the globally registered constructor, if any.
    fn get_component(&self, name: &str) -> Option<ComponentCtor>;

    /// Runs one of the instrumented array mutators and notifies dependents.
    fn mutate_array(&self, array: &JsArray, mutation: ArrayMutation) -> Result<JsValue, JErrorType>;
}

/// Per-instance surface (`vm.$*`).
pub trait Instance {
    fn uid(&self) -> u64;

    /// `$data`
    fn data(&self) -> JsObject;

    /// `$props`
    fn props(&self) -> JsObject;

    /// `$el`, `undefined` until mounted.
    fn el(&self) -> JsValue;

    /// `$vnode`, the last rendered tree.
    fn vnode(&self) -> Option<VNode>;

    /// `$options`, the fully merged configuration.
    fn options(&self) -> Rc<Config>;

    fn parent(&self) -> Option<InstanceRef>;

    fn children(&self) -> Vec<InstanceRef>;

    fn attach_child(&self, child: &InstanceRef);

    fn detach_child(&self, uid: u64);

    /// Proxied read: props, then data, then computed properties.
    fn get(&self, key: &str) -> Result<JsValue, JErrorType>;

    /// Proxied write. Computed setters are honoured; unknown keys become
    /// reactive data fields.
    fn assign(&self, key: &str, value: JsValue) -> Result<(), JErrorType>;

    fn call_method(&self, name: &str, args: &[JsValue]) -> Result<JsValue, JErrorType>;

    /// Adds methods to this instance only, shadowing `$options.methods`.
    /// Meant for `beforeCreate` hooks that bind methods to per-instance state.
    fn install_methods(&self, methods: IndexMap<String, MethodFn>);

    /// `$watch(expr, cb, {deep})`.
    fn watch(&self, expr: &str, callback: WatchFn, deep: bool) -> Result<Unwatch, JErrorType>;

    /// `$set`
    fn set(&self, target: &JsValue, key: &str, value: JsValue) -> Result<(), JErrorType>;

    /// `$delete`
    fn delete(&self, target: &JsValue, key: &str) -> Result<(), JErrorType>;

    fn on(&self, event: &str, callback: ListenerFn) -> ListenerId;

    fn once(&self, event: &str, callback: ListenerFn) -> ListenerId;

    /// `$off()`, `$off(event)`, `$off(event, fn)`; `(None, Some(id))` removes
    /// one listener from whichever event holds it.
    fn off(&self, event: Option<&str>, listener: Option<ListenerId>);

    fn emit(&self, event: &str, args: &[JsValue]);

    fn mount(&self, target: Option<MountTarget>) -> Result<(), JErrorType>;

    fn destroy(&self, remove: bool);

    fn next_tick(&self, callback: TickFn);

    fn force_update(&self);

    fn is_mounted(&self) -> bool;

    fn is_destroyed(&self) -> bool;
}
