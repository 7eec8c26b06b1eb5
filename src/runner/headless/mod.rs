//! An in-process reference runtime that needs no browser.
//!
//! This is a reference runtime for tests and examples, not a product
//! surface. Embedders supply their own [`Runtime`] implementation.
//!
//! It implements the observable contract of the runtime traits: option
//! merging, lifecycle hooks (each also emitted as `hook:<name>`), key-path
//! watchers batched by a scheduler, `nextTick`, instrumented array mutators,
//! an event bus, render callbacks and the global asset registries.
//! Templates are not compiled; use render functions.
//!
//! Nothing runs asynchronously on its own. Call [`HeadlessRuntime::flush`]
//! to drive one event-loop turn: pending watchers run, then queued
//! `next_tick` callbacks.

mod array;
mod instance;
mod merge;
mod observe;
mod scheduler;
mod watcher;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use self::instance::HeadlessInstance;
use self::scheduler::Scheduler;
use crate::parser::ast::KeyPath;
use crate::parser::parse_key_path;
use crate::runner::api::{Instance, Runtime};
use crate::runner::ds::array_object::JsArray;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::GlobalConfig;
use crate::runner::plugin::registry::AssetRegistry;
use crate::runner::plugin::types::{
    DirectiveBinding, DirectiveDef, DirectiveWriter, FilterDef, PluginInfo, RuntimePlugin,
};
use crate::runner::types::{
    ArrayMutation, ComponentCtor, Config, DataSource, InstanceRef, RenderFn, TickFn, Unwatch,
    WatchFn,
};

pub use self::scheduler::MAX_UPDATE_ROUNDS;

/// State shared by the runtime handle and every instance it creates.
pub(crate) struct Shared {
    pub(crate) config: RefCell<GlobalConfig>,
    pub(crate) assets: RefCell<AssetRegistry>,
    global_mixins: RefCell<Vec<Config>>,
    pub(crate) scheduler: Rc<Scheduler>,
    next_uid: Cell<u64>,
    next_cid: Cell<u64>,
    next_watcher_id: Cell<u64>,
    next_listener_id: Cell<u64>,
}

fn bump(counter: &Cell<u64>) -> u64 {
    let id = counter.get();
    counter.set(id + 1);
    id
}

impl Shared {
    pub(crate) fn next_watcher_id(&self) -> u64 {
        bump(&self.next_watcher_id)
    }

    pub(crate) fn next_listener_id(&self) -> u64 {
        bump(&self.next_listener_id)
    }

    /// Routes an error raised inside user code to `errorHandler`, or logs it
    /// unless the runtime is silent.
    pub(crate) fn handle_error(&self, err: &JErrorType, info: &str) {
        let (handler, silent) = {
            let config = self.config.borrow();
            (config.error_handler.clone(), config.silent)
        };
        match handler {
            Some(h) => h(err, info),
            None if !silent => error!(error = %err, info, "unhandled error"),
            None => {}
        }
    }
}

/// One usage of a directive, as a template would declare it.
#[derive(Debug, Clone, Default)]
pub struct DirectiveUsage {
    pub name: String,
    pub el: JsValue,
    pub arg: Option<String>,
    /// Key path evaluated on the instance, e.g. `items[0].name`.
    pub expression: String,
    pub modifiers: Vec<String>,
    /// The element's other attributes; `params` are read from here.
    pub attrs: IndexMap<String, JsValue>,
}

struct BindingState {
    usage: DirectiveUsage,
    params: IndexMap<String, JsValue>,
    writer: Option<DirectiveWriter>,
    value: JsValue,
    old_value: JsValue,
}

impl BindingState {
    fn binding(&self, instance: InstanceRef) -> DirectiveBinding {
        DirectiveBinding {
            el: self.usage.el.clone(),
            name: self.usage.name.clone(),
            arg: self.usage.arg.clone(),
            expression: self.usage.expression.clone(),
            modifiers: self.usage.modifiers.clone(),
            params: self.params.clone(),
            value: self.value.clone(),
            old_value: self.old_value.clone(),
            instance,
            writer: self.writer.clone(),
        }
    }
}

/// Assigns through a key path: the head via the instance proxy, deeper
/// segments on the container that holds them.
fn path_writer(instance: Weak<dyn Instance>, path: KeyPath) -> DirectiveWriter {
    Rc::new(move |value: JsValue| -> Result<(), JErrorType> {
        let instance = match instance.upgrade() {
            Some(i) => i,
            None => return Ok(()),
        };
        match path.tail().split_last() {
            None => instance.assign(path.head(), value),
            Some((last, between)) => {
                let mut ignored = vec![];
                let target = observe::walk(instance.get(path.head())?, between, &mut ignored);
                observe::reactive_set(&target, &last.as_key(), value)
            }
        }
    })
}

/// A directive bound to an instance. `update` runs whenever the expression
/// value changes; [`BoundDirective::unbind`] stops that and calls `unbind`.
pub struct BoundDirective {
    def: DirectiveDef,
    state: Rc<RefCell<BindingState>>,
    instance: Weak<dyn Instance>,
    unwatch: Unwatch,
}

impl BoundDirective {
    pub fn value(&self) -> JsValue {
        self.state.borrow().value.clone()
    }

    /// Calling it again does nothing.
    pub fn unbind(&self) -> Result<(), JErrorType> {
        if !self.unwatch.is_active() {
            return Ok(());
        }
        self.unwatch.unwatch();
        match self.instance.upgrade() {
            Some(instance) => {
                let binding = self.state.borrow().binding(instance);
                self.def.invoke_unbind(&binding)
            }
            None => Ok(()),
        }
    }
}

/// Cheap to clone; clones share one runtime.
#[derive(Clone)]
pub struct HeadlessRuntime {
    shared: Rc<Shared>,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::with_config(GlobalConfig::default())
    }

    pub fn with_config(config: GlobalConfig) -> Self {
        HeadlessRuntime {
            shared: Rc::new(Shared {
                config: RefCell::new(config),
                assets: RefCell::new(AssetRegistry::new()),
                global_mixins: RefCell::new(vec![]),
                scheduler: Rc::new(Scheduler::new()),
                next_uid: Cell::new(0),
                next_cid: Cell::new(1),
                next_watcher_id: Cell::new(1),
                next_listener_id: Cell::new(1),
            }),
        }
    }

    /// Runs queued watchers, then `next_tick` callbacks, until both queues
    /// are empty.
    pub fn flush(&self) {
        let shared = self.shared.clone();
        self.shared
            .scheduler
            .flush(&move |err: &JErrorType, info: &str| shared.handle_error(err, info));
    }

    pub fn is_idle(&self) -> bool {
        self.shared.scheduler.is_idle()
    }

    pub fn lookup_directive(&self, name: &str) -> Option<DirectiveDef> {
        self.shared.assets.borrow().get_directive(name).cloned()
    }

    pub fn lookup_element_directive(&self, name: &str) -> Option<DirectiveDef> {
        self.shared.assets.borrow().get_element_directive(name).cloned()
    }

    pub fn lookup_filter(&self, name: &str) -> Option<FilterDef> {
        self.shared.assets.borrow().get_filter(name).cloned()
    }

    pub fn lookup_component(&self, name: &str) -> Option<ComponentCtor> {
        self.shared.assets.borrow().get_component(name).cloned()
    }

    pub fn installed_plugins(&self) -> Vec<PluginInfo> {
        self.shared.assets.borrow().loaded_plugins().to_vec()
    }

    fn resolve_filter(&self, name: &str) -> Result<FilterDef, JErrorType> {
        self.lookup_filter(name)
            .ok_or_else(|| JErrorType::ReferenceError(format!("failed to resolve filter: {}", name)))
    }

    /// Applies a filter's read half, as `{{ value | name }}` would.
    pub fn apply_filter(&self, name: &str, value: &JsValue) -> Result<JsValue, JErrorType> {
        self.resolve_filter(name)?.apply_read(value)
    }

    /// Applies a filter's write half, as a two-way binding would on input.
    pub fn apply_filter_write(&self, name: &str, value: &JsValue) -> Result<JsValue, JErrorType> {
        self.resolve_filter(name)?.apply_write(value)
    }

    fn resolve_directive(&self, name: &str) -> Result<DirectiveDef, JErrorType> {
        self.lookup_directive(name)
            .or_else(|| self.lookup_element_directive(name))
            .ok_or_else(|| JErrorType::ReferenceError(format!("failed to resolve directive: {}", name)))
    }

    /// Binds a directive to `instance`: runs `bind`, then `update` with the
    /// current value, then `update` again whenever the expression changes
    /// (or anything beneath it, for `deep` directives).
    /// Attribute directives shadow element directives of the same name.
    pub fn bind_directive(
        &self,
        instance: &InstanceRef,
        usage: DirectiveUsage,
    ) -> Result<BoundDirective, JErrorType> {
        let def = self.resolve_directive(&usage.name)?;
        let weak = Rc::downgrade(instance);
        let params: IndexMap<String, JsValue> = def
            .params
            .iter()
            .filter_map(|name| usage.attrs.get(name).map(|v| (name.clone(), v.clone())))
            .collect();

        if def.accept_statement {
            trace!(directive = %usage.name, "binding inline statement");
            let state = Rc::new(RefCell::new(BindingState {
                value: JsValue::from(usage.expression.as_str()),
                usage,
                params,
                writer: None,
                old_value: JsValue::Undefined,
            }));
            let binding = state.borrow().binding(instance.clone());
            def.invoke_bind(&binding)?;
            def.invoke_update(&binding)?;
            return Ok(BoundDirective {
                def,
                state,
                instance: weak,
                unwatch: Unwatch::new(|| {}),
            });
        }

        let path = parse_key_path(&usage.expression)?;
        let mut ignored = vec![];
        let value = observe::walk(instance.get(path.head())?, path.tail(), &mut ignored);
        let writer = if def.two_way {
            Some(path_writer(weak.clone(), path))
        } else {
            None
        };

        let state = Rc::new(RefCell::new(BindingState {
            usage,
            params,
            writer,
            value,
            old_value: JsValue::Undefined,
        }));
        let binding = state.borrow().binding(instance.clone());
        def.invoke_bind(&binding)?;
        def.invoke_update(&binding)?;

        let callback: WatchFn = {
            let (def, state, weak) = (def.clone(), state.clone(), weak.clone());
            Rc::new(move |new: &JsValue, old: &JsValue| {
                let instance = match weak.upgrade() {
                    Some(i) => i,
                    None => return Ok(()),
                };
                let binding = {
                    let mut s = state.borrow_mut();
                    s.value = new.clone();
                    s.old_value = old.clone();
                    s.binding(instance)
                };
                def.invoke_update(&binding)
            })
        };
        let expression = state.borrow().usage.expression.clone();
        let unwatch = instance.watch(&expression, callback, def.deep)?;
        Ok(BoundDirective {
            def,
            state,
            instance: weak,
            unwatch,
        })
    }

    /// Binds every usage on one element, higher priority first. Usages of
    /// equal priority keep their order.
    pub fn bind_directives(
        &self,
        instance: &InstanceRef,
        usages: Vec<DirectiveUsage>,
    ) -> Result<Vec<BoundDirective>, JErrorType> {
        let mut ranked = vec![];
        for usage in usages {
            let priority = self.resolve_directive(&usage.name)?.effective_priority();
            ranked.push((priority, usage));
        }
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked
            .into_iter()
            .map(|(_, usage)| self.bind_directive(instance, usage))
            .collect()
    }

    fn create(&self, base: Option<&Config>, config: Config) -> Result<InstanceRef, JErrorType> {
        let strategies = self.shared.config.borrow().option_merge_strategies.clone();
        let global_mixins = self.shared.global_mixins.borrow().clone();

        let mut merged = Config::new();
        for mixin in &global_mixins {
            merged = merge::merge_options(merged, mixin, &strategies);
        }
        if let Some(base) = base {
            merged = merge::merge_options(merged, base, &strategies);
        }
        merged = merge::merge_options(merged, &config, &strategies);

        let parent = merged.parent.take();
        let uid = bump(&self.shared.next_uid);
        let instance =
            HeadlessInstance::new(uid, self.shared.clone(), merged, parent.as_ref().map(Rc::downgrade));
        let this: InstanceRef = instance.clone();
        if let Some(p) = &parent {
            p.attach_child(&this);
        }
        if let Err(e) = instance.init() {
            if let Some(p) = &parent {
                p.detach_child(uid);
            }
            return Err(e);
        }
        Ok(this)
    }
}

impl Default for HeadlessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for HeadlessRuntime {
    fn extend(&self, config: Config) -> Result<ComponentCtor, JErrorType> {
        if let Some(DataSource::Object(_)) = &config.data {
            warn!(
                name = ?config.name,
                "the data option should be a function that returns a per-instance value in component definitions"
            );
        }
        let cid = bump(&self.shared.next_cid);
        debug!(cid, name = ?config.name, "extended component");
        Ok(ComponentCtor::new(cid, config))
    }

    fn new_instance(&self, config: Config) -> Result<InstanceRef, JErrorType> {
        self.create(None, config)
    }

    fn instantiate(&self, ctor: &ComponentCtor, config: Config) -> Result<InstanceRef, JErrorType> {
        self.create(Some(ctor.options()), config)
    }

    fn next_tick(&self, callback: TickFn) {
        self.shared.scheduler.next_tick(callback);
    }

    fn set(&self, target: &JsValue, key: &str, value: JsValue) -> Result<(), JErrorType> {
        observe::reactive_set(target, key, value)
    }

    fn delete(&self, target: &JsValue, key: &str) -> Result<(), JErrorType> {
        observe::reactive_delete(target, key)
    }

    fn use_plugin(&self, plugin: Rc<dyn RuntimePlugin>) -> Result<(), JErrorType> {
        let info = plugin.info();
        if self.shared.assets.borrow().has_plugin(&info.name) {
            debug!(plugin = %info.name, "plugin already installed");
            return Ok(());
        }
        plugin.install(self)?;
        self.shared.assets.borrow_mut().record_plugin(info);
        Ok(())
    }

    fn mixin(&self, fragment: Config) {
        debug!("registered global mixin");
        self.shared.global_mixins.borrow_mut().push(fragment);
    }

    fn compile(&self, _template: &str) -> Result<RenderFn, JErrorType> {
        Err(JErrorType::TypeError(
            "template compilation is not available in the headless runtime".to_string(),
        ))
    }

    fn config(&self) -> GlobalConfig {
        self.shared.config.borrow().clone()
    }

    fn configure(&self, update: &mut dyn FnMut(&mut GlobalConfig)) {
        update(&mut self.shared.config.borrow_mut());
    }

    fn directive(&self, name: &str, def: DirectiveDef) {
        self.shared.assets.borrow_mut().register_directive(name, def);
    }

    fn element_directive(&self, name: &str, def: DirectiveDef) {
        self.shared
            .assets
            .borrow_mut()
            .register_element_directive(name, def);
    }

    fn filter(&self, name: &str, def: FilterDef) {
        self.shared.assets.borrow_mut().register_filter(name, def);
    }

    fn component(&self, name: &str, ctor: ComponentCtor) {
        self.shared.assets.borrow_mut().register_component(name, ctor);
    }

    fn get_component(&self, name: &str) -> Option<ComponentCtor> {
        self.lookup_component(name)
    }

    fn mutate_array(&self, array: &JsArray, mutation: ArrayMutation) -> Result<JsValue, JErrorType> {
        Ok(array::apply(array, mutation))
    }
}
