use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::observe::{self, Collected};
use super::watcher::{Getter, Watcher};
use super::Shared;
use crate::parser::ast::KeyPath;
use crate::parser::parse_key_path;
use crate::runner::api::Instance;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::JsValue;
use crate::runner::types::{
    Config, CreateElement, InstanceRef, LifeCycleEvent, ListenerFn, ListenerId, MethodFn,
    MountTarget, TickFn, Unwatch, VNode, WatchFn,
};

struct Listener {
    id: ListenerId,
    callback: ListenerFn,
    once: bool,
}

pub(crate) struct HeadlessInstance {
    uid: u64,
    shared: Rc<Shared>,
    this: Weak<HeadlessInstance>,
    options: Rc<Config>,
    data: RefCell<JsObject>,
    props: JsObject,
    /// Installed while the instance initialises; shadows `options.methods`.
    methods: RefCell<IndexMap<String, MethodFn>>,
    el: RefCell<JsValue>,
    vnode: RefCell<Option<VNode>>,
    parent: Option<Weak<dyn Instance>>,
    children: RefCell<Vec<InstanceRef>>,
    watchers: RefCell<Vec<Rc<Watcher>>>,
    render_watcher: RefCell<Option<Rc<Watcher>>>,
    listeners: RefCell<IndexMap<String, Vec<Listener>>>,
    mounted: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
}

impl HeadlessInstance {
    pub(crate) fn new(
        uid: u64,
        shared: Rc<Shared>,
        options: Config,
        parent: Option<Weak<dyn Instance>>,
    ) -> Rc<HeadlessInstance> {
        Rc::new_cyclic(|this| HeadlessInstance {
            uid,
            shared,
            this: this.clone(),
            options: Rc::new(options),
            data: RefCell::new(JsObject::new()),
            props: JsObject::new(),
            methods: RefCell::new(IndexMap::new()),
            el: RefCell::new(JsValue::Undefined),
            vnode: RefCell::new(None),
            parent,
            children: RefCell::new(vec![]),
            watchers: RefCell::new(vec![]),
            render_watcher: RefCell::new(None),
            listeners: RefCell::new(IndexMap::new()),
            mounted: Cell::new(false),
            being_destroyed: Cell::new(false),
            destroyed: Cell::new(false),
        })
    }

    fn this_ref(&self) -> Result<InstanceRef, JErrorType> {
        match self.this.upgrade() {
            Some(rc) => Ok(rc as InstanceRef),
            None => Err(JErrorType::ReferenceError(format!(
                "instance {} is no longer alive",
                self.uid
            ))),
        }
    }

    /// Runs `beforeCreate`, sets up props and data, runs `created`, and
    /// mounts when the options carry a mount target.
    pub(crate) fn init(&self) -> Result<(), JErrorType> {
        self.call_hook(LifeCycleEvent::BeforeCreate);

        if let Some(names) = &self.options.props {
            for name in names {
                let value = self
                    .options
                    .props_data
                    .as_ref()
                    .and_then(|d| d.get(name).cloned())
                    .unwrap_or(JsValue::Undefined);
                self.props.set(name, value);
            }
        }

        if self.options.is_functional() {
            if self.options.data.is_some() {
                warn!(uid = self.uid, "functional instances are stateless; data is ignored");
            }
        } else if let Some(source) = &self.options.data {
            let data = source.resolve()?;
            for key in data.keys() {
                if self.props.has(&key) {
                    warn!(uid = self.uid, key = %key, "data property is already declared as a prop");
                }
                if self.has_method(&key) {
                    warn!(uid = self.uid, key = %key, "data property shadows a method of the same name");
                }
            }
            *self.data.borrow_mut() = data;
        }

        self.call_hook(LifeCycleEvent::Created);
        debug!(uid = self.uid, name = ?self.options.name, "instance created");

        if self.options.el.is_some() {
            self.mount(None)?;
        }
        Ok(())
    }

    fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    fn method(&self, name: &str) -> Option<MethodFn> {
        self.methods.borrow().get(name).cloned().or_else(|| {
            self.options
                .methods
                .as_ref()
                .and_then(|m| m.get(name))
                .cloned()
        })
    }

    fn call_hook(&self, event: LifeCycleEvent) {
        let this = match self.this_ref() {
            Ok(this) => this,
            Err(_) => return,
        };
        let hooks = self.options.hooks.get(&event).cloned().unwrap_or_default();
        trace!(uid = self.uid, hook = event.as_str(), count = hooks.len(), "calling hook");
        for hook in hooks {
            if let Err(e) = hook(&this) {
                self.shared.handle_error(&e, &format!("{} hook", event));
            }
        }
        self.emit(&event.hook_event(), &[]);
    }

    fn evaluate_path(&self, path: &KeyPath, deep: bool) -> Result<Collected, JErrorType> {
        let mut path_deps = vec![];
        let mut value_deps = vec![];
        let head = path.head();
        let data = self.data();
        let computed = self
            .options
            .computed
            .as_ref()
            .and_then(|c| c.get(head))
            .cloned();

        let start = if self.props.has(head) {
            observe::push_dep(&mut path_deps, self.props.dep().clone());
            self.props.get(head)
        } else if data.has(head) || computed.is_none() {
            observe::push_dep(&mut path_deps, data.dep().clone());
            data.get(head)
        } else {
            // A computed head may read anything reachable from the state.
            observe::traverse(&JsValue::Object(data), true, &mut path_deps);
            observe::traverse(&JsValue::Object(self.props.clone()), true, &mut path_deps);
            match computed {
                Some(def) => (def.get)(&self.this_ref()?)?,
                None => JsValue::Undefined,
            }
        };

        let value = observe::walk(start, path.tail(), &mut path_deps);
        observe::traverse(&value, deep, &mut value_deps);
        Ok(Collected {
            value,
            path_deps,
            value_deps,
        })
    }

    fn create_element(&self) -> CreateElement {
        let local: Vec<String> = self
            .options
            .components
            .as_ref()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        let shared = self.shared.clone();
        CreateElement::new(move |tag: &str, data: JsValue, children: Vec<VNode>| {
            let mut node = VNode::element(tag, data, children);
            let ignored = shared.config.borrow().is_ignored_element(tag);
            if !ignored && (local.iter().any(|n| n == tag) || shared.assets.borrow().has_component(tag)) {
                node.component = Some(tag.to_string());
            }
            node
        })
    }

    fn render(&self) {
        let render = match &self.options.render {
            Some(r) => r.clone(),
            None => return,
        };
        let this = match self.this_ref() {
            Ok(this) => this,
            Err(_) => return,
        };
        let create = self.create_element();
        match render(&this, &create) {
            Ok(vnode) => *self.vnode.borrow_mut() = Some(vnode),
            Err(e) => self.shared.handle_error(&e, "render"),
        }
    }

    fn update(&self) {
        if !self.mounted.get() || self.being_destroyed.get() {
            return;
        }
        self.call_hook(LifeCycleEvent::BeforeUpdate);
        self.render();
        self.call_hook(LifeCycleEvent::Updated);
    }

    fn install_render_watcher(&self) -> Result<(), JErrorType> {
        let weak = self.this.clone();
        let getter: Getter = Box::new(move || {
            let mut value_deps = vec![];
            if let Some(inst) = weak.upgrade() {
                observe::traverse(&JsValue::Object(inst.data()), true, &mut value_deps);
                observe::traverse(&JsValue::Object(inst.props.clone()), true, &mut value_deps);
            }
            Ok(Collected {
                value: JsValue::Undefined,
                path_deps: vec![],
                value_deps,
            })
        });
        let weak = self.this.clone();
        let callback: WatchFn = Rc::new(move |_: &JsValue, _: &JsValue| {
            if let Some(inst) = weak.upgrade() {
                inst.update();
            }
            Ok(())
        });
        let watcher = Watcher::new(
            self.shared.next_watcher_id(),
            format!("render#{}", self.uid),
            getter,
            callback,
            self.shared.scheduler.clone(),
        )?;
        *self.render_watcher.borrow_mut() = Some(watcher);
        Ok(())
    }

    fn remove_watcher(&self, id: u64) {
        self.watchers.borrow_mut().retain(|w| w.id() != id);
    }

    fn add_listener(&self, event: &str, callback: ListenerFn, once: bool) -> ListenerId {
        let id = ListenerId(self.shared.next_listener_id());
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, callback, once });
        id
    }
}

impl Instance for HeadlessInstance {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn data(&self) -> JsObject {
        self.data.borrow().clone()
    }

    fn props(&self) -> JsObject {
        self.props.clone()
    }

    fn el(&self) -> JsValue {
        self.el.borrow().clone()
    }

    fn vnode(&self) -> Option<VNode> {
        self.vnode.borrow().clone()
    }

    fn options(&self) -> Rc<Config> {
        self.options.clone()
    }

    fn parent(&self) -> Option<InstanceRef> {
        self.parent.as_ref().and_then(|p| p.upgrade())
    }

    fn children(&self) -> Vec<InstanceRef> {
        self.children.borrow().clone()
    }

    fn attach_child(&self, child: &InstanceRef) {
        self.children.borrow_mut().push(child.clone());
    }

    fn detach_child(&self, uid: u64) {
        self.children.borrow_mut().retain(|c| c.uid() != uid);
    }

    fn get(&self, key: &str) -> Result<JsValue, JErrorType> {
        if self.props.has(key) {
            return Ok(self.props.get(key));
        }
        let data = self.data();
        if data.has(key) {
            return Ok(data.get(key));
        }
        let computed = self
            .options
            .computed
            .as_ref()
            .and_then(|c| c.get(key))
            .cloned();
        match computed {
            Some(def) => (def.get)(&self.this_ref()?),
            None => Ok(JsValue::Undefined),
        }
    }

    fn assign(&self, key: &str, value: JsValue) -> Result<(), JErrorType> {
        let computed = self
            .options
            .computed
            .as_ref()
            .and_then(|c| c.get(key))
            .cloned();
        if let Some(def) = computed {
            return match &def.set {
                Some(setter) => setter(&self.this_ref()?, value),
                None => Err(JErrorType::TypeError(format!(
                    "computed property \"{}\" was assigned to but it has no setter",
                    key
                ))),
            };
        }
        if self.props.has(key) {
            warn!(uid = self.uid, prop = key, "avoid mutating a prop directly");
            self.props.set(key, value);
            return Ok(());
        }
        self.data().set(key, value);
        Ok(())
    }

    fn call_method(&self, name: &str, args: &[JsValue]) -> Result<JsValue, JErrorType> {
        match self.method(name) {
            Some(f) => f(&self.this_ref()?, args),
            None => Err(JErrorType::TypeError(format!("{} is not a function", name))),
        }
    }

    fn install_methods(&self, methods: IndexMap<String, MethodFn>) {
        trace!(uid = self.uid, count = methods.len(), "installing methods");
        self.methods.borrow_mut().extend(methods);
    }

    fn watch(&self, expr: &str, callback: WatchFn, deep: bool) -> Result<Unwatch, JErrorType> {
        if self.destroyed.get() {
            return Err(JErrorType::ReferenceError(format!(
                "cannot watch \"{}\" on a destroyed instance",
                expr
            )));
        }
        let path = parse_key_path(expr)?;
        let weak = self.this.clone();
        let getter: Getter = Box::new(move || match weak.upgrade() {
            Some(inst) => inst.evaluate_path(&path, deep),
            None => Err(JErrorType::ReferenceError("watched instance is gone".to_string())),
        });
        let watcher = Watcher::new(
            self.shared.next_watcher_id(),
            expr,
            getter,
            callback,
            self.shared.scheduler.clone(),
        )?;
        debug!(uid = self.uid, watcher = watcher.id(), expr, deep, "watching");
        self.watchers.borrow_mut().push(watcher.clone());

        let watcher = Rc::downgrade(&watcher);
        let owner = self.this.clone();
        Ok(Unwatch::new(move || {
            if let Some(w) = watcher.upgrade() {
                w.teardown();
                if let Some(inst) = owner.upgrade() {
                    inst.remove_watcher(w.id());
                }
            }
        }))
    }

    fn set(&self, target: &JsValue, key: &str, value: JsValue) -> Result<(), JErrorType> {
        observe::reactive_set(target, key, value)
    }

    fn delete(&self, target: &JsValue, key: &str) -> Result<(), JErrorType> {
        observe::reactive_delete(target, key)
    }

    fn on(&self, event: &str, callback: ListenerFn) -> ListenerId {
        self.add_listener(event, callback, false)
    }

    fn once(&self, event: &str, callback: ListenerFn) -> ListenerId {
        self.add_listener(event, callback, true)
    }

    fn off(&self, event: Option<&str>, listener: Option<ListenerId>) {
        let mut listeners = self.listeners.borrow_mut();
        match (event, listener) {
            (None, None) => listeners.clear(),
            (Some(e), None) => {
                listeners.shift_remove(e);
            }
            (Some(e), Some(id)) => {
                if let Some(list) = listeners.get_mut(e) {
                    list.retain(|l| l.id != id);
                }
            }
            (None, Some(id)) => {
                for list in listeners.values_mut() {
                    list.retain(|l| l.id != id);
                }
            }
        }
    }

    fn emit(&self, event: &str, args: &[JsValue]) {
        let callbacks: Vec<ListenerFn> = {
            let mut listeners = self.listeners.borrow_mut();
            match listeners.get_mut(event) {
                Some(list) => {
                    let callbacks = list.iter().map(|l| l.callback.clone()).collect();
                    list.retain(|l| !l.once);
                    callbacks
                }
                None => vec![],
            }
        };
        if !callbacks.is_empty() {
            trace!(uid = self.uid, event, listeners = callbacks.len(), "emit");
        }
        for callback in callbacks {
            callback(args);
        }
    }

    fn mount(&self, target: Option<MountTarget>) -> Result<(), JErrorType> {
        if self.destroyed.get() {
            return Err(JErrorType::ReferenceError(
                "cannot mount a destroyed instance".to_string(),
            ));
        }
        if self.mounted.get() {
            debug!(uid = self.uid, "already mounted");
            return Ok(());
        }
        let el = target
            .or_else(|| self.options.el.clone())
            .map(|t| t.resolve())
            .unwrap_or(JsValue::Null);
        *self.el.borrow_mut() = el;

        self.call_hook(LifeCycleEvent::BeforeMount);
        if self.options.render.is_none() && self.options.template.is_some() {
            self.shared.handle_error(
                &JErrorType::TypeError(
                    "templates are not compiled by the headless runtime; provide a render function"
                        .to_string(),
                ),
                "mount",
            );
        }
        trace!(uid = self.uid, replace = self.options.replaces_el(), "rendering into mount target");
        self.render();
        if self.options.render.is_some() && !self.options.is_functional() {
            self.install_render_watcher()?;
        }
        self.mounted.set(true);
        self.call_hook(LifeCycleEvent::Mounted);
        debug!(uid = self.uid, "mounted");
        Ok(())
    }

    fn destroy(&self, remove: bool) {
        if self.being_destroyed.get() || self.destroyed.get() {
            return;
        }
        self.call_hook(LifeCycleEvent::BeforeDestroy);
        self.being_destroyed.set(true);

        if let Some(parent) = self.parent() {
            parent.detach_child(self.uid);
        }
        let render_watcher = self.render_watcher.borrow_mut().take();
        if let Some(w) = render_watcher {
            w.teardown();
        }
        let watchers = std::mem::take(&mut *self.watchers.borrow_mut());
        for w in watchers {
            w.teardown();
        }
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.destroy(remove);
        }

        self.destroyed.set(true);
        self.mounted.set(false);
        *self.vnode.borrow_mut() = None;
        if remove {
            *self.el.borrow_mut() = JsValue::Undefined;
        }
        self.call_hook(LifeCycleEvent::Destroyed);
        self.off(None, None);
        debug!(uid = self.uid, "destroyed");
    }

    fn next_tick(&self, callback: TickFn) {
        self.shared.scheduler.next_tick(callback);
    }

    fn force_update(&self) {
        if let Some(w) = self.render_watcher.borrow().as_ref() {
            w.force();
        }
    }

    fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}
