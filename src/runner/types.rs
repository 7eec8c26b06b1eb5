//! Plain data exchanged with a runtime: the configuration object, callback
//! shapes, mount targets, virtual nodes and subscription handles.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::runner::api::Instance;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::JsValue;

pub type InstanceRef = Rc<dyn Instance>;

pub type HookFn = Rc<dyn Fn(&InstanceRef) -> Result<(), JErrorType>>;
pub type MethodFn = Rc<dyn Fn(&InstanceRef, &[JsValue]) -> Result<JsValue, JErrorType>>;
pub type GetterFn = Rc<dyn Fn(&InstanceRef) -> Result<JsValue, JErrorType>>;
pub type SetterFn = Rc<dyn Fn(&InstanceRef, JsValue) -> Result<(), JErrorType>>;
pub type RenderFn = Rc<dyn Fn(&InstanceRef, &CreateElement) -> Result<VNode, JErrorType>>;
pub type WatchFn = Rc<dyn Fn(&JsValue, &JsValue) -> Result<(), JErrorType>>;
pub type ListenerFn = Rc<dyn Fn(&[JsValue])>;
pub type TickFn = Box<dyn FnOnce()>;
pub type DataFactory = Rc<dyn Fn() -> Result<JsObject, JErrorType>>;
pub type ElementFactory = Rc<dyn Fn() -> JsValue>;
pub type Comparator = Rc<dyn Fn(&JsValue, &JsValue) -> Ordering>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifeCycleEvent {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    Activated,
    Deactivated,
    BeforeDestroy,
    Destroyed,
}

lazy_static! {
    static ref LIFECYCLE_EVENT_NAMES: HashMap<&'static str, LifeCycleEvent> = LifeCycleEvent::ALL
        .iter()
        .map(|evt| (evt.as_str(), *evt))
        .collect();
}

impl LifeCycleEvent {
    pub const ALL: [LifeCycleEvent; 10] = [
        LifeCycleEvent::BeforeCreate,
        LifeCycleEvent::Created,
        LifeCycleEvent::BeforeMount,
        LifeCycleEvent::Mounted,
        LifeCycleEvent::BeforeUpdate,
        LifeCycleEvent::Updated,
        LifeCycleEvent::Activated,
        LifeCycleEvent::Deactivated,
        LifeCycleEvent::BeforeDestroy,
        LifeCycleEvent::Destroyed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifeCycleEvent::BeforeCreate => "beforeCreate",
            LifeCycleEvent::Created => "created",
            LifeCycleEvent::BeforeMount => "beforeMount",
            LifeCycleEvent::Mounted => "mounted",
            LifeCycleEvent::BeforeUpdate => "beforeUpdate",
            LifeCycleEvent::Updated => "updated",
            LifeCycleEvent::Activated => "activated",
            LifeCycleEvent::Deactivated => "deactivated",
            LifeCycleEvent::BeforeDestroy => "beforeDestroy",
            LifeCycleEvent::Destroyed => "destroyed",
        }
    }

    /// Name of the event an instance emits when this hook runs.
    pub fn hook_event(&self) -> String {
        format!("hook:{}", self.as_str())
    }
}

impl fmt::Display for LifeCycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifeCycleEvent {
    type Err = JErrorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LIFECYCLE_EVENT_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| JErrorType::TypeError(format!("unknown lifecycle event \"{}\"", s)))
    }
}

/// Where an instance gets its reactive data from.
#[derive(Clone)]
pub enum DataSource {
    /// A shared object; the instance observes it in place.
    Object(JsObject),
    /// Called once per instance creation.
    Factory(DataFactory),
}

impl DataSource {
    pub fn resolve(&self) -> Result<JsObject, JErrorType> {
        match self {
            DataSource::Object(obj) => Ok(obj.clone()),
            DataSource::Factory(f) => f(),
        }
    }
}

/// Mount target: a selector, an element, or a function producing one.
#[derive(Clone)]
pub enum MountTarget {
    Selector(String),
    Element(JsValue),
    Factory(ElementFactory),
}

impl MountTarget {
    pub fn factory(f: impl Fn() -> JsValue + 'static) -> Self {
        MountTarget::Factory(Rc::new(f))
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, MountTarget::Factory(_))
    }

    pub fn resolve(&self) -> JsValue {
        match self {
            MountTarget::Selector(s) => JsValue::String(s.clone()),
            MountTarget::Element(el) => el.clone(),
            MountTarget::Factory(f) => f(),
        }
    }
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<JsValue> for MountTarget {
    fn from(el: JsValue) -> Self {
        MountTarget::Element(el)
    }
}

impl fmt::Debug for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountTarget::Selector(s) => write!(f, "Selector({:?})", s),
            MountTarget::Element(el) => write!(f, "Element({:?})", el),
            MountTarget::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

#[derive(Clone)]
pub struct ComputedDef {
    pub get: GetterFn,
    pub set: Option<SetterFn>,
}

/// A component constructor produced by `extend`.
#[derive(Clone)]
pub struct ComponentCtor {
    cid: u64,
    options: Rc<Config>,
}

impl ComponentCtor {
    pub fn new(cid: u64, options: Config) -> Self {
        ComponentCtor {
            cid,
            options: Rc::new(options),
        }
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    pub fn options(&self) -> &Config {
        &self.options
    }
}

impl fmt::Debug for ComponentCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCtor")
            .field("cid", &self.cid)
            .field("name", &self.name())
            .finish()
    }
}

/// The configuration object handed to `new`/`extend`, and the shape of every
/// mixin fragment.
///
/// Collection options are `Option`s: the runtime treats an absent entry and an
/// empty one differently when merging.
#[derive(Clone, Default)]
pub struct Config {
    pub name: Option<String>,
    pub data: Option<DataSource>,
    pub el: Option<MountTarget>,
    pub template: Option<String>,
    pub parent: Option<InstanceRef>,
    pub delimiters: Option<(String, String)>,
    pub props: Option<Vec<String>>,
    pub props_data: Option<IndexMap<String, JsValue>>,
    pub methods: Option<IndexMap<String, MethodFn>>,
    pub computed: Option<IndexMap<String, ComputedDef>>,
    pub components: Option<IndexMap<String, ComponentCtor>>,
    pub hooks: IndexMap<LifeCycleEvent, Vec<HookFn>>,
    pub render: Option<RenderFn>,
    pub mixins: Option<Vec<Config>>,
    /// Stateless: no data and no reactive re-render.
    pub functional: Option<bool>,
    /// Whether the rendered root replaces the mount element. Defaults to true.
    pub replace: Option<bool>,
    /// Options the runtime does not know; merged by `optionMergeStrategies`.
    pub custom: IndexMap<String, JsValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, name: impl Into<String>, method: MethodFn) -> Self {
        self.methods
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), method);
        self
    }

    pub fn with_computed(mut self, name: impl Into<String>, def: ComputedDef) -> Self {
        self.computed
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), def);
        self
    }

    pub fn with_hook(mut self, event: LifeCycleEvent, hook: HookFn) -> Self {
        self.hooks.entry(event).or_default().push(hook);
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: JsValue) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    pub fn is_functional(&self) -> bool {
        self.functional.unwrap_or(false)
    }

    pub fn replaces_el(&self) -> bool {
        self.replace.unwrap_or(true)
    }

    pub fn hook_count(&self, event: LifeCycleEvent) -> usize {
        self.hooks.get(&event).map_or(0, Vec::len)
    }
}

fn keys<V>(map: &Option<IndexMap<String, V>>) -> Option<Vec<&String>> {
    map.as_ref().map(|m| m.keys().collect())
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("data", &self.data.is_some())
            .field("el", &self.el)
            .field("template", &self.template)
            .field("parent", &self.parent.as_ref().map(|p| p.uid()))
            .field("delimiters", &self.delimiters)
            .field("props", &self.props)
            .field("props_data", &keys(&self.props_data))
            .field("methods", &keys(&self.methods))
            .field("computed", &keys(&self.computed))
            .field("components", &keys(&self.components))
            .field(
                "hooks",
                &self
                    .hooks
                    .iter()
                    .map(|(evt, hooks)| (evt.as_str(), hooks.len()))
                    .collect::<Vec<_>>(),
            )
            .field("render", &self.render.is_some())
            .field("mixins", &self.mixins.as_ref().map(Vec::len))
            .field("functional", &self.functional)
            .field("replace", &self.replace)
            .field("custom", &self.custom)
            .finish()
    }
}

/// A rendered node.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    pub tag: Option<String>,
    pub data: JsValue,
    pub children: Vec<VNode>,
    pub text: Option<String>,
    /// Set when the tag resolved to a registered component.
    pub component: Option<String>,
}

impl VNode {
    pub fn element(tag: impl Into<String>, data: JsValue, children: Vec<VNode>) -> Self {
        VNode {
            tag: Some(tag.into()),
            data,
            children,
            text: None,
            component: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        VNode {
            tag: None,
            data: JsValue::Undefined,
            children: Vec::new(),
            text: Some(text.into()),
            component: None,
        }
    }
}

/// The runtime's native element constructor, `(tag, data, children) -> node`.
#[derive(Clone)]
pub struct CreateElement {
    inner: Rc<dyn Fn(&str, JsValue, Vec<VNode>) -> VNode>,
}

impl CreateElement {
    pub fn new(f: impl Fn(&str, JsValue, Vec<VNode>) -> VNode + 'static) -> Self {
        CreateElement { inner: Rc::new(f) }
    }

    pub fn call(&self, tag: &str, data: JsValue, children: Vec<VNode>) -> VNode {
        (self.inner)(tag, data, children)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Cancels a watcher. Calling it again is a no-op.
#[derive(Clone)]
pub struct Unwatch {
    teardown: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Unwatch {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Unwatch {
            teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))),
        }
    }

    pub fn unwatch(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(f) = teardown {
            f();
        }
    }

    pub fn is_active(&self) -> bool {
        self.teardown.borrow().is_some()
    }
}

/// One call into a reactive array's instrumented mutators.
#[derive(Clone)]
pub enum ArrayMutation {
    Push(Vec<JsValue>),
    Pop,
    Unshift(Vec<JsValue>),
    Shift,
    Splice {
        index: i64,
        how_many: Option<usize>,
        items: Vec<JsValue>,
    },
    Sort(Option<Comparator>),
    Reverse,
}

impl ArrayMutation {
    pub fn method_name(&self) -> &'static str {
        match self {
            ArrayMutation::Push(_) => "push",
            ArrayMutation::Pop => "pop",
            ArrayMutation::Unshift(_) => "unshift",
            ArrayMutation::Shift => "shift",
            ArrayMutation::Splice { .. } => "splice",
            ArrayMutation::Sort(_) => "sort",
            ArrayMutation::Reverse => "reverse",
        }
    }
}


impl fmt::Debug for Unwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unwatch").finish_non_exhaustive()
    }
}
