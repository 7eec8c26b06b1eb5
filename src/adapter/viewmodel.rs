use std::fmt;
use std::rc::Rc;

use crate::adapter::error::VmError;
use crate::adapter::host::Host;
use crate::adapter::model::DataModel;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{is_reserved_key, JsObject};
use crate::runner::ds::value::JsValue;
use crate::runner::types::{
    Config, InstanceRef, ListenerId, MountTarget, Unwatch, VNode, WatchFn,
};

/// Typed facade over one live runtime instance.
///
/// Cloning is cheap and every clone refers to the same instance.
#[derive(Clone)]
pub struct ViewModel {
    instance: InstanceRef,
}

impl ViewModel {
    /// Builds and instantiates a view model over `model`, exposing its fields
    /// as reactive state and its described methods as instance methods.
    pub fn new<M: DataModel + ?Sized>(
        host: &Host,
        el: impl Into<MountTarget>,
        model: &M,
    ) -> Result<Self, VmError> {
        host.options()
            .set_el(el)
            .set_data_with_methods(model)
            .new_view_model()
    }

    pub fn from_instance(instance: InstanceRef) -> Self {
        ViewModel { instance }
    }

    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    pub fn uid(&self) -> u64 {
        self.instance.uid()
    }

    pub fn get(&self, key: &str) -> Result<JsValue, VmError> {
        Ok(self.instance.get(key)?)
    }

    pub fn set(&self, key: &str, value: impl Into<JsValue>) -> Result<(), VmError> {
        Ok(self.instance.assign(key, value.into())?)
    }

    pub fn delete(&self, key: &str) -> Result<(), VmError> {
        let data = JsValue::Object(self.instance.data());
        Ok(self.instance.delete(&data, key)?)
    }

    pub fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, VmError> {
        Ok(self.instance.call_method(method, args)?)
    }

    pub fn watch(
        &self,
        expr: &str,
        callback: impl Fn(&JsValue) -> Result<(), VmError> + 'static,
    ) -> Result<Unwatch, VmError> {
        self.watch_ex(expr, move |new: &JsValue, _: &JsValue| callback(new), false)
    }

    /// Watches `expr`, handing the callback the new and previous values.
    /// With `deep`, mutations anywhere below the watched value also fire.
    pub fn watch_ex(
        &self,
        expr: &str,
        callback: impl Fn(&JsValue, &JsValue) -> Result<(), VmError> + 'static,
        deep: bool,
    ) -> Result<Unwatch, VmError> {
        let callback: WatchFn = Rc::new(move |new: &JsValue, old: &JsValue| {
            callback(new, old).map_err(JErrorType::from)
        });
        Ok(self.instance.watch(expr, callback, deep)?)
    }

    pub fn mount(&self, target: Option<MountTarget>) -> Result<(), VmError> {
        Ok(self.instance.mount(target)?)
    }

    pub fn destroy(&self, remove: bool) {
        self.instance.destroy(remove)
    }

    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.instance.next_tick(Box::new(callback))
    }

    pub fn force_update(&self) {
        self.instance.force_update()
    }

    pub fn on(&self, event: &str, callback: impl Fn(&[JsValue]) + 'static) -> ListenerId {
        self.instance.on(event, Rc::new(callback))
    }

    pub fn once(&self, event: &str, callback: impl Fn(&[JsValue]) + 'static) -> ListenerId {
        self.instance.once(event, Rc::new(callback))
    }

    pub fn off(&self, event: Option<&str>, listener: Option<ListenerId>) {
        self.instance.off(event, listener)
    }

    pub fn emit(&self, event: &str, args: &[JsValue]) {
        self.instance.emit(event, args)
    }

    /// Copies every non-reserved field of `source` onto the instance's data,
    /// adding missing fields reactively.
    pub fn from_js(&self, source: &JsObject) -> Result<(), VmError> {
        let data = JsValue::Object(self.instance.data());
        for (key, value) in source.entries() {
            if is_reserved_key(&key) {
                continue;
            }
            self.instance.set(&data, &key, value)?;
        }
        Ok(())
    }

    /// Snapshot of the non-reserved data fields. Nested containers are shared.
    pub fn to_js(&self) -> JsObject {
        JsObject::from_entries(
            self.instance
                .data()
                .entries()
                .into_iter()
                .filter(|(key, _)| !is_reserved_key(key)),
        )
    }

    pub fn from_json(&self, json: &str) -> Result<(), VmError> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        match JsValue::from_json(&parsed) {
            JsValue::Object(source) => self.from_js(&source),
            other => Err(JErrorType::TypeError(format!(
                "expected a JSON object, got {}",
                other.type_of()
            ))
            .into()),
        }
    }

    pub fn to_json(&self) -> Result<String, VmError> {
        Ok(serde_json::to_string(&JsValue::Object(self.to_js()).to_json())?)
    }

    pub fn data(&self) -> JsObject {
        self.instance.data()
    }

    pub fn props(&self) -> JsObject {
        self.instance.props()
    }

    pub fn el(&self) -> JsValue {
        self.instance.el()
    }

    pub fn vnode(&self) -> Option<VNode> {
        self.instance.vnode()
    }

    pub fn options(&self) -> Rc<Config> {
        self.instance.options()
    }

    pub fn parent(&self) -> Option<ViewModel> {
        self.instance.parent().map(ViewModel::from_instance)
    }

    pub fn root(&self) -> ViewModel {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn children(&self) -> Vec<ViewModel> {
        self.instance
            .children()
            .into_iter()
            .map(ViewModel::from_instance)
            .collect()
    }

    pub fn is_mounted(&self) -> bool {
        self.instance.is_mounted()
    }

    pub fn is_destroyed(&self) -> bool {
        self.instance.is_destroyed()
    }
}

impl PartialEq for ViewModel {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.instance) as *const u8,
            Rc::as_ptr(&other.instance) as *const u8,
        )
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("uid", &self.uid())
            .field("mounted", &self.is_mounted())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
