use std::rc::Rc;

use crate::adapter::error::VmError;
use crate::adapter::viewmodel::ViewModel;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::JsValue;
use crate::runner::types::{InstanceRef, MethodFn};

/// A method as host code writes it: it receives the live view model.
pub type Method = Rc<dyn Fn(&ViewModel, &[JsValue]) -> Result<JsValue, VmError>>;

/// Host data that can become the reactive state of a view model.
///
/// `object()` returns the model's backing store; its non-reserved fields are
/// the reactive state, and its identity keys the identity registry.
/// `describe_methods()` lists the behaviours exposed as instance methods.
pub trait DataModel {
    fn object(&self) -> JsObject;

    fn describe_methods(&self) -> Vec<(String, Method)> {
        Vec::new()
    }
}

impl DataModel for JsObject {
    fn object(&self) -> JsObject {
        self.clone()
    }
}

pub(crate) fn method_fn(method: Method) -> MethodFn {
    Rc::new(move |instance: &InstanceRef, args: &[JsValue]| {
        method(&ViewModel::from_instance(instance.clone()), args).map_err(JErrorType::from)
    })
}
