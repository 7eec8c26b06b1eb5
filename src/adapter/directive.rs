use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::adapter::error::VmError;
use crate::adapter::host::Host;
use crate::adapter::viewmodel::ViewModel;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{DirectiveBinding, DirectiveDef, DirectiveHook, DirectiveWriter};

/// What a directive callback sees about its usage site.
#[derive(Clone)]
pub struct DirectiveContext {
    pub el: JsValue,
    pub name: String,
    pub arg: Option<String>,
    pub expression: String,
    pub modifiers: Vec<String>,
    /// Attributes named by `set_params`, as found on the element.
    pub params: IndexMap<String, JsValue>,
    pub vm: ViewModel,
    writer: Option<DirectiveWriter>,
}

impl DirectiveContext {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// `Undefined` when the element lacks the attribute.
    pub fn param(&self, name: &str) -> JsValue {
        self.params.get(name).cloned().unwrap_or(JsValue::Undefined)
    }

    pub fn is_two_way(&self) -> bool {
        self.writer.is_some()
    }

    /// Writes `value` back through the bound expression. Only two-way
    /// directives may do this.
    pub fn set(&self, value: impl Into<JsValue>) -> Result<(), VmError> {
        match &self.writer {
            Some(write) => Ok(write(value.into())?),
            None => Err(JErrorType::TypeError(format!("directive {} is not two-way", self.name)).into()),
        }
    }
}

impl fmt::Debug for DirectiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveContext")
            .field("el", &self.el)
            .field("name", &self.name)
            .field("arg", &self.arg)
            .field("expression", &self.expression)
            .field("modifiers", &self.modifiers)
            .field("params", &self.params)
            .field("vm", &self.vm)
            .field("two_way", &self.is_two_way())
            .finish()
    }
}

impl From<&DirectiveBinding> for DirectiveContext {
    fn from(binding: &DirectiveBinding) -> Self {
        DirectiveContext {
            el: binding.el.clone(),
            name: binding.name.clone(),
            arg: binding.arg.clone(),
            expression: binding.expression.clone(),
            modifiers: binding.modifiers.clone(),
            params: binding.params.clone(),
            vm: ViewModel::from_instance(binding.instance.clone()),
            writer: binding.writer.clone(),
        }
    }
}

/// Builder for a custom directive.
pub struct Directive {
    name: String,
    element: bool,
    def: DirectiveDef,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Directive {
            name: name.into(),
            element: false,
            def: DirectiveDef::new(),
        }
    }

    /// A terminal directive used as a custom element.
    pub fn element(name: impl Into<String>) -> Self {
        let mut directive = Self::new(name);
        directive.element = true;
        directive.def.terminal = true;
        directive
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_binder(mut self, binder: impl Fn(&DirectiveContext) + 'static) -> Self {
        self.def.bind = Some(context_hook(binder));
        self
    }

    /// The updater gets the new value, then the previous one.
    pub fn set_updater(
        mut self,
        updater: impl Fn(&DirectiveContext, &JsValue, &JsValue) + 'static,
    ) -> Self {
        self.def.update = Some(Rc::new(move |binding: &DirectiveBinding| -> Result<(), JErrorType> {
            updater(&DirectiveContext::from(binding), &binding.value, &binding.old_value);
            Ok(())
        }));
        self
    }

    pub fn set_unbinder(mut self, unbinder: impl Fn(&DirectiveContext) + 'static) -> Self {
        self.def.unbind = Some(context_hook(unbinder));
        self
    }

    /// Element attributes to extract into `DirectiveContext::params`.
    pub fn set_params<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.def.params = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_deep(mut self, deep: bool) -> Self {
        self.def.deep = deep;
        self
    }

    pub fn set_two_way(mut self, two_way: bool) -> Self {
        self.def.two_way = two_way;
        self
    }

    pub fn set_accept_statement(mut self, accept: bool) -> Self {
        self.def.accept_statement = accept;
        self
    }

    pub fn set_terminal(mut self, terminal: bool) -> Self {
        self.def.terminal = terminal;
        self
    }

    pub fn set_priority(mut self, priority: i32) -> Self {
        self.def.priority = Some(priority);
        self
    }

    pub fn into_def(self) -> DirectiveDef {
        self.def
    }

    /// Registers globally; an existing directive of that name is replaced.
    pub fn register(self, host: &Host) {
        debug!(directive = %self.name, element = self.element, "registering directive");
        if self.element {
            host.runtime().element_directive(&self.name, self.def)
        } else {
            host.runtime().directive(&self.name, self.def)
        }
    }
}

fn context_hook(f: impl Fn(&DirectiveContext) + 'static) -> DirectiveHook {
    Rc::new(move |binding: &DirectiveBinding| -> Result<(), JErrorType> {
        f(&DirectiveContext::from(binding));
        Ok(())
    })
}
