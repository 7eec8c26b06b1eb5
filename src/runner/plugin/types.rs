//! Asset definitions registered on a runtime: directives, filters and plugins.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::api::Runtime;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::types::InstanceRef;

/// Writes a value back through a two-way directive's expression.
pub type DirectiveWriter = Rc<dyn Fn(JsValue) -> Result<(), JErrorType>>;

/// Everything a directive hook gets to see about one usage site.
#[derive(Clone)]
pub struct DirectiveBinding {
    /// The bound element.
    pub el: JsValue,
    pub name: String,
    pub arg: Option<String>,
    pub expression: String,
    pub modifiers: Vec<String>,
    /// Element attributes named by the definition's `params`.
    pub params: IndexMap<String, JsValue>,
    pub value: JsValue,
    pub old_value: JsValue,
    /// The instance whose template holds the directive.
    pub instance: InstanceRef,
    /// Present only for two-way directives.
    pub writer: Option<DirectiveWriter>,
}

impl DirectiveBinding {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// `this.set(value)`: assigns through the bound expression.
    pub fn set(&self, value: JsValue) -> Result<(), JErrorType> {
        match &self.writer {
            Some(write) => write(value),
            None => Err(JErrorType::TypeError(format!(
                "directive {} is not two-way",
                self.name
            ))),
        }
    }
}

pub type DirectiveHook = Rc<dyn Fn(&DirectiveBinding) -> Result<(), JErrorType>>;

pub const DEFAULT_PRIORITY: i32 = 1000;
pub const TERMINAL_PRIORITY: i32 = 2000;

/// Directive definition. Every hook is optional.
#[derive(Clone, Default)]
pub struct DirectiveDef {
    pub bind: Option<DirectiveHook>,
    pub update: Option<DirectiveHook>,
    pub unbind: Option<DirectiveHook>,
    /// Attribute names extracted from the element into `binding.params`.
    pub params: Vec<String>,
    /// Also update when a nested property of the value changes.
    pub deep: bool,
    /// Allows `binding.set(value)`.
    pub two_way: bool,
    /// The expression is an inline statement: handed over verbatim, never
    /// evaluated or watched.
    pub accept_statement: bool,
    pub terminal: bool,
    pub priority: Option<i32>,
}

impl DirectiveDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Higher runs first on one element. Defaults to 1000, or 2000 for
    /// terminal directives.
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(if self.terminal {
            TERMINAL_PRIORITY
        } else {
            DEFAULT_PRIORITY
        })
    }

    /// Shorthand form: a single function used as `update`.
    pub fn from_update(update: DirectiveHook) -> Self {
        DirectiveDef {
            update: Some(update),
            ..Self::default()
        }
    }

    pub fn invoke_bind(&self, binding: &DirectiveBinding) -> Result<(), JErrorType> {
        invoke(&self.bind, binding)
    }

    pub fn invoke_update(&self, binding: &DirectiveBinding) -> Result<(), JErrorType> {
        invoke(&self.update, binding)
    }

    pub fn invoke_unbind(&self, binding: &DirectiveBinding) -> Result<(), JErrorType> {
        invoke(&self.unbind, binding)
    }
}

fn invoke(hook: &Option<DirectiveHook>, binding: &DirectiveBinding) -> Result<(), JErrorType> {
    match hook {
        Some(f) => f(binding),
        None => Ok(()),
    }
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDef")
            .field("bind", &self.bind.is_some())
            .field("update", &self.update.is_some())
            .field("unbind", &self.unbind.is_some())
            .field("params", &self.params)
            .field("deep", &self.deep)
            .field("two_way", &self.two_way)
            .field("accept_statement", &self.accept_statement)
            .field("terminal", &self.terminal)
            .field("priority", &self.priority)
            .finish()
    }
}

pub type FilterFn = Rc<dyn Fn(&JsValue) -> Result<JsValue, JErrorType>>;

/// A value transform usable in template expressions. Two-way filters also
/// carry a `write` half applied on the way back into the model.
#[derive(Clone)]
pub struct FilterDef {
    pub read: FilterFn,
    pub write: Option<FilterFn>,
}

impl FilterDef {
    pub fn read_only(read: FilterFn) -> Self {
        FilterDef { read, write: None }
    }

    pub fn two_way(read: FilterFn, write: FilterFn) -> Self {
        FilterDef {
            read,
            write: Some(write),
        }
    }

    pub fn apply_read(&self, value: &JsValue) -> Result<JsValue, JErrorType> {
        (self.read)(value)
    }

    /// Without a `write` half the value passes through unchanged.
    pub fn apply_write(&self, value: &JsValue) -> Result<JsValue, JErrorType> {
        match &self.write {
            Some(w) => w(value),
            None => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for FilterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDef")
            .field("write", &self.write.is_some())
            .finish()
    }
}

/// Plugin metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    /// Plugin name. A runtime installs each name once.
    pub name: String,

    pub version: String,

    /// Asset names this plugin registers.
    pub provides: Vec<String>,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        PluginInfo {
            name: name.into(),
            version: version.into(),
            provides: Vec::new(),
        }
    }

    pub fn with_provides(mut self, provides: Vec<String>) -> Self {
        self.provides = provides;
        self
    }
}

/// `Vue.use(plugin)`: a bundle of global registrations.
pub trait RuntimePlugin {
    fn info(&self) -> PluginInfo;

    fn install(&self, runtime: &dyn Runtime) -> Result<(), JErrorType>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_defaults() {
        let mut def = DirectiveDef::new();
        assert_eq!(def.effective_priority(), DEFAULT_PRIORITY);
        def.terminal = true;
        assert_eq!(def.effective_priority(), TERMINAL_PRIORITY);
        def.priority = Some(10);
        assert_eq!(def.effective_priority(), 10);
    }
}
