//! Global asset registry: directives, element directives, filters,
//! components and installed plugins.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::types::{DirectiveDef, FilterDef, PluginInfo};
use crate::runner::types::ComponentCtor;

/// Registering under a name that is already taken replaces the previous
/// definition.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    directives: HashMap<String, DirectiveDef>,
    element_directives: HashMap<String, DirectiveDef>,
    filters: HashMap<String, FilterDef>,
    components: IndexMap<String, ComponentCtor>,
    plugins: Vec<PluginInfo>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_directive(&mut self, name: &str, def: DirectiveDef) {
        if self.directives.insert(name.to_string(), def).is_some() {
            warn!(directive = name, "overwriting directive");
        } else {
            debug!(directive = name, "registered directive");
        }
    }

    pub fn register_element_directive(&mut self, name: &str, def: DirectiveDef) {
        if self.element_directives.insert(name.to_string(), def).is_some() {
            warn!(directive = name, "overwriting element directive");
        } else {
            debug!(directive = name, "registered element directive");
        }
    }

    pub fn register_filter(&mut self, name: &str, def: FilterDef) {
        if self.filters.insert(name.to_string(), def).is_some() {
            warn!(filter = name, "overwriting filter");
        } else {
            debug!(filter = name, "registered filter");
        }
    }

    pub fn register_component(&mut self, name: &str, ctor: ComponentCtor) {
        if self.components.insert(name.to_string(), ctor).is_some() {
            warn!(component = name, "overwriting global component");
        } else {
            debug!(component = name, "registered global component");
        }
    }

    pub fn get_directive(&self, name: &str) -> Option<&DirectiveDef> {
        self.directives.get(name)
    }

    pub fn get_element_directive(&self, name: &str) -> Option<&DirectiveDef> {
        self.element_directives.get(name)
    }

    pub fn get_filter(&self, name: &str) -> Option<&FilterDef> {
        self.filters.get(name)
    }

    pub fn get_component(&self, name: &str) -> Option<&ComponentCtor> {
        self.components.get(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn component_names(&self) -> Vec<&String> {
        self.components.keys().collect()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    pub fn record_plugin(&mut self, info: PluginInfo) {
        debug!(plugin = %info.name, version = %info.version, "installed plugin");
        self.plugins.push(info);
    }

    /// Installed plugins, in installation order.
    pub fn loaded_plugins(&self) -> &[PluginInfo] {
        &self.plugins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::JsValue;
    use crate::runner::types::Config;
    use std::rc::Rc;

    fn upper() -> FilterDef {
        FilterDef::read_only(Rc::new(|v: &JsValue| {
            Ok(JsValue::from(v.to_display_string().to_uppercase()))
        }))
    }

    #[test]
    fn test_filter_overwrite_replaces() {
        let mut registry = AssetRegistry::new();
        registry.register_filter("f", upper());
        registry.register_filter(
            "f",
            FilterDef::read_only(Rc::new(|_: &JsValue| Ok(JsValue::from("second")))),
        );
        let out = registry
            .get_filter("f")
            .unwrap()
            .apply_read(&JsValue::from("x"))
            .unwrap();
        assert_eq!(out, JsValue::from("second"));
    }

    #[test]
    fn test_directive_namespaces_are_separate() {
        let mut registry = AssetRegistry::new();
        registry.register_element_directive("slot", DirectiveDef::new());
        assert!(registry.get_directive("slot").is_none());
        assert!(registry.get_element_directive("slot").is_some());
    }

    #[test]
    fn test_components_keep_registration_order() {
        let mut registry = AssetRegistry::new();
        registry.register_component("b", ComponentCtor::new(1, Config::new()));
        registry.register_component("a", ComponentCtor::new(2, Config::new()));
        assert_eq!(registry.component_names(), vec!["b", "a"]);
        assert_eq!(registry.get_component("a").map(|c| c.cid()), Some(2));
    }

    #[test]
    fn test_plugins_recorded_once_per_call() {
        let mut registry = AssetRegistry::new();
        assert!(!registry.has_plugin("router"));
        registry.record_plugin(PluginInfo::new("router", "1.0.0"));
        assert!(registry.has_plugin("router"));
        assert_eq!(registry.loaded_plugins().len(), 1);
    }
}
