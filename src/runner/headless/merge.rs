//! Option merging, applied in the order global mixins, component definition,
//! instance mixins, own options.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::MergeStrategy;
use crate::runner::types::{Config, DataSource};

/// Folds `child` (after its own mixins) on top of `parent`.
///
/// Hooks concatenate, parent first. Methods, computed properties, components
/// and props data merge by key with the child winning. Props are unioned.
/// Data merges into the child's object. Other scalar options take the
/// child's value when it has one. Custom options go through
/// `optionMergeStrategies` when a strategy is registered for them.
pub(crate) fn merge_options(
    parent: Config,
    child: &Config,
    strategies: &IndexMap<String, MergeStrategy>,
) -> Config {
    let mut merged = parent;
    if let Some(mixins) = &child.mixins {
        for mixin in mixins {
            merged = merge_options(merged, mixin, strategies);
        }
    }

    merge_scalar(&mut merged.name, &child.name);
    merge_scalar(&mut merged.el, &child.el);
    merge_scalar(&mut merged.template, &child.template);
    merge_scalar(&mut merged.parent, &child.parent);
    merge_scalar(&mut merged.delimiters, &child.delimiters);
    merge_scalar(&mut merged.render, &child.render);
    merge_scalar(&mut merged.functional, &child.functional);
    merge_scalar(&mut merged.replace, &child.replace);

    merged.props = merge_props(merged.props.take(), &child.props);
    merged.props_data = merge_map(merged.props_data.take(), &child.props_data);
    merged.methods = merge_map(merged.methods.take(), &child.methods);
    merged.computed = merge_map(merged.computed.take(), &child.computed);
    merged.components = merge_map(merged.components.take(), &child.components);
    merged.data = merge_data(merged.data.take(), &child.data);

    for (event, hooks) in &child.hooks {
        merged
            .hooks
            .entry(*event)
            .or_default()
            .extend(hooks.iter().cloned());
    }

    for (key, value) in &child.custom {
        let value = match strategies.get(key) {
            Some(strategy) => {
                let parent_value = merged.custom.get(key).cloned().unwrap_or(JsValue::Undefined);
                strategy(&parent_value, value)
            }
            None => value.clone(),
        };
        merged.custom.insert(key.clone(), value);
    }

    merged.mixins = None;
    merged
}

fn merge_scalar<T: Clone>(parent: &mut Option<T>, child: &Option<T>) {
    if child.is_some() {
        *parent = child.clone();
    }
}

fn merge_map<V: Clone>(
    parent: Option<IndexMap<String, V>>,
    child: &Option<IndexMap<String, V>>,
) -> Option<IndexMap<String, V>> {
    match (parent, child) {
        (parent, None) => parent,
        (None, Some(child)) => Some(child.clone()),
        (Some(mut parent), Some(child)) => {
            for (k, v) in child {
                parent.insert(k.clone(), v.clone());
            }
            Some(parent)
        }
    }
}

fn merge_props(parent: Option<Vec<String>>, child: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (parent, child) {
        (parent, None) => parent,
        (None, Some(child)) => Some(child.clone()),
        (Some(mut parent), Some(child)) => {
            for name in child {
                if !parent.contains(name) {
                    parent.push(name.clone());
                }
            }
            Some(parent)
        }
    }
}

/// Both present: a factory producing the child's object with the parent's
/// missing fields filled in. The child's object keeps its identity.
fn merge_data(parent: Option<DataSource>, child: &Option<DataSource>) -> Option<DataSource> {
    match (parent, child) {
        (parent, None) => parent,
        (None, Some(child)) => Some(child.clone()),
        (Some(parent), Some(child)) => {
            let child = child.clone();
            Some(DataSource::Factory(Rc::new(move || {
                let into = child.resolve()?;
                let from = parent.resolve()?;
                for (key, value) in from.entries() {
                    if !into.has(&key) {
                        into.set(&key, value);
                    }
                }
                Ok(into)
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::JsObject;
    use crate::runner::types::{HookFn, InstanceRef, LifeCycleEvent};
    use std::cell::RefCell;

    fn logging_hook(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> HookFn {
        let log = log.clone();
        Rc::new(move |_: &InstanceRef| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_hooks_concatenate_mixins_before_own() {
        let log = Rc::new(RefCell::new(vec![]));
        let global = Config::new().with_hook(LifeCycleEvent::Created, logging_hook(&log, "global"));
        let mut own = Config::new().with_hook(LifeCycleEvent::Created, logging_hook(&log, "own"));
        own.mixins = Some(vec![
            Config::new().with_hook(LifeCycleEvent::Created, logging_hook(&log, "a")),
            Config::new().with_hook(LifeCycleEvent::Created, logging_hook(&log, "b")),
        ]);

        let merged = merge_options(Config::new(), &global, &IndexMap::new());
        let merged = merge_options(merged, &own, &IndexMap::new());
        assert_eq!(merged.hook_count(LifeCycleEvent::Created), 4);
        assert!(merged.mixins.is_none());
    }

    #[test]
    fn test_absent_props_stay_absent() {
        let merged = merge_options(Config::new(), &Config::new(), &IndexMap::new());
        assert!(merged.props.is_none());
        assert!(merged.methods.is_none());

        let mut child = Config::new();
        child.props = Some(vec!["a".into(), "b".into()]);
        let mut parent = Config::new();
        parent.props = Some(vec!["b".into(), "c".into()]);
        let merged = merge_options(parent, &child, &IndexMap::new());
        assert_eq!(merged.props.unwrap(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_data_merge_keeps_child_identity() {
        let parent_data = JsObject::from_entries(vec![("a", JsValue::from(1)), ("b", JsValue::from(1))]);
        let child_data = JsObject::from_entries(vec![("b", JsValue::from(2))]);
        let mut parent = Config::new();
        parent.data = Some(DataSource::Object(parent_data));
        let mut child = Config::new();
        child.data = Some(DataSource::Object(child_data.clone()));

        let merged = merge_options(parent, &child, &IndexMap::new());
        let data = merged.data.unwrap().resolve().unwrap();
        assert!(data.ptr_eq(&child_data));
        assert_eq!(data.get("a"), JsValue::from(1));
        assert_eq!(data.get("b"), JsValue::from(2));
    }

    #[test]
    fn test_flags_take_child_value_when_set() {
        let mut parent = Config::new();
        parent.replace = Some(false);
        parent.functional = Some(true);
        let mut child = Config::new();
        child.functional = Some(false);

        let merged = merge_options(parent, &child, &IndexMap::new());
        assert!(!merged.replaces_el());
        assert!(!merged.is_functional());
        assert!(Config::new().replaces_el());
    }

    #[test]
    fn test_custom_option_strategy() {
        let mut strategies: IndexMap<String, MergeStrategy> = IndexMap::new();
        strategies.insert(
            "weight".to_string(),
            Rc::new(|p: &JsValue, c: &JsValue| {
                JsValue::from(p.as_i64().unwrap_or(0) + c.as_i64().unwrap_or(0))
            }),
        );
        let parent = Config::new().with_custom("weight", JsValue::from(2)).with_custom("tag", JsValue::from("p"));
        let child = Config::new().with_custom("weight", JsValue::from(3)).with_custom("tag", JsValue::from("c"));
        let merged = merge_options(parent, &child, &strategies);
        assert_eq!(merged.custom["weight"], JsValue::from(5));
        assert_eq!(merged.custom["tag"], JsValue::from("c"));
    }
}
