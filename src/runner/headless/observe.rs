//! Key-path reads with dependency collection, and reactive writes.

use std::collections::HashSet;

use crate::parser::ast::PathSegment;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{Dep, ObjectId};
use crate::runner::ds::value::JsValue;

/// Result of evaluating a watched expression.
///
/// `path_deps` belong to containers the path passes through; a change there
/// only matters if it changes the value. `value_deps` belong to the value
/// itself (and everything under it for deep watchers); any change there counts.
pub(crate) struct Collected {
    pub value: JsValue,
    pub path_deps: Vec<Dep>,
    pub value_deps: Vec<Dep>,
}

pub(crate) fn dep_of(value: &JsValue) -> Option<Dep> {
    match value {
        JsValue::Object(o) => Some(o.dep().clone()),
        JsValue::Array(a) => Some(a.dep().clone()),
        _ => None,
    }
}

pub(crate) fn push_dep(deps: &mut Vec<Dep>, dep: Dep) {
    if !deps.iter().any(|d| d.ptr_eq(&dep)) {
        deps.push(dep);
    }
}

pub(crate) fn read_segment(value: &JsValue, segment: &PathSegment) -> JsValue {
    match (value, segment) {
        (JsValue::Object(o), s) => o.get(&s.as_key()),
        (JsValue::Array(a), PathSegment::Index(i)) => a.get(*i).unwrap_or(JsValue::Undefined),
        (JsValue::Array(a), PathSegment::Key(k)) if k == "length" => JsValue::from(a.len()),
        (JsValue::Array(a), PathSegment::Key(k)) => k
            .parse::<usize>()
            .ok()
            .and_then(|i| a.get(i))
            .unwrap_or(JsValue::Undefined),
        _ => JsValue::Undefined,
    }
}

/// Follows `segments` from `start`, recording every container passed through.
pub(crate) fn walk(start: JsValue, segments: &[PathSegment], path_deps: &mut Vec<Dep>) -> JsValue {
    let mut current = start;
    for segment in segments {
        if let Some(dep) = dep_of(&current) {
            push_dep(path_deps, dep);
        }
        current = read_segment(&current, segment);
    }
    current
}

/// Records the value's own dep, and with `deep` every container reachable
/// from it.
pub(crate) fn traverse(value: &JsValue, deep: bool, deps: &mut Vec<Dep>) {
    let mut seen = HashSet::new();
    traverse_inner(value, deep, deps, &mut seen);
}

fn traverse_inner(value: &JsValue, deep: bool, deps: &mut Vec<Dep>, seen: &mut HashSet<ObjectId>) {
    let id = match value.container_id() {
        Some(id) => id,
        None => return,
    };
    if !seen.insert(id) {
        return;
    }
    if let Some(dep) = dep_of(value) {
        push_dep(deps, dep);
    }
    if !deep {
        return;
    }
    match value {
        JsValue::Object(o) => {
            for (_, v) in o.entries() {
                traverse_inner(&v, deep, deps, seen);
            }
        }
        JsValue::Array(a) => {
            for v in a.to_vec() {
                traverse_inner(&v, deep, deps, seen);
            }
        }
        _ => {}
    }
}

fn parse_index(key: &str) -> Result<usize, JErrorType> {
    key.parse::<usize>()
        .map_err(|_| JErrorType::RangeError(format!("invalid array index \"{}\"", key)))
}

/// `Vue.set`: adds or updates a field and notifies dependents.
pub(crate) fn reactive_set(target: &JsValue, key: &str, value: JsValue) -> Result<(), JErrorType> {
    match target {
        JsValue::Object(o) => {
            o.set(key, value);
            Ok(())
        }
        JsValue::Array(a) => {
            let index = parse_index(key)?;
            a.raw_set(index, value);
            a.dep().notify();
            Ok(())
        }
        other => Err(JErrorType::TypeError(format!(
            "cannot set reactive property \"{}\" on {} value",
            key,
            other.type_of()
        ))),
    }
}

/// `Vue.delete`: removes a field (or array slot) and notifies dependents.
pub(crate) fn reactive_delete(target: &JsValue, key: &str) -> Result<(), JErrorType> {
    match target {
        JsValue::Object(o) => {
            o.delete(key);
            Ok(())
        }
        JsValue::Array(a) => {
            let index = parse_index(key)?;
            if index < a.len() {
                a.raw_splice(index as i64, Some(1), vec![]);
                a.dep().notify();
            }
            Ok(())
        }
        other => Err(JErrorType::TypeError(format!(
            "cannot delete reactive property \"{}\" on {} value",
            key,
            other.type_of()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::array_object::JsArray;
    use crate::runner::ds::object::JsObject;

    #[test]
    fn test_walk_records_intermediate_containers() {
        let item = JsObject::from_entries(vec![("name", JsValue::from("a"))]);
        let items = JsArray::from_vec(vec![JsValue::Object(item.clone())]);
        let mut deps = vec![];
        let value = walk(
            JsValue::Array(items),
            &[PathSegment::Index(0), PathSegment::Key("name".to_string())],
            &mut deps,
        );
        assert_eq!(value, JsValue::from("a"));
        assert_eq!(deps.len(), 2);
        assert!(deps[1].ptr_eq(item.dep()));
    }

    #[test]
    fn test_deep_traverse_handles_cycles() {
        let obj = JsObject::new();
        let child = JsObject::new();
        obj.set("child", JsValue::Object(child.clone()));
        child.set("back", JsValue::Object(obj.clone()));

        let mut shallow = vec![];
        traverse(&JsValue::Object(obj.clone()), false, &mut shallow);
        assert_eq!(shallow.len(), 1);

        let mut deep = vec![];
        traverse(&JsValue::Object(obj), true, &mut deep);
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_array_length_segment() {
        let arr = JsArray::from_vec(vec![JsValue::from(1), JsValue::from(2)]);
        let len = read_segment(&JsValue::Array(arr), &PathSegment::Key("length".to_string()));
        assert_eq!(len, JsValue::from(2));
    }

    #[test]
    fn test_reactive_set_on_array_index() {
        let arr = JsArray::new();
        reactive_set(&JsValue::Array(arr.clone()), "2", JsValue::from(7)).unwrap();
        assert_eq!(arr.len(), 3);
        assert!(reactive_set(&JsValue::Array(arr.clone()), "x", JsValue::Null).is_err());
        reactive_delete(&JsValue::Array(arr.clone()), "0").unwrap();
        assert_eq!(arr.len(), 2);
        assert!(reactive_set(&JsValue::from(1), "a", JsValue::Null).is_err());
    }
}
