use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::runner::ds::value::JsValue;

/// Field-name prefixes the runtime keeps for itself.
pub const RESERVED_PREFIXES: [char; 2] = ['$', '_'];

/// Reserved keys are never proxied onto instances nor copied by field transfers.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(&RESERVED_PREFIXES[..])
}

/// Reference identity of a container. Two structurally equal objects never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        ObjectId(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type SubscriberId = u64;

struct DepInner {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Rc<dyn Fn()>)>,
}

/// Observer list attached to every container.
///
/// Runtimes subscribe to it while evaluating watch expressions; the container
/// notifies it whenever its own fields or items change.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<RefCell<DepInner>>,
}

impl Dep {
    pub fn new() -> Self {
        Dep {
            inner: Rc::new(RefCell::new(DepInner {
                next_id: 1,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, callback: Rc<dyn Fn()>) -> SubscriberId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, callback));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(sid, _)| *sid != id);
    }

    /// Calls every subscriber in registration order. Subscribers may
    /// (un)subscribe while being notified.
    pub fn notify(&self) {
        let subscribers: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in subscribers {
            cb();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

struct ObjectData {
    properties: IndexMap<String, JsValue>,
}

/// Shared handle to an ordinary object. Cloning the handle shares the object.
#[derive(Clone)]
pub struct JsObject {
    id: ObjectId,
    data: Rc<RefCell<ObjectData>>,
    dep: Dep,
}

impl JsObject {
    pub fn new() -> Self {
        JsObject {
            id: ObjectId::new(),
            data: Rc::new(RefCell::new(ObjectData {
                properties: IndexMap::new(),
            })),
            dep: Dep::new(),
        }
    }

    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, JsValue)>) -> Self {
        let obj = JsObject::new();
        {
            let mut data = obj.data.borrow_mut();
            for (k, v) in entries {
                data.properties.insert(k.into(), v);
            }
        }
        obj
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Missing properties read as `undefined`.
    pub fn get(&self, key: &str) -> JsValue {
        self.data
            .borrow()
            .properties
            .get(key)
            .cloned()
            .unwrap_or(JsValue::Undefined)
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.borrow().properties.contains_key(key)
    }

    /// Writes a field and notifies observers when the stored value changed
    /// or the field is new.
    pub fn set(&self, key: &str, value: JsValue) {
        let changed = {
            let mut data = self.data.borrow_mut();
            match data.properties.get(key) {
                Some(current) if *current == value => false,
                _ => {
                    data.properties.insert(key.to_string(), value);
                    true
                }
            }
        };
        if changed {
            self.dep.notify();
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = self.data.borrow_mut().properties.shift_remove(key).is_some();
        if removed {
            self.dep.notify();
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.borrow().properties.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, JsValue)> {
        self.data
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.borrow().properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("id", &self.id)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key("$meta"));
        assert!(is_reserved_key("_hidden"));
        assert!(!is_reserved_key("name"));
        assert!(!is_reserved_key("a_b"));
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let obj = JsObject::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        obj.dep().subscribe(Rc::new(move || h.set(h.get() + 1)));

        obj.set("a", JsValue::from(1));
        obj.set("a", JsValue::from(1));
        obj.set("a", JsValue::from(2));
        assert_eq!(hits.get(), 2);

        assert!(obj.delete("a"));
        assert!(!obj.delete("a"));
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let dep = Dep::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = dep.subscribe(Rc::new(move || h.set(h.get() + 1)));
        dep.notify();
        dep.unsubscribe(id);
        dep.notify();
        assert_eq!(hits.get(), 1);
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let obj = JsObject::from_entries(vec![("z", JsValue::from(1)), ("a", JsValue::from(2))]);
        assert_eq!(obj.keys(), vec!["z".to_string(), "a".to_string()]);
    }
}
