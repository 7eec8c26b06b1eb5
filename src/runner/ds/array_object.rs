use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::runner::ds::object::{Dep, ObjectId};
use crate::runner::ds::value::JsValue;

/// Shared handle to an array.
///
/// Reads are public. Structural mutation is crate-private: callers go through
/// the runtime's instrumented mutators so observers get notified.
#[derive(Clone)]
pub struct JsArray {
    id: ObjectId,
    items: Rc<RefCell<Vec<JsValue>>>,
    dep: Dep,
}

impl JsArray {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<JsValue>) -> Self {
        JsArray {
            id: ObjectId::new(),
            items: Rc::new(RefCell::new(items)),
            dep: Dep::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    pub fn ptr_eq(&self, other: &JsArray) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<JsValue> {
        self.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<JsValue> {
        self.items.borrow().clone()
    }

    pub(crate) fn raw_push(&self, values: Vec<JsValue>) -> usize {
        let mut items = self.items.borrow_mut();
        items.extend(values);
        items.len()
    }

    pub(crate) fn raw_pop(&self) -> Option<JsValue> {
        self.items.borrow_mut().pop()
    }

    pub(crate) fn raw_unshift(&self, values: Vec<JsValue>) -> usize {
        let mut items = self.items.borrow_mut();
        let tail = std::mem::take(&mut *items);
        items.extend(values);
        items.extend(tail);
        items.len()
    }

    pub(crate) fn raw_shift(&self) -> Option<JsValue> {
        let mut items = self.items.borrow_mut();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    /// Script `splice` semantics: negative start counts from the end, both
    /// bounds clamp to the current length. `None` removes through the end.
    pub(crate) fn raw_splice(
        &self,
        start: i64,
        delete_count: Option<usize>,
        values: Vec<JsValue>,
    ) -> Vec<JsValue> {
        let mut items = self.items.borrow_mut();
        let len = items.len() as i64;
        let start = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        } as usize;
        let available = items.len() - start;
        let count = delete_count.map_or(available, |c| c.min(available));
        items.splice(start..start + count, values).collect()
    }

    pub(crate) fn raw_set(&self, index: usize, value: JsValue) {
        let mut items = self.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, JsValue::Undefined);
        }
        items[index] = value;
    }

    /// Stable sort. Without a comparator values order by their string
    /// rendering and `undefined` sinks to the end.
    pub(crate) fn raw_sort(&self, compare: Option<&dyn Fn(&JsValue, &JsValue) -> Ordering>) {
        let mut items = self.items.borrow_mut();
        items.sort_by(|a, b| match (a.is_undefined(), b.is_undefined()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match compare {
                Some(cmp) => cmp(a, b),
                None => a.to_display_string().cmp(&b.to_display_string()),
            },
        });
    }

    pub(crate) fn raw_reverse(&self) {
        self.items.borrow_mut().reverse();
    }
}

impl Default for JsArray {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsArray")
            .field("id", &self.id)
            .field("items", &*self.items.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(arr: &JsArray) -> Vec<i64> {
        arr.to_vec().iter().filter_map(|v| v.as_i64()).collect()
    }

    fn array_of(values: &[i64]) -> JsArray {
        JsArray::from_vec(values.iter().map(|v| JsValue::from(*v)).collect())
    }

    #[test]
    fn test_splice_negative_start() {
        let arr = array_of(&[1, 2, 3, 4]);
        let removed = arr.raw_splice(-2, Some(1), vec![JsValue::from(9)]);
        assert_eq!(removed, vec![JsValue::from(3)]);
        assert_eq!(ints(&arr), vec![1, 2, 9, 4]);
    }

    #[test]
    fn test_splice_clamps_bounds() {
        let arr = array_of(&[1, 2]);
        let removed = arr.raw_splice(10, Some(5), vec![JsValue::from(3)]);
        assert!(removed.is_empty());
        assert_eq!(ints(&arr), vec![1, 2, 3]);

        let removed = arr.raw_splice(1, None, vec![]);
        assert_eq!(removed.len(), 2);
        assert_eq!(ints(&arr), vec![1]);
    }

    #[test]
    fn test_default_sort_is_lexicographic() {
        let arr = array_of(&[10, 9, 1]);
        arr.raw_sort(None);
        assert_eq!(ints(&arr), vec![1, 10, 9]);
    }

    #[test]
    fn test_unshift_keeps_order() {
        let arr = array_of(&[3]);
        assert_eq!(arr.raw_unshift(vec![JsValue::from(1), JsValue::from(2)]), 3);
        assert_eq!(ints(&arr), vec![1, 2, 3]);
    }
}
