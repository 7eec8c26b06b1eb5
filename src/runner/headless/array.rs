//! Instrumented array mutators.

use tracing::trace;

use crate::runner::ds::array_object::JsArray;
use crate::runner::ds::value::JsValue;
use crate::runner::types::ArrayMutation;

/// Applies one mutator and notifies the array's dependents.
///
/// Returns what the script method returns: the new length for
/// `push`/`unshift`, the removed element for `pop`/`shift`, the removed
/// elements for `splice`, and the array itself for `sort`/`reverse`.
pub(crate) fn apply(array: &JsArray, mutation: ArrayMutation) -> JsValue {
    let method = mutation.method_name();
    let result = match mutation {
        ArrayMutation::Push(items) => JsValue::from(array.raw_push(items)),
        ArrayMutation::Pop => array.raw_pop().unwrap_or(JsValue::Undefined),
        ArrayMutation::Unshift(items) => JsValue::from(array.raw_unshift(items)),
        ArrayMutation::Shift => array.raw_shift().unwrap_or(JsValue::Undefined),
        ArrayMutation::Splice {
            index,
            how_many,
            items,
        } => JsValue::Array(JsArray::from_vec(array.raw_splice(index, how_many, items))),
        ArrayMutation::Sort(compare) => {
            array.raw_sort(compare.as_deref());
            JsValue::Array(array.clone())
        }
        ArrayMutation::Reverse => {
            array.raw_reverse();
            JsValue::Array(array.clone())
        }
    };
    trace!(array = %array.id(), method, len = array.len(), "array mutated");
    array.dep().notify();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::cmp::Ordering;
    use std::rc::Rc;

    fn notifications(array: &JsArray) -> Rc<Cell<usize>> {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        array.dep().subscribe(Rc::new(move || h.set(h.get() + 1)));
        hits
    }

    #[test]
    fn test_every_mutator_notifies() {
        let arr = JsArray::from_vec(vec![JsValue::from(2), JsValue::from(1)]);
        let hits = notifications(&arr);
        apply(&arr, ArrayMutation::Push(vec![JsValue::from(3)]));
        apply(&arr, ArrayMutation::Pop);
        apply(&arr, ArrayMutation::Unshift(vec![JsValue::from(0)]));
        apply(&arr, ArrayMutation::Shift);
        apply(&arr, ArrayMutation::Sort(None));
        apply(&arr, ArrayMutation::Reverse);
        apply(
            &arr,
            ArrayMutation::Splice {
                index: 0,
                how_many: Some(0),
                items: vec![],
            },
        );
        assert_eq!(hits.get(), 7);
    }

    #[test]
    fn test_results_match_script_methods() {
        let arr = JsArray::from_vec(vec![JsValue::from(1)]);
        assert_eq!(
            apply(&arr, ArrayMutation::Push(vec![JsValue::from(2), JsValue::from(3)])),
            JsValue::from(3)
        );
        assert_eq!(apply(&arr, ArrayMutation::Pop), JsValue::from(3));
        assert_eq!(apply(&arr, ArrayMutation::Shift), JsValue::from(1));
        assert_eq!(apply(&JsArray::new(), ArrayMutation::Pop), JsValue::Undefined);

        let removed = apply(
            &arr,
            ArrayMutation::Splice {
                index: 0,
                how_many: Some(1),
                items: vec![JsValue::from(9), JsValue::from(8)],
            },
        );
        assert_eq!(removed.as_array().unwrap().to_vec(), vec![JsValue::from(2)]);
        assert_eq!(arr.to_vec(), vec![JsValue::from(9), JsValue::from(8)]);
    }

    #[test]
    fn test_sort_with_comparator_returns_same_array() {
        let arr = JsArray::from_vec(vec![JsValue::from(1), JsValue::from(10), JsValue::from(2)]);
        let numeric: Rc<dyn Fn(&JsValue, &JsValue) -> Ordering> = Rc::new(|a: &JsValue, b: &JsValue| {
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal)
        });
        let out = apply(&arr, ArrayMutation::Sort(Some(numeric)));
        assert_eq!(out, JsValue::Array(arr.clone()));
        assert_eq!(
            arr.to_vec(),
            vec![JsValue::from(1), JsValue::from(2), JsValue::from(10)]
        );
    }
}
