//! Typed front for the runtime's instrumented array mutators.
//!
//! Every call goes through `Runtime::mutate_array`, so watchers of the array
//! are notified. Replacing the whole contents is not offered.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::adapter::error::VmError;
use crate::adapter::host::Host;
use crate::runner::ds::array_object::JsArray;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::types::{ArrayMutation, Comparator};

/// Appends `items`; returns the new length.
pub fn push(host: &Host, array: &JsArray, items: Vec<JsValue>) -> Result<usize, VmError> {
    length(mutate(host, array, ArrayMutation::Push(items))?)
}

/// Removes the last element; `undefined` when empty.
pub fn pop(host: &Host, array: &JsArray) -> Result<JsValue, VmError> {
    mutate(host, array, ArrayMutation::Pop)
}

pub fn unshift(host: &Host, array: &JsArray, items: Vec<JsValue>) -> Result<usize, VmError> {
    length(mutate(host, array, ArrayMutation::Unshift(items))?)
}

pub fn shift(host: &Host, array: &JsArray) -> Result<JsValue, VmError> {
    mutate(host, array, ArrayMutation::Shift)
}

/// Removes `how_many` elements at `index` and inserts `items` there.
/// A negative index counts from the end. Returns the removed elements.
pub fn splice(
    host: &Host,
    array: &JsArray,
    index: i64,
    how_many: usize,
    items: Vec<JsValue>,
) -> Result<Vec<JsValue>, VmError> {
    let removed = mutate(
        host,
        array,
        ArrayMutation::Splice {
            index,
            how_many: Some(how_many),
            items,
        },
    )?;
    match removed {
        JsValue::Array(removed) => Ok(removed.to_vec()),
        other => Err(unexpected("splice", &other)),
    }
}

/// Sorts in place by the string form of the values.
pub fn sort(host: &Host, array: &JsArray) -> Result<JsArray, VmError> {
    same_array(mutate(host, array, ArrayMutation::Sort(None))?)
}

pub fn sort_by(
    host: &Host,
    array: &JsArray,
    compare: impl Fn(&JsValue, &JsValue) -> Ordering + 'static,
) -> Result<JsArray, VmError> {
    let compare: Comparator = Rc::new(compare);
    same_array(mutate(host, array, ArrayMutation::Sort(Some(compare)))?)
}

pub fn reverse(host: &Host, array: &JsArray) -> Result<JsArray, VmError> {
    same_array(mutate(host, array, ArrayMutation::Reverse)?)
}

/// Read-only iteration over a snapshot of the items.
pub fn each(array: &JsArray, mut f: impl FnMut(usize, &JsValue)) {
    for (i, item) in array.to_vec().iter().enumerate() {
        f(i, item);
    }
}

fn mutate(host: &Host, array: &JsArray, mutation: ArrayMutation) -> Result<JsValue, VmError> {
    Ok(host.runtime().mutate_array(array, mutation)?)
}

fn length(result: JsValue) -> Result<usize, VmError> {
    result
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| unexpected("length", &result))
}

fn same_array(result: JsValue) -> Result<JsArray, VmError> {
    match result {
        JsValue::Array(array) => Ok(array),
        other => Err(unexpected("array", &other)),
    }
}

fn unexpected(expected: &str, got: &JsValue) -> VmError {
    JErrorType::TypeError(format!(
        "array mutator returned {} where {} was expected",
        got.type_of(),
        expected
    ))
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::headless::HeadlessRuntime;

    fn host() -> Host {
        Host::new(Rc::new(HeadlessRuntime::new()))
    }

    fn ints(arr: &JsArray) -> Vec<i64> {
        arr.to_vec().iter().filter_map(JsValue::as_i64).collect()
    }

    #[test]
    fn test_push_and_pop() {
        let host = host();
        let arr = JsArray::new();
        assert_eq!(push(&host, &arr, vec![JsValue::from(1), JsValue::from(2)]).unwrap(), 2);
        assert_eq!(pop(&host, &arr).unwrap(), JsValue::from(2));
        assert_eq!(pop(&host, &arr).unwrap(), JsValue::from(1));
        assert!(pop(&host, &arr).unwrap().is_undefined());
    }

    #[test]
    fn test_splice_returns_removed() {
        let host = host();
        let arr = JsArray::from_vec((1..=5).map(JsValue::from).collect());
        let removed = splice(&host, &arr, 1, 2, vec![JsValue::from(9)]).unwrap();
        assert_eq!(removed, vec![JsValue::from(2), JsValue::from(3)]);
        assert_eq!(ints(&arr), vec![1, 9, 4, 5]);
    }

    #[test]
    fn test_sort_with_comparator_returns_same_array() {
        let host = host();
        let arr = JsArray::from_vec(vec![JsValue::from(3), JsValue::from(10), JsValue::from(1)]);
        let sorted = sort_by(&host, &arr, |a: &JsValue, b: &JsValue| a.as_i64().cmp(&b.as_i64())).unwrap();
        assert!(sorted.ptr_eq(&arr));
        assert_eq!(ints(&arr), vec![1, 3, 10]);

        sort(&host, &arr).unwrap();
        assert_eq!(ints(&arr), vec![1, 10, 3]);
    }

    #[test]
    fn test_unshift_shift_reverse() {
        let host = host();
        let arr = JsArray::from_vec(vec![JsValue::from(2)]);
        assert_eq!(unshift(&host, &arr, vec![JsValue::from(1)]).unwrap(), 2);
        reverse(&host, &arr).unwrap();
        assert_eq!(ints(&arr), vec![2, 1]);
        assert_eq!(shift(&host, &arr).unwrap(), JsValue::from(2));

        let mut seen = vec![];
        each(&arr, |i, v| seen.push((i, v.as_i64())));
        assert_eq!(seen, vec![(0, Some(1))]);
    }
}
