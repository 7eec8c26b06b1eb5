//! Array façade tests against a live view model.

extern crate vmkit;

use std::cell::Cell;
use std::rc::Rc;

use vmkit::adapter::{array, Host};
use vmkit::runner::ds::{JsArray, JsObject, JsValue};
use vmkit::runner::HeadlessRuntime;

fn setup() -> (HeadlessRuntime, Host, JsArray, vmkit::ViewModel) {
    let runtime = HeadlessRuntime::new();
    let host = Host::new(Rc::new(runtime.clone()));
    let items = JsArray::from_vec(vec![JsValue::from("a"), JsValue::from("b")]);
    let model = JsObject::from_entries(vec![("items", JsValue::from(items.clone()))]);
    let vm = host.options().set_data(&model).new_view_model().unwrap();
    (runtime, host, items, vm)
}

fn counting(vm: &vmkit::ViewModel, expr: &str) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    vm.watch(expr, move |_: &JsValue| {
        h.set(h.get() + 1);
        Ok(())
    })
    .unwrap();
    hits
}

#[test]
fn test_push_updates_length_and_fires_once() {
    let (runtime, host, items, vm) = setup();
    let hits = counting(&vm, "items");

    let len = array::push(&host, &items, vec![JsValue::from("c")]).unwrap();
    assert_eq!(len, 3);
    assert_eq!(vm.get("items").unwrap().as_array().map(JsArray::len), Some(3));
    runtime.flush();
    assert_eq!(hits.get(), 1);

    runtime.flush();
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_several_mutations_batch_into_one_run() {
    let (runtime, host, items, vm) = setup();
    let hits = counting(&vm, "items");
    array::push(&host, &items, vec![JsValue::from("c")]).unwrap();
    array::reverse(&host, &items).unwrap();
    array::shift(&host, &items).unwrap();
    runtime.flush();
    assert_eq!(hits.get(), 1);
    assert_eq!(items.to_vec(), vec![JsValue::from("b"), JsValue::from("a")]);
}

#[test]
fn test_length_path_watch() {
    let (runtime, host, items, vm) = setup();
    let hits = counting(&vm, "items.length");
    array::sort(&host, &items).unwrap();
    runtime.flush();
    assert_eq!(hits.get(), 0);

    array::pop(&host, &items).unwrap();
    runtime.flush();
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_index_path_watch_with_splice() {
    let (runtime, host, items, vm) = setup();
    let seen = Rc::new(std::cell::RefCell::new(vec![]));
    let s = seen.clone();
    vm.watch("items[1]", move |v: &JsValue| {
        s.borrow_mut().push(v.to_display_string());
        Ok(())
    })
    .unwrap();

    let removed = array::splice(&host, &items, -1, 1, vec![JsValue::from("z")]).unwrap();
    assert_eq!(removed, vec![JsValue::from("b")]);
    array::unshift(&host, &items, vec![]).unwrap();
    runtime.flush();
    assert_eq!(*seen.borrow(), vec!["z".to_string()]);
}
