//! Identity registry and creator pool tests.

extern crate vmkit;

use std::cell::Cell;
use std::rc::Rc;

use vmkit::adapter::{CreatorPool, DataModel, Host, IdentityRegistry, Method, ViewModel, VmError};
use vmkit::runner::ds::{JsObject, JsValue};
use vmkit::runner::HeadlessRuntime;

fn host() -> Host {
    Host::new(Rc::new(HeadlessRuntime::new()))
}

/// A host type exposing a field and a method through `DataModel`.
struct Counter {
    state: JsObject,
}

impl Counter {
    fn new(start: i64) -> Self {
        Counter {
            state: JsObject::from_entries(vec![("count", JsValue::from(start))]),
        }
    }
}

impl DataModel for Counter {
    fn object(&self) -> JsObject {
        self.state.clone()
    }

    fn describe_methods(&self) -> Vec<(String, Method)> {
        let increment: Method = Rc::new(|vm: &ViewModel, args: &[JsValue]| {
            let step = args.first().and_then(JsValue::as_i64).unwrap_or(1);
            let next = vm.get("count")?.as_i64().unwrap_or(0) + step;
            vm.set("count", next)?;
            Ok(JsValue::from(next))
        });
        vec![("increment".to_string(), increment)]
    }
}

// ============================================================================
// Identity registry
// ============================================================================

#[test]
fn test_register_then_lookup() {
    let host = host();
    let registry = IdentityRegistry::new();
    let model = JsObject::new();
    let vm = host.options().new_view_model().unwrap();

    registry.register(model.id(), vm.clone());
    assert_eq!(registry.lookup(model.id()).unwrap(), vm);
}

#[test]
fn test_lookup_unregistered() {
    let registry = IdentityRegistry::new();
    let model = JsObject::new();
    assert!(matches!(registry.lookup(model.id()), Err(VmError::NotRegistered(id)) if id == model.id()));
}

#[test]
fn test_keys_are_identities() {
    let host = host();
    let registry = IdentityRegistry::new();
    let a = JsObject::from_entries(vec![("x", JsValue::from(1))]);
    let b = JsObject::from_entries(vec![("x", JsValue::from(1))]);
    registry.register(a.id(), host.options().new_view_model().unwrap());
    assert!(registry.contains(a.id()));
    assert!(!registry.contains(b.id()));
}

#[test]
fn test_last_write_wins() {
    let host = host();
    let registry = IdentityRegistry::new();
    let model = JsObject::new();
    let first = host.options().new_view_model().unwrap();
    let second = host.options().new_view_model().unwrap();
    registry.register(model.id(), first);
    registry.register(model.id(), second.clone());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup(model.id()).unwrap(), second);

    assert!(registry.invalidate(model.id()));
    assert!(!registry.invalidate(model.id()));
    assert!(registry.is_empty());
}

#[test]
fn test_view_model_of_data_model() {
    let host = host();
    let counter = Counter::new(1);
    let vm = ViewModel::new(&host, "#counter", &counter).unwrap();
    assert_eq!(host.view_model_of(&counter).unwrap(), vm);

    assert_eq!(vm.call("increment", &[JsValue::from(2)]).unwrap(), JsValue::from(3));
    assert_eq!(counter.object().get("count"), JsValue::from(3));
}

#[test]
fn test_component_methods_come_from_pooled_model() {
    let host = host();
    let component = host
        .options()
        .set_name("counter")
        .set_data_creator("counter", || Counter::new(10))
        .new_component()
        .unwrap();
    let a = component.new_view_model().unwrap();
    let b = component.new_view_model().unwrap();

    assert_eq!(a.call("increment", &[JsValue::from(2)]).unwrap(), JsValue::from(12));
    assert_eq!(a.get("count").unwrap(), JsValue::from(12));
    assert_eq!(b.get("count").unwrap(), JsValue::from(10));
    assert_eq!(b.call("increment", &[]).unwrap(), JsValue::from(11));
    assert_eq!(host.registry().lookup(a.data().id()).unwrap(), a);
}

#[test]
fn test_component_from_creator_registers_globally() {
    let host = host();
    assert!(host.get_component("counter").is_none());

    let defined = host
        .component_from_creator("counter", || Counter::new(1), "<button>{{ count }}</button>", false)
        .unwrap();
    let found = host.get_component("counter").unwrap();
    assert_eq!(found.cid(), defined.cid());
    assert_eq!(found.name(), Some("counter"));
    assert!(!found.ctor().options().replaces_el());
    assert_eq!(
        found.ctor().options().template.as_deref(),
        Some("<button>{{ count }}</button>")
    );

    let vm = found.new_view_model().unwrap();
    assert_eq!(vm.call("increment", &[]).unwrap(), JsValue::from(2));
    assert_eq!(host.view_model_of(&vm.data()).unwrap(), vm);
}

#[test]
fn test_teardown_clears_state() {
    let host = host();
    let counter = Counter::new(0);
    ViewModel::new(&host, "#counter", &counter).unwrap();
    host.pool().register("c", Rc::new(|| -> Rc<dyn DataModel> { Rc::new(JsObject::new()) }));

    host.teardown();
    assert!(host.registry().is_empty());
    assert!(!host.pool().contains("c"));
    assert!(host.view_model_of(&counter).is_err());
}

// ============================================================================
// Creator pool
// ============================================================================

#[test]
fn test_pool_cadence() {
    let pool = CreatorPool::new();
    let made = Rc::new(Cell::new(0));
    let m = made.clone();
    pool.register(
        "row",
        Rc::new(move || -> Rc<dyn DataModel> {
            m.set(m.get() + 1);
            Rc::new(JsObject::new())
        }),
    );
    let produced: Vec<bool> = (0..6).map(|_| pool.access("row").unwrap().produced).collect();
    assert_eq!(produced, vec![true, false, false, true, false, false]);
    assert_eq!(made.get(), 2);
}

#[test]
fn test_pool_unknown_name() {
    let pool = CreatorPool::new();
    match pool.access("ghost") {
        Err(VmError::UnknownCreator(name)) => assert_eq!(name, "ghost"),
        other => panic!("unexpected {:?}", other.map(|a| a.produced)),
    }
}

#[test]
fn test_creator_error_surfaces_at_instantiation() {
    let host = host();
    let options = host.options().set_data_creator("x", JsObject::new);
    host.pool().clear();
    let err = options.new_view_model().unwrap_err();
    assert!(matches!(err, VmError::Runtime(_)));
}
