use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::observe::Collected;
use super::scheduler::Scheduler;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{Dep, SubscriberId};
use crate::runner::ds::value::JsValue;
use crate::runner::types::WatchFn;

pub(crate) type Getter = Box<dyn Fn() -> Result<Collected, JErrorType>>;

/// Re-evaluates a getter when one of the deps it read notifies, and calls
/// back when the result changed.
pub(crate) struct Watcher {
    id: u64,
    label: String,
    getter: Getter,
    callback: WatchFn,
    value: RefCell<JsValue>,
    subscriptions: RefCell<Vec<(Dep, SubscriberId)>>,
    value_touched: Rc<Cell<bool>>,
    active: Cell<bool>,
    scheduler: Rc<Scheduler>,
    this: Weak<Watcher>,
}

impl Watcher {
    /// Evaluates the getter once to record the initial value and deps.
    pub fn new(
        id: u64,
        label: impl Into<String>,
        getter: Getter,
        callback: WatchFn,
        scheduler: Rc<Scheduler>,
    ) -> Result<Rc<Watcher>, JErrorType> {
        let label = label.into();
        let watcher = Rc::new_cyclic(|this| Watcher {
            id,
            label,
            getter,
            callback,
            value: RefCell::new(JsValue::Undefined),
            subscriptions: RefCell::new(vec![]),
            value_touched: Rc::new(Cell::new(false)),
            active: Cell::new(true),
            scheduler,
            this: this.clone(),
        });
        let initial = watcher.collect()?;
        *watcher.value.borrow_mut() = initial;
        Ok(watcher)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn collect(&self) -> Result<JsValue, JErrorType> {
        let collected = (self.getter)()?;
        self.unsubscribe_all();
        let mut subscriptions = Vec::with_capacity(collected.path_deps.len() + collected.value_deps.len());
        for dep in collected.path_deps {
            let sid = dep.subscribe(self.trigger(false));
            subscriptions.push((dep, sid));
        }
        for dep in collected.value_deps {
            let sid = dep.subscribe(self.trigger(true));
            subscriptions.push((dep, sid));
        }
        *self.subscriptions.borrow_mut() = subscriptions;
        Ok(collected.value)
    }

    fn trigger(&self, touches_value: bool) -> Rc<dyn Fn()> {
        let this = self.this.clone();
        let touched = self.value_touched.clone();
        Rc::new(move || {
            if let Some(watcher) = this.upgrade() {
                if watcher.active.get() {
                    if touches_value {
                        touched.set(true);
                    }
                    watcher.scheduler.queue_watcher(watcher.clone());
                }
            }
        })
    }

    /// Queues a run that calls back even when nothing changed.
    pub fn force(&self) {
        if let Some(watcher) = self.this.upgrade() {
            self.value_touched.set(true);
            self.scheduler.queue_watcher(watcher);
        }
    }

    pub fn run(&self, on_error: &dyn Fn(&JErrorType, &str)) {
        if !self.active.get() {
            return;
        }
        let touched = self.value_touched.replace(false);
        let new_value = match self.collect() {
            Ok(v) => v,
            Err(e) => {
                on_error(&e, &format!("getter for watcher \"{}\"", self.label));
                return;
            }
        };
        let old_value = self.value.replace(new_value.clone());
        if new_value != old_value || touched {
            trace!(watcher = self.id, label = %self.label, "watcher fired");
            if let Err(e) = (self.callback)(&new_value, &old_value) {
                on_error(&e, &format!("callback for watcher \"{}\"", self.label));
            }
        }
    }

    fn unsubscribe_all(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for (dep, sid) in subscriptions {
            dep.unsubscribe(sid);
        }
    }

    pub fn teardown(&self) {
        self.active.set(false);
        self.unsubscribe_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::JsObject;
    use crate::runner::headless::observe;

    fn field_watcher(obj: &JsObject, key: &'static str, log: Rc<RefCell<Vec<(JsValue, JsValue)>>>, scheduler: Rc<Scheduler>) -> Rc<Watcher> {
        let o = obj.clone();
        Watcher::new(
            1,
            key,
            Box::new(move || {
                let value = o.get(key);
                let mut value_deps = vec![];
                observe::traverse(&value, false, &mut value_deps);
                Ok(Collected {
                    value,
                    path_deps: vec![o.dep().clone()],
                    value_deps,
                })
            }),
            Rc::new(move |new: &JsValue, old: &JsValue| {
                log.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            }),
            scheduler,
        )
        .unwrap()
    }

    #[test]
    fn test_fires_once_per_batch_with_old_value() {
        let scheduler = Rc::new(Scheduler::new());
        let obj = JsObject::from_entries(vec![("a", JsValue::from(1))]);
        let log = Rc::new(RefCell::new(vec![]));
        let _w = field_watcher(&obj, "a", log.clone(), scheduler.clone());

        obj.set("a", JsValue::from(2));
        obj.set("a", JsValue::from(3));
        scheduler.flush(&|_, _| {});
        assert_eq!(*log.borrow(), vec![(JsValue::from(3), JsValue::from(1))]);
    }

    #[test]
    fn test_unrelated_field_change_does_not_fire() {
        let scheduler = Rc::new(Scheduler::new());
        let obj = JsObject::from_entries(vec![("a", JsValue::from(1)), ("b", JsValue::from(1))]);
        let log = Rc::new(RefCell::new(vec![]));
        let _w = field_watcher(&obj, "a", log.clone(), scheduler.clone());

        obj.set("b", JsValue::from(2));
        scheduler.flush(&|_, _| {});
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let scheduler = Rc::new(Scheduler::new());
        let obj = JsObject::from_entries(vec![("a", JsValue::from(1))]);
        let log = Rc::new(RefCell::new(vec![]));
        let w = field_watcher(&obj, "a", log.clone(), scheduler.clone());
        assert_eq!(obj.dep().subscriber_count(), 1);

        w.teardown();
        assert_eq!(obj.dep().subscriber_count(), 0);
        obj.set("a", JsValue::from(5));
        scheduler.flush(&|_, _| {});
        assert!(log.borrow().is_empty());
    }
}
