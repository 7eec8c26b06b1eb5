use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::adapter::error::VmError;
use crate::adapter::model::DataModel;

pub type CreatorFn = Rc<dyn Fn() -> Rc<dyn DataModel>>;

struct Creator {
    factory: CreatorFn,
    cached: Option<Rc<dyn DataModel>>,
    counter: u64,
}

/// What one pool access handed out.
#[derive(Clone)]
pub struct Access {
    pub value: Rc<dyn DataModel>,
    /// Whether the factory ran for this access.
    pub produced: bool,
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Access")
            .field("object", &self.value.object().id())
            .field("produced", &self.produced)
            .finish()
    }
}

/// Per-name model creators for reusable components.
///
/// Each access runs the factory only when the entry's counter is a multiple
/// of three and otherwise hands out the cached model, so accesses 0, 3, 6...
/// produce fresh state and the ones in between reuse it. A component
/// instantiation makes exactly three accesses (methods, registration, data),
/// so every instance starts from its own model.
#[derive(Clone, Default)]
pub struct CreatorPool {
    entries: Rc<RefCell<HashMap<String, Creator>>>,
}

impl CreatorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, resetting any existing entry.
    pub fn register(&self, name: &str, factory: CreatorFn) {
        let replaced = self
            .entries
            .borrow_mut()
            .insert(
                name.to_string(),
                Creator {
                    factory,
                    cached: None,
                    counter: 0,
                },
            )
            .is_some();
        debug!(creator = name, replaced, "registered creator");
    }

    pub fn access(&self, name: &str) -> Result<Access, VmError> {
        let (factory, cached) = {
            let entries = self.entries.borrow();
            let creator = entries
                .get(name)
                .ok_or_else(|| VmError::UnknownCreator(name.to_string()))?;
            let cached = if creator.counter % 3 == 0 {
                None
            } else {
                creator.cached.clone()
            };
            (creator.factory.clone(), cached)
        };

        // The factory may touch the pool, so no borrow is held while it runs.
        let access = match cached {
            Some(value) => Access {
                value,
                produced: false,
            },
            None => Access {
                value: factory(),
                produced: true,
            },
        };

        let mut entries = self.entries.borrow_mut();
        if let Some(creator) = entries.get_mut(name) {
            if access.produced {
                creator.cached = Some(access.value.clone());
            }
            creator.counter += 1;
            trace!(creator = name, counter = creator.counter, produced = access.produced, "creator accessed");
        }
        Ok(access)
    }

    pub fn counter(&self, name: &str) -> Option<u64> {
        self.entries.borrow().get(name).map(|c| c.counter)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::JsObject;
    use std::cell::Cell;

    fn blank() -> CreatorFn {
        Rc::new(|| -> Rc<dyn DataModel> { Rc::new(JsObject::new()) })
    }

    #[test]
    fn test_cadence_over_six_accesses() {
        let pool = CreatorPool::new();
        pool.register("card", blank());
        let produced: Vec<bool> = (0..6).map(|_| pool.access("card").unwrap().produced).collect();
        assert_eq!(produced, vec![true, false, false, true, false, false]);
        assert_eq!(pool.counter("card"), Some(6));
    }

    #[test]
    fn test_reuses_cached_model() {
        let pool = CreatorPool::new();
        pool.register("card", blank());
        let first = pool.access("card").unwrap().value.object();
        let second = pool.access("card").unwrap().value.object();
        let third = pool.access("card").unwrap().value.object();
        let fourth = pool.access("card").unwrap().value.object();
        assert!(first.ptr_eq(&second));
        assert!(first.ptr_eq(&third));
        assert!(!first.ptr_eq(&fourth));
    }

    #[test]
    fn test_unknown_creator() {
        let pool = CreatorPool::new();
        assert!(matches!(pool.access("nope"), Err(VmError::UnknownCreator(_))));
    }

    #[test]
    fn test_reregister_resets_counter() {
        let pool = CreatorPool::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        pool.register(
            "card",
            Rc::new(move || -> Rc<dyn DataModel> {
                c.set(c.get() + 1);
                Rc::new(JsObject::new())
            }),
        );
        pool.access("card").unwrap();
        pool.access("card").unwrap();
        pool.register("card", blank());
        assert_eq!(pool.counter("card"), Some(0));
        assert!(pool.access("card").unwrap().produced);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_factory_may_reenter_pool() {
        let pool = CreatorPool::new();
        let inner = pool.clone();
        pool.register("leaf", blank());
        pool.register(
            "tree",
            Rc::new(move || -> Rc<dyn DataModel> {
                let leaf = inner
                    .access("leaf")
                    .map(|a| a.value.object())
                    .unwrap_or_default();
                Rc::new(JsObject::from_entries(vec![("leaf", leaf.into())]))
            }),
        );
        assert!(pool.access("tree").unwrap().produced);
        assert_eq!(pool.counter("leaf"), Some(1));
    }
}
