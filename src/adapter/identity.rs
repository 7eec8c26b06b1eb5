use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::adapter::error::VmError;
use crate::adapter::viewmodel::ViewModel;
use crate::runner::ds::object::ObjectId;
use crate::runner::ds::value::JsValue;
use crate::runner::types::LifeCycleEvent;

/// Maps a data object, by identity, to the view model wrapping it.
///
/// Two structurally equal objects have different ids and so never share an
/// entry. Registering an id again replaces its entry.
#[derive(Clone, Default)]
pub struct IdentityRegistry {
    entries: Rc<RefCell<HashMap<ObjectId, ViewModel>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: ObjectId, vm: ViewModel) {
        debug!(key = %key, uid = vm.uid(), "registering view model");
        self.entries.borrow_mut().insert(key, vm);
    }

    pub fn lookup(&self, key: ObjectId) -> Result<ViewModel, VmError> {
        trace!(key = %key, "identity lookup");
        self.entries
            .borrow()
            .get(&key)
            .cloned()
            .ok_or(VmError::NotRegistered(key))
    }

    /// Removes the entry. Returns whether one existed.
    pub fn invalidate(&self, key: ObjectId) -> bool {
        let removed = self.entries.borrow_mut().remove(&key).is_some();
        if removed {
            debug!(key = %key, "invalidated view model entry");
        }
        removed
    }

    pub fn contains(&self, key: ObjectId) -> bool {
        self.entries.borrow().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub(crate) fn downgrade(&self) -> WeakIdentityRegistry {
        WeakIdentityRegistry {
            entries: Rc::downgrade(&self.entries),
        }
    }
}

/// Handle held by instance listeners so they do not keep the registry alive.
#[derive(Clone)]
pub(crate) struct WeakIdentityRegistry {
    entries: Weak<RefCell<HashMap<ObjectId, ViewModel>>>,
}

impl WeakIdentityRegistry {
    /// Registers `vm` under `key` and drops the entry once `vm` is destroyed.
    pub(crate) fn track(&self, key: ObjectId, vm: &ViewModel) {
        let entries = match self.entries.upgrade() {
            Some(entries) => entries,
            None => return,
        };
        let uid = vm.uid();
        debug!(key = %key, uid, "registering view model");
        entries.borrow_mut().insert(key, vm.clone());
        let registry = self.clone();
        vm.once(&LifeCycleEvent::Destroyed.hook_event(), move |_: &[JsValue]| {
            registry.invalidate_if(key, uid)
        });
    }

    /// Removes `key` only while it still maps to the instance `uid`.
    pub(crate) fn invalidate_if(&self, key: ObjectId, uid: u64) {
        if let Some(entries) = self.entries.upgrade() {
            let mut entries = entries.borrow_mut();
            if entries.get(&key).map_or(false, |vm| vm.uid() == uid) {
                entries.remove(&key);
                debug!(key = %key, uid, "view model destroyed; entry invalidated");
            }
        }
    }
}
