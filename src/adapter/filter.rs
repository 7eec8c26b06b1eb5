use std::rc::Rc;

use tracing::debug;

use crate::adapter::host::Host;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{FilterDef, FilterFn};

/// A value filter: a read function, optionally paired with a write function
/// applied when a bound value flows back into the model.
pub struct Filter {
    def: FilterDef,
}

impl Filter {
    pub fn new(read: impl Fn(&JsValue) -> JsValue + 'static) -> Self {
        Filter {
            def: FilterDef::read_only(filter_fn(read)),
        }
    }

    pub fn read_write(
        read: impl Fn(&JsValue) -> JsValue + 'static,
        write: impl Fn(&JsValue) -> JsValue + 'static,
    ) -> Self {
        Filter {
            def: FilterDef::two_way(filter_fn(read), filter_fn(write)),
        }
    }

    pub fn into_def(self) -> FilterDef {
        self.def
    }

    pub fn register(self, host: &Host, name: &str) {
        debug!(filter = name, two_way = self.def.write.is_some(), "registering filter");
        host.runtime().filter(name, self.def)
    }
}

fn filter_fn(f: impl Fn(&JsValue) -> JsValue + 'static) -> FilterFn {
    Rc::new(move |value: &JsValue| -> Result<JsValue, JErrorType> { Ok(f(value)) })
}
