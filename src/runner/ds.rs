//! Data structures shared across the runtime boundary: values, objects,
//! arrays and the runtime error type.

pub mod array_object;
pub mod error;
pub mod object;
pub mod value;

pub use array_object::JsArray;
pub use error::JErrorType;
pub use object::{is_reserved_key, Dep, JsObject, ObjectId};
pub use value::{JsNumberType, JsValue};
