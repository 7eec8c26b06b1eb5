use thiserror::Error;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectId;
use crate::runner::plugin::config::ConfigError;

/// Errors surfaced by the adapter.
#[derive(Debug, Error)]
pub enum VmError {
    /// Identity registry miss: the data object was never instantiated, or its
    /// view model has been destroyed.
    #[error("no view model is registered for data object {0}")]
    NotRegistered(ObjectId),

    /// A component definition was given a shared mount target instead of a
    /// factory producing one per instance.
    #[error("component mount target must be a factory function, got {0}")]
    InvalidMountTarget(String),

    #[error("no creator is registered under \"{0}\"")]
    UnknownCreator(String),

    #[error(transparent)]
    Runtime(#[from] JErrorType),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<VmError> for JErrorType {
    fn from(e: VmError) -> Self {
        match e {
            VmError::Runtime(inner) => inner,
            VmError::NotRegistered(_) | VmError::UnknownCreator(_) => {
                JErrorType::ReferenceError(e.to_string())
            }
            other => JErrorType::TypeError(other.to_string()),
        }
    }
}
