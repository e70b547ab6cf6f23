//! Error taxonomy for the execution coordinator.
//!
//! Only `Validation` and `UnknownExecutable` ever become transport-level
//! error responses; execution faults inside an app implementation are
//! recorded in the result payload instead of propagating here.

use thiserror::Error;

use crate::context::ExecutableKind;
use crate::dispatch::DispatchError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Errors surfaced by the execution coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Malformed or incomplete execution request
    #[error("invalid execution request: {message}")]
    Validation { message: String },

    /// No implementation registered for the requested kind and name
    #[error("unknown {kind} {name}")]
    UnknownExecutable { kind: ExecutableKind, name: String },

    /// No resource factory registered for the owning app
    #[error("no resource factory registered for owner {0}")]
    UnknownOwner(String),

    /// Shared store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoordinatorError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<DispatchError> for CoordinatorError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownExecutable { kind, name } => {
                Self::UnknownExecutable { kind, name }
            }
            DispatchError::Store(err) => Self::Store(err),
        }
    }
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownOwner(owner) => Self::UnknownOwner(owner),
            RegistryError::Store(err) => Self::Store(err),
        }
    }
}
