use thiserror::Error;

use crate::Value;

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

/// Errors raised when the heap is used with values of the wrong kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("expected a hash table but got {0:#x}")]
    ExpectedHashTable(u64),

    #[error("expected a pair but got {0:#x}")]
    ExpectedPair(u64),
}

impl RuntimeError {
    pub(crate) fn expected_table(value: Value) -> RuntimeError {
        RuntimeError::ExpectedHashTable(value.bits())
    }

    pub(crate) fn expected_pair(value: Value) -> RuntimeError {
        RuntimeError::ExpectedPair(value.bits())
    }
}
