use thiserror::Error;

use crate::category::Category;
use crate::reader::ReadError;

/// Failures of [crate::pack]. None of them are retried, the same value and flags always fail
/// the same way.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("value {bits:#x} has tag bits that match no known type")]
    InvalidTag { bits: u64 },

    #[error("cannot pack value of type {category}")]
    Unsupported { category: Category },

    #[error("integer {value} does not fit in 64 bits")]
    Overflow { value: i128 },

    /// The live entry count of a table disagrees with what its buckets hold.
    #[error("hash table declares {declared} entries but {emitted} were found")]
    Consistency { declared: usize, emitted: usize },

    #[error("improper list, the tail is not the empty list")]
    ImproperList,

    #[error("cyclic list")]
    CyclicList,

    #[error("nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("{len} elements do not fit in a wire length")]
    TooLarge { len: usize },

    #[error("failed to write: {0}")]
    Write(#[from] std::io::Error),
}

/// Failures of [crate::unpack]. A failed decode never hands out a partially built value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpackError {
    #[error("unexpected end of input at byte {offset}, {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("reserved marker {marker:#04x} at byte {offset}")]
    Reserved { offset: usize, marker: u8 },

    #[error("invalid UTF-8 in string at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("extension {code} carries a name that is not UTF-8")]
    InvalidName { code: i8 },

    #[error("nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("{count} trailing bytes after the payload")]
    TrailingBytes { count: usize },
}

impl UnpackError {
    /// Truncated or structurally invalid input.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            UnpackError::Truncated { .. }
                | UnpackError::Reserved { .. }
                | UnpackError::InvalidUtf8 { .. }
                | UnpackError::InvalidName { .. }
        )
    }
}

/// Everything the command line can fail with.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),
}
