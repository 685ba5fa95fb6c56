//! The value universe of the soft runtime: tagged 64 bit [Value] words, the [Heap] arena their
//! heap cells live in, and a printer for them.

pub mod error;
pub mod heap;
pub mod tag;
pub mod value;

pub use error::RuntimeError;
pub use heap::Heap;
pub use value::{Cell, ForeignPtr, HashTable, Immediate, Number, OpaqueKind, Value};
