//! MessagePack codec for tagged Lisp runtime values. [pack] classifies a value and writes its
//! wire form, [unpack] parses wire bytes and rebuilds an equivalent value through a
//! [ValueFactory].

pub mod category;
pub mod classify;
pub mod error;
pub mod ext;
pub mod factory;
pub mod flags;
pub mod pack;
pub mod reader;
pub mod unpack;
pub mod wire;

pub use category::{Category, Opaque, PayloadKind};
pub use classify::classify;
pub use error::{Error, PackError, UnpackError};
pub use factory::{Constant, ValueFactory};
pub use flags::{CodecFlags, Config, UnknownPolicy, DEFAULT_MAX_DEPTH};
pub use pack::pack;
pub use unpack::{decode, unpack};
pub use wire::Payload;
