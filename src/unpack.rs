//! Decoder: MessagePack bytes to runtime values through a [ValueFactory].

use tracing::{debug, trace};

use crate::error::UnpackError;
use crate::ext::Extension;
use crate::factory::{Constant, ValueFactory};
use crate::flags::{CodecFlags, Config};
use crate::wire::{self, Payload};

pub type Result<T, E = UnpackError> = std::result::Result<T, E>;

/// Parses one payload from `bytes` and rebuilds it with `factory`. Parsing finishes before the
/// factory is called, so malformed input never builds anything.
pub fn unpack<F: ValueFactory>(
    bytes: &[u8],
    factory: &mut F,
    config: &Config,
) -> Result<F::Value> {
    let (payload, used) = wire::read(bytes, config.max_depth)?;

    let trailing = bytes.len() - used;
    if trailing > 0 {
        if config.flags.contains(CodecFlags::STRICT_TRAILING) {
            return Err(UnpackError::TrailingBytes { count: trailing });
        }
        debug!(trailing, "ignoring bytes after the payload");
    }

    let value = decode(&payload, factory, config.flags)?;
    debug!(kind = %payload.kind(), bytes = used, "unpacked value");
    Ok(value)
}

/// Rebuilds an already parsed payload. Children are built before their container, and map
/// entries are inserted in wire order.
pub fn decode<F: ValueFactory>(
    payload: &Payload<'_>,
    factory: &mut F,
    flags: CodecFlags,
) -> Result<F::Value> {
    let mut parents: Vec<Frame<'_, '_, F::Value>> = Vec::new();
    let mut step = open(payload, factory, flags)?;
    loop {
        step = match step {
            Step::Value(value) => match parents.pop() {
                None => return Ok(value),
                Some(mut frame) => {
                    frame.push(factory, value);
                    Step::Open(frame)
                }
            },
            Step::Open(mut frame) => match frame.next() {
                Some(child) => {
                    parents.push(frame);
                    open(child, factory, flags)?
                }
                None => Step::Value(frame.finish(factory, flags)),
            },
        };
    }
}

/// A container whose children are still being built.
enum Frame<'p, 'a, V> {
    Array {
        rest: std::slice::Iter<'p, Payload<'a>>,
        items: Vec<V>,
    },
    Map {
        rest: std::slice::Iter<'p, (Payload<'a>, Payload<'a>)>,
        table: V,
        key: Option<V>,
        value: Option<&'p Payload<'a>>,
    },
}

impl<'p, 'a, V> Frame<'p, 'a, V> {
    fn next(&mut self) -> Option<&'p Payload<'a>> {
        match self {
            Frame::Array { rest, .. } => rest.next(),
            Frame::Map {
                rest, key, value, ..
            } => match key {
                Some(_) => value.take(),
                None => rest.next().map(|(next_key, next_value)| {
                    *value = Some(next_value);
                    next_key
                }),
            },
        }
    }

    fn push<F: ValueFactory<Value = V>>(&mut self, factory: &mut F, child: V) {
        match self {
            Frame::Array { items, .. } => items.push(child),
            Frame::Map { table, key, .. } => match key.take() {
                Some(key) => factory.table_insert(table, key, child),
                None => *key = Some(child),
            },
        }
    }

    fn finish<F: ValueFactory<Value = V>>(self, factory: &mut F, flags: CodecFlags) -> V {
        match self {
            Frame::Array { items, .. } if flags.contains(CodecFlags::ARRAYS_AS_VECTORS) => {
                factory.vector(items)
            }
            Frame::Array { items, .. } => factory.list(items),
            Frame::Map { table, .. } => table,
        }
    }
}

enum Step<'p, 'a, V> {
    Value(V),
    Open(Frame<'p, 'a, V>),
}

/// Builds a scalar outright, or opens the frame of a container.
fn open<'p, 'a, F: ValueFactory>(
    payload: &'p Payload<'a>,
    factory: &mut F,
    flags: CodecFlags,
) -> Result<Step<'p, 'a, F::Value>> {
    trace!(kind = %payload.kind(), "decoding");

    let value = match payload {
        Payload::Nil => factory.constant(Constant::EmptyList),
        Payload::Boolean(value) => factory.boolean(*value),
        Payload::Unsigned(value) => factory.unsigned(*value),
        Payload::Signed(value) => factory.signed(*value),
        Payload::F32(value) => factory.real((*value).into()),
        Payload::F64(value) => factory.real(*value),
        Payload::Str(value) => factory.string(value),
        Payload::Bin(bytes) => factory.bytevector(bytes),
        Payload::Array(items) => {
            return Ok(Step::Open(Frame::Array {
                rest: items.iter(),
                items: Vec::with_capacity(items.len()),
            }))
        }
        Payload::Map(entries) => {
            return Ok(Step::Open(Frame::Map {
                rest: entries.iter(),
                table: factory.table(entries.len()),
                key: None,
                value: None,
            }))
        }
        Payload::Ext(code, data) => extension(*code, data, factory, flags)?,
    };

    Ok(Step::Value(value))
}

fn name(code: i8, data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data).map_err(|_| UnpackError::InvalidName { code })
}

fn extension<F: ValueFactory>(
    code: i8,
    data: &[u8],
    factory: &mut F,
    flags: CodecFlags,
) -> Result<F::Value> {
    let value = match Extension::from_code(code) {
        Extension::EmptyList => factory.constant(Constant::EmptyList),
        Extension::Eof => factory.constant(Constant::Eof),
        Extension::Unspecified => factory.constant(Constant::Unspecified),
        Extension::Undefined => factory.constant(Constant::Undefined),
        Extension::Nil => factory.constant(Constant::Nil),
        Extension::Symbol => {
            let name = name(code, data)?;
            if flags.contains(CodecFlags::DISABLE_SYMBOL_EXT) {
                factory.string(name)
            } else {
                factory.symbol(name)
            }
        }
        Extension::Keyword => {
            let name = name(code, data)?;
            if flags.contains(CodecFlags::DISABLE_KEYWORD_EXT) {
                factory.string(name)
            } else {
                factory.keyword(name)
            }
        }
        Extension::Foreign(code) => {
            trace!(code, len = data.len(), "keeping foreign extension");
            let tag = factory.signed(code.into());
            let body = factory.bytevector(data);
            factory.cons(tag, body)
        }
    };

    Ok(value)
}
