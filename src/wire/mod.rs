//! MessagePack payload tree. Parsing borrows string, binary and extension bodies from the input,
//! so a [Payload] never outlives the bytes it was read from.

use std::fmt::{Display, Formatter};

use crate::category::PayloadKind;
use crate::error::PackError;

pub mod reader;
pub mod writer;

pub use reader::read;
pub use writer::Writer;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload<'a> {
    Nil,
    Boolean(bool),
    Unsigned(u64),
    /// Always negative, non negative integers are normalized to [Payload::Unsigned].
    Signed(i64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bin(&'a [u8]),
    Array(Vec<Payload<'a>>),
    Map(Vec<(Payload<'a>, Payload<'a>)>),
    Ext(i8, &'a [u8]),
}

impl<'a> Payload<'a> {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Nil => PayloadKind::Nil,
            Payload::Boolean(_) => PayloadKind::Boolean,
            Payload::Unsigned(_) => PayloadKind::PositiveInteger,
            Payload::Signed(_) => PayloadKind::NegativeInteger,
            Payload::F32(_) => PayloadKind::Float32,
            Payload::F64(_) => PayloadKind::Float64,
            Payload::Str(_) => PayloadKind::Str,
            Payload::Bin(_) => PayloadKind::Bin,
            Payload::Array(_) => PayloadKind::Array,
            Payload::Map(_) => PayloadKind::Map,
            Payload::Ext(..) => PayloadKind::Ext,
        }
    }

    pub fn write(&self, writer: &mut Writer) -> Result<(), PackError> {
        match self {
            Payload::Nil => writer.nil(),
            Payload::Boolean(value) => writer.boolean(*value),
            Payload::Unsigned(value) => writer.unsigned(*value),
            Payload::Signed(value) => writer.signed(*value),
            Payload::F32(value) => writer.f32(*value),
            Payload::F64(value) => writer.f64(*value),
            Payload::Str(value) => writer.str(value),
            Payload::Bin(value) => writer.bin(value),
            Payload::Array(items) => {
                writer.array_len(items.len())?;
                items.iter().try_for_each(|item| item.write(writer))
            }
            Payload::Map(entries) => {
                writer.map_len(entries.len())?;
                entries.iter().try_for_each(|(key, value)| {
                    key.write(writer)?;
                    value.write(writer)
                })
            }
            Payload::Ext(code, data) => writer.ext(*code, data),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PackError> {
        let mut writer = Writer::new();
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }
}

impl Display for Payload<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Nil => write!(f, "nil"),
            Payload::Boolean(value) => write!(f, "{value}"),
            Payload::Unsigned(value) => write!(f, "{value}"),
            Payload::Signed(value) => write!(f, "{value}"),
            Payload::F32(value) => write!(f, "{value:?}"),
            Payload::F64(value) => write!(f, "{value:?}"),
            Payload::Str(value) => write!(f, "{value:?}"),
            Payload::Bin(value) => write!(f, "BIN({})", hex::encode(value)),
            Payload::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Payload::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Payload::Ext(code, data) => write!(f, "EXT({code}, {})", hex::encode(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Payload::Signed(-1).kind(), PayloadKind::NegativeInteger);
        assert_eq!(Payload::Unsigned(1).kind(), PayloadKind::PositiveInteger);
        assert_eq!(Payload::Ext(101, b"a").kind().to_string(), "EXT");
    }

    #[test]
    fn writes_nested_payloads() {
        let payload = Payload::Array(vec![Payload::Boolean(false), Payload::Unsigned(345)]);
        assert_eq!(payload.to_bytes().unwrap(), [0x92, 0xc2, 0xcd, 0x01, 0x59]);

        let (back, used) = read(&[0x92, 0xc2, 0xcd, 0x01, 0x59], 8).unwrap();
        assert_eq!(back, payload);
        assert_eq!(used, 5);
    }

    #[test]
    fn display() {
        let payload = Payload::Map(vec![
            (Payload::Str("a"), Payload::Array(vec![Payload::Nil, Payload::Signed(-3)])),
            (Payload::Ext(101, b"x"), Payload::Bin(&[0xca, 0xfe])),
        ]);
        assert_eq!(payload.to_string(), r#"{"a": [nil, -3], EXT(101, 78): BIN(cafe)}"#);
    }
}
