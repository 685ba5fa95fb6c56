use super::*;

/// Rust types that are stored directly inside of a [Value] word, without touching the heap.
pub trait Immediate
where
    Self: Sized + Copy,
{
    /// Bits that identify the immediate kind.
    const TAG: u64;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl Immediate for i64 {
    const TAG: u64 = TC2_FIXNUM;

    /// Callers go through [Value::fixnum], which checks the range first.
    fn into_value(self) -> Value {
        Value(((self as u64) << 2) | Self::TAG)
    }

    fn from_value(value: Value) -> Option<Self> {
        if value.is_fixnum() {
            Some((value.0 as i64) >> 2)
        } else {
            None
        }
    }
}

impl Immediate for char {
    const TAG: u64 = imm::CHAR;

    fn into_value(self) -> Value {
        Value(((self as u64) << 8) | Self::TAG)
    }

    fn from_value(value: Value) -> Option<Self> {
        if value.is_char() {
            u32::try_from(value.0 >> 8).ok().and_then(char::from_u32)
        } else {
            None
        }
    }
}

impl Immediate for bool {
    const TAG: u64 = imm::FALSE;

    fn into_value(self) -> Value {
        if self {
            Value(imm::TRUE)
        } else {
            Value(Self::TAG)
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value.0 {
            imm::TRUE => Some(true),
            imm::FALSE => Some(false),
            _ => None,
        }
    }
}
