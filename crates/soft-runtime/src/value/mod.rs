//! This module describes the values that the soft runtime
//! manipulates. [Value] uses a pointer tagging scheme as each
//! heap cell is 8 byte aligned in a 64 bit architecture.

use crate::tag::{self, imm, tc3, TC2_FIXNUM, TC2_MASK, TC3_MASK, TC8_MASK};

pub mod display;
pub mod pointer;
pub mod tagged;

pub use pointer::*;
pub use tagged::Immediate;

/// A tagged runtime word. It is either an immediate, where the data lives in the word itself,
/// or the address of a cell inside a [crate::Heap].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Value(pub(crate) u64);

impl Value {
    pub const FALSE: Value = Value(imm::FALSE);
    pub const TRUE: Value = Value(imm::TRUE);
    pub const NIL: Value = Value(imm::NIL);
    pub const EOL: Value = Value(imm::EOL);
    pub const EOF: Value = Value(imm::EOF);
    pub const UNSPECIFIED: Value = Value(imm::UNSPECIFIED);
    pub const UNDEFINED: Value = Value(imm::UNDEFINED);

    /// Rebuilds a value from a raw word. Nothing is checked, classification is what tells if the
    /// word makes sense.
    #[inline]
    pub const fn from_bits(bits: u64) -> Value {
        Value(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn tc3(self) -> u64 {
        self.0 & TC3_MASK
    }

    #[inline]
    pub fn is_heap(self) -> bool {
        self.tc3() == tc3::HEAP
    }

    #[inline]
    pub fn is_immediate(self) -> bool {
        !self.is_heap()
    }

    #[inline]
    pub fn is_fixnum(self) -> bool {
        self.0 & TC2_MASK == TC2_FIXNUM
    }

    #[inline]
    pub fn is_char(self) -> bool {
        self.0 & TC8_MASK == imm::CHAR
    }

    pub fn boolean(value: bool) -> Value {
        value.into_value()
    }

    /// Creates a fixnum, [None] when the number does not fit in 62 bits.
    pub fn fixnum(number: i64) -> Option<Value> {
        if (tag::FIXNUM_MIN..=tag::FIXNUM_MAX).contains(&number) {
            Some(number.into_value())
        } else {
            None
        }
    }

    pub fn character(chr: char) -> Value {
        chr.into_value()
    }

    pub fn as_fixnum(self) -> Option<i64> {
        i64::from_value(self)
    }

    pub fn as_char(self) -> Option<char> {
        char::from_value(self)
    }

    /// Scheme truthiness, everything but `#f` and `#nil` is true.
    pub fn is_true(self) -> bool {
        self != Value::FALSE && self != Value::NIL
    }

    pub fn is_eol(self) -> bool {
        self == Value::EOL
    }

    /// Index of the heap cell this word points to.
    pub(crate) fn address(self) -> Option<usize> {
        if !self.is_heap() || self.0 == 0 {
            return None;
        }
        usize::try_from((self.0 >> 3) - 1).ok()
    }

    pub(crate) fn from_address(index: usize) -> Value {
        Value(((index as u64) + 1) << 3)
    }
}
