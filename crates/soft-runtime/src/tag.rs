//! Bit layout of a runtime [crate::Value]. The low three bits of every word are the `tc3` tag,
//! heap cells carry their own type word whose low seven bits are the `tc7` tag.

/// Mask of the two lowest tag bits.
pub const TC2_MASK: u64 = 0b11;

/// Mask of the three lowest tag bits.
pub const TC3_MASK: u64 = 0b111;

/// Mask of the seven lowest bits of a heap type word.
pub const TC7_MASK: u64 = 0b111_1111;

/// Mask of the eight lowest bits, used for characters.
pub const TC8_MASK: u64 = 0xff;

/// Words whose low two bits are `10` are fixnums.
pub const TC2_FIXNUM: u64 = 0b10;

/// `tc3` tags of a handle.
pub mod tc3 {
    pub const HEAP: u64 = 0b000;
    pub const EVEN_FIXNUM: u64 = 0b010;
    pub const IMMEDIATE: u64 = 0b100;
    pub const ODD_FIXNUM: u64 = 0b110;
}

/// `tc3` tags found in the type word of a heap cell.
pub mod heap_tc3 {
    /// Pair with a heap object in its car.
    pub const CONS: u64 = 0b000;
    pub const STRUCT: u64 = 0b001;
    /// Pair with an even fixnum in its car.
    pub const CONS_EVEN_INT: u64 = 0b010;
    pub const CLOSURE: u64 = 0b011;
    /// Pair with a non-integer immediate in its car.
    pub const CONS_IMMEDIATE: u64 = 0b100;
    pub const OBJECT: u64 = 0b101;
    /// Pair with an odd fixnum in its car.
    pub const CONS_ODD_INT: u64 = 0b110;
    pub const OBJECT2: u64 = 0b111;
}

/// `tc7` type codes of heap cells.
pub mod tc7 {
    pub const SYMBOL: u64 = 0x05;
    pub const VARIABLE: u64 = 0x07;
    pub const VECTOR: u64 = 0x0d;
    pub const WEAK_VECTOR: u64 = 0x0f;
    pub const STRING: u64 = 0x15;
    pub const NUMBER: u64 = 0x17;
    pub const HASH_TABLE: u64 = 0x1d;
    pub const POINTER: u64 = 0x1f;
    pub const FLUID: u64 = 0x25;
    pub const STRINGBUF: u64 = 0x27;
    pub const DYNAMIC_STATE: u64 = 0x2d;
    pub const FRAME: u64 = 0x2f;
    pub const KEYWORD: u64 = 0x35;
    pub const ATOMIC_BOX: u64 = 0x37;
    pub const SYNTAX: u64 = 0x3d;
    pub const VALUES: u64 = 0x3f;
    pub const PROGRAM: u64 = 0x45;
    pub const VM_CONT: u64 = 0x47;
    pub const BYTEVECTOR: u64 = 0x4d;
    pub const UNUSED_4F: u64 = 0x4f;
    pub const WEAK_SET: u64 = 0x55;
    pub const WEAK_TABLE: u64 = 0x57;
    pub const ARRAY: u64 = 0x5d;
    pub const BITVECTOR: u64 = 0x5f;
    pub const UNUSED_65: u64 = 0x65;
    pub const UNUSED_67: u64 = 0x67;
    pub const UNUSED_6D: u64 = 0x6d;
    pub const UNUSED_6F: u64 = 0x6f;
    pub const UNUSED_75: u64 = 0x75;
    pub const SMOB: u64 = 0x77;
    pub const PORT: u64 = 0x7d;
    pub const UNUSED_7F: u64 = 0x7f;
}

/// Exact bit patterns of the non-integer immediates.
pub mod imm {
    pub const FALSE: u64 = 0x004;
    pub const NIL: u64 = 0x104;
    pub const EOL: u64 = 0x304;
    pub const TRUE: u64 = 0x404;
    pub const UNSPECIFIED: u64 = 0x804;
    pub const UNDEFINED: u64 = 0x904;
    pub const EOF: u64 = 0xa04;

    /// Low byte of a character immediate, the code point lives in the upper bits.
    pub const CHAR: u64 = 0x0c;
}

/// Heap addresses are 8 byte aligned, this clears the tag bits.
pub const ADDRESS_MASK: u64 = !TC3_MASK;

/// Smallest integer that still fits in a fixnum.
pub const FIXNUM_MIN: i64 = -(1 << 61);

/// Largest integer that still fits in a fixnum.
pub const FIXNUM_MAX: i64 = (1 << 61) - 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediates_share_the_immediate_tag() {
        let singletons = [
            imm::FALSE,
            imm::NIL,
            imm::EOL,
            imm::TRUE,
            imm::UNSPECIFIED,
            imm::UNDEFINED,
            imm::EOF,
        ];
        for bits in singletons {
            assert_eq!(bits & TC3_MASK, tc3::IMMEDIATE);
        }
        assert_eq!(imm::CHAR & TC3_MASK, tc3::IMMEDIATE);
    }

    #[test]
    fn fixnum_tags_are_tc2() {
        assert_eq!(tc3::EVEN_FIXNUM & TC2_MASK, TC2_FIXNUM);
        assert_eq!(tc3::ODD_FIXNUM & TC2_MASK, TC2_FIXNUM);
    }
}
