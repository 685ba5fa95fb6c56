//! Maps a runtime [Value] to its [Category] by looking at tag bits only. Immediates are resolved
//! from the handle word, heap values from the first word of their cell. Nothing here allocates
//! or mutates.

use soft_runtime::tag::{heap_tc3, imm, tc3, tc7, TC3_MASK, TC7_MASK};
use soft_runtime::{Heap, Value};

use crate::category::{Category, Opaque};

/// Physical encoding of a handle, read from its `tc3` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Heap,
    Fixnum,
    /// Singleton constants and characters.
    Immediate,
    Invalid,
}

pub fn encoding_of(value: Value) -> Encoding {
    match value.tc3() {
        tc3::HEAP => Encoding::Heap,
        tc3::EVEN_FIXNUM | tc3::ODD_FIXNUM => Encoding::Fixnum,
        tc3::IMMEDIATE => Encoding::Immediate,
        _ => Encoding::Invalid,
    }
}

/// Resolves a non-integer immediate by its exact bit pattern.
pub fn classify_immediate(value: Value) -> Category {
    match value.bits() {
        imm::TRUE | imm::FALSE => Category::Boolean,
        imm::EOL => Category::EmptyList,
        imm::NIL => Category::Nil,
        imm::EOF => Category::Eof,
        imm::UNSPECIFIED => Category::Unspecified,
        imm::UNDEFINED => Category::Undefined,
        _ if value.as_char().is_some() => Category::Opaque(Opaque::Character),
        _ => Category::Invalid,
    }
}

/// Maps the type word of a heap cell. `inexact` is only consulted for the generic number kind,
/// where the tag alone can't tell exact integers from reals.
pub fn classify_word(word: u64, inexact: impl FnOnce() -> bool) -> Category {
    match word & TC3_MASK {
        heap_tc3::CONS
        | heap_tc3::CONS_EVEN_INT
        | heap_tc3::CONS_IMMEDIATE
        | heap_tc3::CONS_ODD_INT => return Category::Pair,
        heap_tc3::STRUCT => return Category::Opaque(Opaque::Struct),
        heap_tc3::CLOSURE => return Category::Opaque(Opaque::Closure),
        _ => {}
    }

    match word & TC7_MASK {
        tc7::SYMBOL => Category::Symbol,
        tc7::VARIABLE => Category::Opaque(Opaque::Variable),
        tc7::VECTOR => Category::Opaque(Opaque::Vector),
        tc7::WEAK_VECTOR => Category::Opaque(Opaque::WeakVector),
        tc7::STRING => Category::String,
        tc7::NUMBER if inexact() => Category::Real,
        tc7::NUMBER => Category::Integer,
        tc7::HASH_TABLE => Category::HashTable,
        tc7::POINTER => Category::Opaque(Opaque::Pointer),
        tc7::FLUID => Category::Opaque(Opaque::Fluid),
        tc7::STRINGBUF => Category::Opaque(Opaque::Stringbuf),
        tc7::DYNAMIC_STATE => Category::Opaque(Opaque::DynamicState),
        tc7::FRAME => Category::Opaque(Opaque::Frame),
        tc7::KEYWORD => Category::Keyword,
        tc7::ATOMIC_BOX => Category::Opaque(Opaque::AtomicBox),
        tc7::SYNTAX => Category::Opaque(Opaque::Syntax),
        tc7::VALUES => Category::Opaque(Opaque::Values),
        tc7::PROGRAM => Category::Opaque(Opaque::Program),
        tc7::VM_CONT => Category::Opaque(Opaque::VmCont),
        tc7::BYTEVECTOR => Category::Opaque(Opaque::Bytevector),
        tc7::WEAK_SET => Category::Opaque(Opaque::WeakSet),
        tc7::WEAK_TABLE => Category::Opaque(Opaque::WeakTable),
        tc7::ARRAY => Category::Opaque(Opaque::Array),
        tc7::BITVECTOR => Category::Opaque(Opaque::Bitvector),
        tc7::SMOB => Category::Opaque(Opaque::Smob),
        tc7::PORT => Category::Opaque(Opaque::Port),
        _ => Category::Invalid,
    }
}

/// Classifies a value. Total and deterministic, [Category::Invalid] is terminal: a handle
/// classified that way must not be dereferenced.
pub fn classify(heap: &Heap, value: Value) -> Category {
    match encoding_of(value) {
        Encoding::Fixnum => Category::Integer,
        Encoding::Invalid => Category::Invalid,
        Encoding::Immediate => classify_immediate(value),
        Encoding::Heap => match heap.type_word(value) {
            Some(word) => classify_word(word, || heap.is_inexact(value)),
            None => Category::Invalid,
        },
    }
}
