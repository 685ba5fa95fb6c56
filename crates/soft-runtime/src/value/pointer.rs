use crate::tag::{heap_tc3, tc7, ADDRESS_MASK};

use super::Value;

/// A raw foreign address, never dereferenced by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForeignPtr(pub *mut libc::c_void);

impl ForeignPtr {
    pub fn null() -> ForeignPtr {
        ForeignPtr(std::ptr::null_mut())
    }

    pub fn address(&self) -> usize {
        self.0 as usize
    }
}

/// Numbers that don't fit in a fixnum or that are inexact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// Exact integer outside of the fixnum range.
    Integer(i128),
    /// Inexact real.
    Real(f64),
}

impl Number {
    pub fn is_inexact(&self) -> bool {
        matches!(self, Number::Real(_))
    }
}

/// An `equal?` hash table. Each bucket is an association list of `(key . value)` pairs living in
/// the same heap, so the table iterates in bucket order and not in insertion order.
#[derive(Clone, Debug)]
pub struct HashTable {
    pub(crate) items: usize,
    pub(crate) buckets: Vec<Value>,
}

impl HashTable {
    pub(crate) fn with_capacity(capacity: usize) -> HashTable {
        HashTable {
            items: 0,
            buckets: vec![Value::EOL; capacity.max(HashTable::MIN_BUCKETS)],
        }
    }

    pub(crate) const MIN_BUCKETS: usize = 7;

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// The backing bucket array, each element is `()` or an association list.
    pub fn buckets(&self) -> &[Value] {
        &self.buckets
    }
}

/// Heap kinds the runtime can allocate but that carry no data the codec looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    Variable,
    WeakVector,
    Fluid,
    Stringbuf,
    DynamicState,
    Frame,
    AtomicBox,
    Syntax,
    Values,
    Program,
    VmCont,
    WeakSet,
    WeakTable,
    Array,
    Bitvector,
    Smob,
    Port,
}

impl OpaqueKind {
    pub fn tc7(self) -> u64 {
        match self {
            OpaqueKind::Variable => tc7::VARIABLE,
            OpaqueKind::WeakVector => tc7::WEAK_VECTOR,
            OpaqueKind::Fluid => tc7::FLUID,
            OpaqueKind::Stringbuf => tc7::STRINGBUF,
            OpaqueKind::DynamicState => tc7::DYNAMIC_STATE,
            OpaqueKind::Frame => tc7::FRAME,
            OpaqueKind::AtomicBox => tc7::ATOMIC_BOX,
            OpaqueKind::Syntax => tc7::SYNTAX,
            OpaqueKind::Values => tc7::VALUES,
            OpaqueKind::Program => tc7::PROGRAM,
            OpaqueKind::VmCont => tc7::VM_CONT,
            OpaqueKind::WeakSet => tc7::WEAK_SET,
            OpaqueKind::WeakTable => tc7::WEAK_TABLE,
            OpaqueKind::Array => tc7::ARRAY,
            OpaqueKind::Bitvector => tc7::BITVECTOR,
            OpaqueKind::Smob => tc7::SMOB,
            OpaqueKind::Port => tc7::PORT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpaqueKind::Variable => "variable",
            OpaqueKind::WeakVector => "weak-vector",
            OpaqueKind::Fluid => "fluid",
            OpaqueKind::Stringbuf => "stringbuf",
            OpaqueKind::DynamicState => "dynamic-state",
            OpaqueKind::Frame => "frame",
            OpaqueKind::AtomicBox => "atomic-box",
            OpaqueKind::Syntax => "syntax",
            OpaqueKind::Values => "values",
            OpaqueKind::Program => "program",
            OpaqueKind::VmCont => "vm-continuation",
            OpaqueKind::WeakSet => "weak-set",
            OpaqueKind::WeakTable => "weak-table",
            OpaqueKind::Array => "array",
            OpaqueKind::Bitvector => "bitvector",
            OpaqueKind::Smob => "smob",
            OpaqueKind::Port => "port",
        }
    }
}

/// A heap allocated object.
#[derive(Clone, Debug)]
pub enum Cell {
    /// A cons cell, used to create lists and association lists.
    Pair { car: Value, cdr: Value },
    /// Instance of a record type.
    Struct { vtable: Value, fields: Vec<Value> },
    /// A pair of an environment and a function pointer.
    Closure { env: Vec<Value>, addr: ForeignPtr },
    /// Interned name, only [crate::Heap::intern] creates these.
    Symbol(Box<str>),
    /// Keyword atom, points to the symbol with the same name.
    Keyword(Value),
    Str(String),
    Number(Number),
    HashTable(HashTable),
    Vector(Vec<Value>),
    Bytevector(Vec<u8>),
    Pointer(ForeignPtr),
    Opaque(OpaqueKind),
}

const NUMBER_INTEGER: u64 = 1 << 8;
const NUMBER_REAL: u64 = 2 << 8;

impl Cell {
    /// The first word of the cell, the only thing a classifier is allowed to look at. For pairs
    /// it is the car itself, structs and closures have their own `tc3`, everything else has a
    /// `tc7` in the low bits.
    pub fn type_word(&self) -> u64 {
        match self {
            Cell::Pair { car, .. } => car.bits(),
            Cell::Struct { vtable, .. } => (vtable.bits() & ADDRESS_MASK) | heap_tc3::STRUCT,
            Cell::Closure { addr, .. } => {
                ((addr.address() as u64) & ADDRESS_MASK) | heap_tc3::CLOSURE
            }
            Cell::Symbol(_) => tc7::SYMBOL,
            Cell::Keyword(_) => tc7::KEYWORD,
            Cell::Str(_) => tc7::STRING,
            Cell::Number(Number::Integer(_)) => tc7::NUMBER | NUMBER_INTEGER,
            Cell::Number(Number::Real(_)) => tc7::NUMBER | NUMBER_REAL,
            Cell::HashTable(_) => tc7::HASH_TABLE,
            Cell::Vector(items) => tc7::VECTOR | ((items.len() as u64) << 8),
            Cell::Bytevector(bytes) => tc7::BYTEVECTOR | ((bytes.len() as u64) << 8),
            Cell::Pointer(_) => tc7::POINTER,
            Cell::Opaque(kind) => kind.tc7(),
        }
    }
}
