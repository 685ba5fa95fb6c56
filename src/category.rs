//! The two closed type systems the codec maps between: the semantic [Category] of a runtime
//! value and the [PayloadKind] of a wire payload.

use std::fmt::Display;

/// Semantic category of a runtime value. Every well formed handle has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Boolean,
    /// The empty list `()`.
    EmptyList,
    /// The Emacs Lisp `#nil`.
    Nil,
    Eof,
    Undefined,
    Unspecified,
    /// Exact integer, immediate or heap allocated.
    Integer,
    /// Inexact real.
    Real,
    Pair,
    String,
    Symbol,
    Keyword,
    HashTable,
    /// Heap kinds without a default wire mapping.
    Opaque(Opaque),
    /// Tag bits that match nothing, the handle must not be dereferenced.
    Invalid,
}

/// The residual bucket of [Category::Opaque].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opaque {
    Character,
    Struct,
    Closure,
    Variable,
    Vector,
    WeakVector,
    Pointer,
    Fluid,
    Stringbuf,
    DynamicState,
    Frame,
    AtomicBox,
    Syntax,
    Values,
    Program,
    VmCont,
    Bytevector,
    WeakSet,
    WeakTable,
    Array,
    Bitvector,
    Smob,
    Port,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Boolean => "boolean",
            Category::EmptyList => "eol",
            Category::Nil => "nil",
            Category::Eof => "eof",
            Category::Undefined => "undefined",
            Category::Unspecified => "unspecified",
            Category::Integer => "fixed_num",
            Category::Real => "real",
            Category::Pair => "pair",
            Category::String => "string",
            Category::Symbol => "symbol",
            Category::Keyword => "keyword",
            Category::HashTable => "hashtable",
            Category::Opaque(opaque) => opaque.name(),
            Category::Invalid => "invalid",
        }
    }
}

impl Opaque {
    pub fn name(self) -> &'static str {
        match self {
            Opaque::Character => "character",
            Opaque::Struct => "struct",
            Opaque::Closure => "closure",
            Opaque::Variable => "variable",
            Opaque::Vector => "vector",
            Opaque::WeakVector => "wvect",
            Opaque::Pointer => "pointer",
            Opaque::Fluid => "fluid",
            Opaque::Stringbuf => "stringbuf",
            Opaque::DynamicState => "dynamic_state",
            Opaque::Frame => "frame",
            Opaque::AtomicBox => "atomic_box",
            Opaque::Syntax => "syntax",
            Opaque::Values => "values",
            Opaque::Program => "program",
            Opaque::VmCont => "vm_cont",
            Opaque::Bytevector => "bytevector",
            Opaque::WeakSet => "weak_set",
            Opaque::WeakTable => "weak_table",
            Opaque::Array => "array",
            Opaque::Bitvector => "bitvector",
            Opaque::Smob => "smob",
            Opaque::Port => "port",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Kind of a parsed wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Nil,
    Boolean,
    PositiveInteger,
    NegativeInteger,
    Float32,
    Float64,
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadKind::Nil => "NIL",
            PayloadKind::Boolean => "BOOLEAN",
            PayloadKind::PositiveInteger => "POSITIVE_INTEGER",
            PayloadKind::NegativeInteger => "NEGATIVE_INTEGER",
            PayloadKind::Float32 => "FLOAT32",
            PayloadKind::Float64 => "FLOAT64",
            PayloadKind::Str => "STR",
            PayloadKind::Bin => "BIN",
            PayloadKind::Array => "ARRAY",
            PayloadKind::Map => "MAP",
            PayloadKind::Ext => "EXT",
        };
        write!(f, "{name}")
    }
}
