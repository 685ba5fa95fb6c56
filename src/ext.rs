//! Extension sub-codes reserved for runtime atoms the wire format has no native kind for.
//! Codes outside of this registry are foreign data and are kept as `(code . bytevector)`.

/// First reserved code. The range starts away from zero so it doesn't collide with other
/// producers of extension types.
pub const EXT_BASE: i8 = 100;

pub const EMPTY_LIST: i8 = EXT_BASE;
pub const SYMBOL: i8 = EXT_BASE + 1;
pub const KEYWORD: i8 = EXT_BASE + 2;

// Only emitted with `CodecFlags::DISTINCT_SINGLETONS`.
pub const EOF: i8 = EXT_BASE + 3;
pub const UNSPECIFIED: i8 = EXT_BASE + 4;
pub const UNDEFINED: i8 = EXT_BASE + 5;
pub const NIL: i8 = EXT_BASE + 6;

/// Meaning of an extension code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    EmptyList,
    Symbol,
    Keyword,
    Eof,
    Unspecified,
    Undefined,
    Nil,
    /// Not ours, carried through untouched.
    Foreign(i8),
}

impl Extension {
    pub fn from_code(code: i8) -> Extension {
        match code {
            EMPTY_LIST => Extension::EmptyList,
            SYMBOL => Extension::Symbol,
            KEYWORD => Extension::Keyword,
            EOF => Extension::Eof,
            UNSPECIFIED => Extension::Unspecified,
            UNDEFINED => Extension::Undefined,
            NIL => Extension::Nil,
            code => Extension::Foreign(code),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Extension::EmptyList => EMPTY_LIST,
            Extension::Symbol => SYMBOL,
            Extension::Keyword => KEYWORD,
            Extension::Eof => EOF,
            Extension::Unspecified => UNSPECIFIED,
            Extension::Undefined => UNDEFINED,
            Extension::Nil => NIL,
            Extension::Foreign(code) => code,
        }
    }
}
