//! Per call configuration. Flags are plain values passed into every [crate::pack] and
//! [crate::unpack] call, there is no global codec state.

use std::ops::{BitOr, BitOrAssign};

/// Immutable bit-set of codec options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CodecFlags(u64);

impl CodecFlags {
    pub const NONE: CodecFlags = CodecFlags(0);

    /// Symbols travel as plain strings, and the symbol extension decodes to a string.
    pub const DISABLE_SYMBOL_EXT: CodecFlags = CodecFlags(1 << 0);
    /// Keywords travel as plain strings, and the keyword extension decodes to a string.
    pub const DISABLE_KEYWORD_EXT: CodecFlags = CodecFlags(1 << 1);
    /// Every singleton gets its own extension code instead of collapsing into the wire nil.
    pub const DISTINCT_SINGLETONS: CodecFlags = CodecFlags(1 << 2);
    /// Vectors encode as wire arrays.
    pub const ENCODE_VECTORS: CodecFlags = CodecFlags(1 << 3);
    /// Bytevectors encode as wire binaries.
    pub const ENCODE_BYTEVECTORS: CodecFlags = CodecFlags(1 << 4);
    /// Wire arrays decode to vectors instead of proper lists.
    pub const ARRAYS_AS_VECTORS: CodecFlags = CodecFlags(1 << 5);
    /// Bytes after the top level payload are an error.
    pub const STRICT_TRAILING: CodecFlags = CodecFlags(1 << 6);

    /// Values without a wire mapping follow [CodecFlags::UNKNOWN_IS_NIL] or
    /// [CodecFlags::UNKNOWN_IS_PANIC] instead of failing.
    pub const OVERRIDE_UNKNOWNS: CodecFlags = CodecFlags(1 << 8);
    pub const UNKNOWN_IS_NIL: CodecFlags = CodecFlags(1 << 9);
    pub const UNKNOWN_IS_PANIC: CodecFlags = CodecFlags(1 << 10);

    pub const fn contains(self, other: CodecFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: CodecFlags) -> CodecFlags {
        CodecFlags(self.0 | other.0)
    }

    /// What to do with a value that has no wire mapping. Overriding without choosing nil or
    /// panic keeps rejecting.
    pub fn unknown_policy(self) -> UnknownPolicy {
        if !self.contains(CodecFlags::OVERRIDE_UNKNOWNS) {
            UnknownPolicy::Reject
        } else if self.contains(CodecFlags::UNKNOWN_IS_NIL) {
            UnknownPolicy::Null
        } else if self.contains(CodecFlags::UNKNOWN_IS_PANIC) {
            UnknownPolicy::Abort
        } else {
            UnknownPolicy::Reject
        }
    }
}

impl BitOr for CodecFlags {
    type Output = CodecFlags;

    fn bitor(self, rhs: CodecFlags) -> CodecFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for CodecFlags {
    fn bitor_assign(&mut self, rhs: CodecFlags) {
        *self = self.union(rhs);
    }
}

impl From<UnknownPolicy> for CodecFlags {
    fn from(policy: UnknownPolicy) -> CodecFlags {
        match policy {
            UnknownPolicy::Reject => CodecFlags::NONE,
            UnknownPolicy::Null => CodecFlags::OVERRIDE_UNKNOWNS | CodecFlags::UNKNOWN_IS_NIL,
            UnknownPolicy::Abort => CodecFlags::OVERRIDE_UNKNOWNS | CodecFlags::UNKNOWN_IS_PANIC,
        }
    }
}

/// Resolution for values that have no wire mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnknownPolicy {
    /// Fail with [crate::PackError::Unsupported].
    #[default]
    Reject,
    /// Write a wire nil.
    Null,
    /// Abort the process.
    Abort,
}

/// Default nesting limit for both directions.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Everything a pack or unpack call is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub flags: CodecFlags,
    /// Deepest container nesting accepted before failing.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            flags: CodecFlags::NONE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn new(flags: CodecFlags) -> Config {
        Config {
            flags,
            ..Config::default()
        }
    }

    #[must_use]
    pub fn with_flags(self, flags: CodecFlags) -> Config {
        Config {
            flags: self.flags | flags,
            ..self
        }
    }

    #[must_use]
    pub fn with_max_depth(self, max_depth: usize) -> Config {
        Config { max_depth, ..self }
    }

    #[must_use]
    pub fn with_unknown_policy(self, policy: UnknownPolicy) -> Config {
        self.with_flags(policy.into())
    }
}
