use clap::{Args, Parser, Subcommand, ValueEnum};
use soft_mpack::{CodecFlags, Config, UnknownPolicy, DEFAULT_MAX_DEPTH};

/// Packs Lisp data into MessagePack and back.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Options {
    /// Logs every pack and unpack call.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reads a datum and prints its MessagePack encoding as hex.
    Pack(PackArgs),

    /// Decodes hex encoded MessagePack and prints the value.
    Unpack(UnpackArgs),

    /// Reads a datum and prints its category and tag bits.
    Classify {
        datum: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum Unknown {
    #[default]
    Reject,
    Null,
    Abort,
}

impl From<Unknown> for UnknownPolicy {
    fn from(unknown: Unknown) -> UnknownPolicy {
        match unknown {
            Unknown::Reject => UnknownPolicy::Reject,
            Unknown::Null => UnknownPolicy::Null,
            Unknown::Abort => UnknownPolicy::Abort,
        }
    }
}

#[derive(Args, Debug)]
pub struct PackArgs {
    pub datum: String,

    /// Sends symbols as plain strings.
    #[arg(long)]
    pub no_symbol_ext: bool,

    /// Sends keywords as plain strings.
    #[arg(long)]
    pub no_keyword_ext: bool,

    /// Gives `()`, `#nil`, `#<eof>`, `#<unspecified>` and `#<undefined>` their own extension
    /// instead of nil.
    #[arg(long)]
    pub distinct_singletons: bool,

    /// Packs vectors as arrays.
    #[arg(long)]
    pub vectors: bool,

    /// Packs bytevectors as binaries.
    #[arg(long)]
    pub bytevectors: bool,

    /// What to do with values that have no wire form.
    #[arg(long, value_enum, default_value_t)]
    pub unknown: Unknown,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl PackArgs {
    pub fn config(&self) -> Config {
        let mut flags = CodecFlags::NONE;
        if self.no_symbol_ext {
            flags |= CodecFlags::DISABLE_SYMBOL_EXT;
        }
        if self.no_keyword_ext {
            flags |= CodecFlags::DISABLE_KEYWORD_EXT;
        }
        if self.distinct_singletons {
            flags |= CodecFlags::DISTINCT_SINGLETONS;
        }
        if self.vectors {
            flags |= CodecFlags::ENCODE_VECTORS;
        }
        if self.bytevectors {
            flags |= CodecFlags::ENCODE_BYTEVECTORS;
        }

        Config::new(flags)
            .with_unknown_policy(self.unknown.into())
            .with_max_depth(self.max_depth)
    }
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Hex encoded bytes, whitespace is ignored.
    pub hex: String,

    /// Fails on bytes after the payload.
    #[arg(long)]
    pub strict: bool,

    /// Decodes arrays to vectors instead of lists.
    #[arg(long)]
    pub vectors: bool,

    /// Decodes the symbol extension to strings.
    #[arg(long)]
    pub no_symbol_ext: bool,

    /// Decodes the keyword extension to strings.
    #[arg(long)]
    pub no_keyword_ext: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl UnpackArgs {
    pub fn config(&self) -> Config {
        let mut flags = CodecFlags::NONE;
        if self.strict {
            flags |= CodecFlags::STRICT_TRAILING;
        }
        if self.vectors {
            flags |= CodecFlags::ARRAYS_AS_VECTORS;
        }
        if self.no_symbol_ext {
            flags |= CodecFlags::DISABLE_SYMBOL_EXT;
        }
        if self.no_keyword_ext {
            flags |= CodecFlags::DISABLE_KEYWORD_EXT;
        }

        Config::new(flags).with_max_depth(self.max_depth)
    }
}
