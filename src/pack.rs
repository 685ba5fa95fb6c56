//! Encoder: runtime value to MessagePack bytes. Output is only handed back once the whole value
//! was written, a failure anywhere discards it.

use std::cell::OnceCell;

use soft_runtime::{HashTable, Heap, Number, Value};
use tracing::{debug, error, trace, warn};

use crate::category::{Category, Opaque};
use crate::classify::classify;
use crate::error::PackError;
use crate::ext;
use crate::flags::{CodecFlags, Config, UnknownPolicy};
use crate::wire::Writer;

pub type Result<T, E = PackError> = std::result::Result<T, E>;

/// A value whose category is computed the first time it is asked for, and only once.
#[derive(Debug)]
pub struct Typed {
    value: Value,
    category: OnceCell<Category>,
}

impl Typed {
    pub fn new(value: Value) -> Typed {
        Typed {
            value,
            category: OnceCell::new(),
        }
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn category(&self, heap: &Heap) -> Category {
        *self.category.get_or_init(|| classify(heap, self.value))
    }
}

/// Serializes `value` into a fresh buffer.
pub fn pack(heap: &Heap, value: Value, config: &Config) -> Result<Vec<u8>> {
    let mut packer = Packer {
        heap,
        config,
        writer: Writer::new(),
    };

    let root = Typed::new(value);
    packer.encode(&root, 0)?;

    let bytes = packer.writer.into_inner();
    debug!(category = %root.category(heap), bytes = bytes.len(), "packed value");
    Ok(bytes)
}

struct Packer<'h> {
    heap: &'h Heap,
    config: &'h Config,
    writer: Writer,
}

impl Packer<'_> {
    fn flag(&self, flag: CodecFlags) -> bool {
        self.config.flags.contains(flag)
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.config.max_depth {
            return Err(PackError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(depth)
    }

    fn encode(&mut self, item: &Typed, depth: usize) -> Result<()> {
        let heap = self.heap;
        let category = item.category(heap);
        let value = item.value();
        trace!(%category, depth, "encoding");

        match category {
            Category::Boolean => self.writer.boolean(value.is_true()),
            Category::EmptyList => self.singleton(ext::EMPTY_LIST),
            Category::Nil => self.singleton(ext::NIL),
            Category::Eof => self.singleton(ext::EOF),
            Category::Unspecified => self.singleton(ext::UNSPECIFIED),
            Category::Undefined => self.singleton(ext::UNDEFINED),
            Category::Integer => self.integer(value),
            Category::Real => match heap.number(value) {
                Some(Number::Real(real)) => self.writer.f64(real),
                _ => Err(PackError::InvalidTag { bits: value.bits() }),
            },
            Category::String => {
                let string = self.text(heap.string_ref(value), value)?;
                self.writer.str(string)
            }
            Category::Symbol => {
                let name = self.text(heap.symbol_name(value), value)?;
                self.name(CodecFlags::DISABLE_SYMBOL_EXT, ext::SYMBOL, name)
            }
            Category::Keyword => {
                let name = self.text(heap.keyword_name(value), value)?;
                self.name(CodecFlags::DISABLE_KEYWORD_EXT, ext::KEYWORD, name)
            }
            Category::Pair => self.list(value, depth),
            Category::HashTable => match heap.hash_table(value) {
                Some(table) => self.table(table, depth),
                None => Err(PackError::InvalidTag { bits: value.bits() }),
            },
            Category::Opaque(Opaque::Vector) if self.flag(CodecFlags::ENCODE_VECTORS) => {
                let items = heap.vector_ref(value).unwrap_or_default();
                self.sequence(items.iter().copied().map(Typed::new).collect(), depth)
            }
            Category::Opaque(Opaque::Bytevector) if self.flag(CodecFlags::ENCODE_BYTEVECTORS) => {
                let bytes = heap.bytevector_ref(value).unwrap_or_default();
                self.writer.bin(bytes)
            }
            Category::Opaque(_) => self.unknown(category),
            Category::Invalid => {
                if self.config.flags.unknown_policy() == UnknownPolicy::Abort {
                    abort(category);
                }
                Err(PackError::InvalidTag { bits: value.bits() })
            }
        }
    }

    fn text<'s>(&self, text: Option<&'s str>, value: Value) -> Result<&'s str> {
        text.ok_or(PackError::InvalidTag { bits: value.bits() })
    }

    fn singleton(&mut self, code: i8) -> Result<()> {
        if self.flag(CodecFlags::DISTINCT_SINGLETONS) {
            self.writer.ext(code, &[])
        } else {
            self.writer.nil()
        }
    }

    fn name(&mut self, disable: CodecFlags, code: i8, name: &str) -> Result<()> {
        if self.flag(disable) {
            self.writer.str(name)
        } else {
            self.writer.ext(code, name.as_bytes())
        }
    }

    fn integer(&mut self, value: Value) -> Result<()> {
        if let Some(fixnum) = value.as_fixnum() {
            return self.writer.integer(fixnum.into());
        }
        match self.heap.number(value) {
            Some(Number::Integer(integer)) => self.writer.integer(integer),
            _ => Err(PackError::InvalidTag { bits: value.bits() }),
        }
    }

    /// Collects the elements of a proper list. The hare moves one pair per element and the
    /// tortoise every second element, so they meet on a cyclic spine.
    fn spine(&self, head: Value) -> Result<Vec<Typed>> {
        let mut items = Vec::new();
        let mut slow = head;
        let mut fast = head;

        while let Some((car, cdr)) = self.heap.pair(fast) {
            items.push(Typed::new(car));
            fast = cdr;

            if items.len() % 2 == 0 {
                if let Some(next) = self.heap.cdr(slow) {
                    slow = next;
                }
                if slow == fast {
                    return Err(PackError::CyclicList);
                }
            }
        }

        if !fast.is_eol() {
            return Err(PackError::ImproperList);
        }

        Ok(items)
    }

    fn list(&mut self, head: Value, depth: usize) -> Result<()> {
        let items = self.spine(head)?;
        self.sequence(items, depth)
    }

    fn sequence(&mut self, items: Vec<Typed>, depth: usize) -> Result<()> {
        let depth = self.enter(depth)?;
        self.writer.array_len(items.len())?;
        for item in &items {
            self.encode(item, depth)?;
        }
        Ok(())
    }

    /// Flattens the bucket alists of a table in bucket order. The count is checked against the
    /// live entry count before anything is written.
    fn entries(&self, table: &HashTable) -> Result<Vec<(Typed, Typed)>> {
        let declared = table.len();
        let mut entries = Vec::with_capacity(declared);

        for bucket in table.buckets() {
            let mut chain = *bucket;
            while let Some((entry, next)) = self.heap.pair(chain) {
                if let Some((key, value)) = self.heap.pair(entry) {
                    entries.push((Typed::new(key), Typed::new(value)));
                }
                if entries.len() > declared {
                    break;
                }
                chain = next;
            }
        }

        if entries.len() != declared {
            return Err(PackError::Consistency {
                declared,
                emitted: entries.len(),
            });
        }

        Ok(entries)
    }

    fn table(&mut self, table: &HashTable, depth: usize) -> Result<()> {
        let depth = self.enter(depth)?;
        let entries = self.entries(table)?;

        self.writer.map_len(entries.len())?;
        for (key, value) in &entries {
            self.encode(key, depth)?;
            self.encode(value, depth)?;
        }
        Ok(())
    }

    fn unknown(&mut self, category: Category) -> Result<()> {
        match self.config.flags.unknown_policy() {
            UnknownPolicy::Reject => Err(PackError::Unsupported { category }),
            UnknownPolicy::Null => {
                warn!(%category, "packing unsupported value as nil");
                self.writer.nil()
            }
            UnknownPolicy::Abort => abort(category),
        }
    }
}

fn abort(category: Category) -> ! {
    error!(%category, "cannot pack value, aborting");
    std::process::abort()
}
