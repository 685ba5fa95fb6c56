//! The [Heap] is the arena every non-immediate [Value] points into. A heap handle is the cell
//! index shifted left by three bits, so its low `tc3` bits are always zero. Cells are never
//! freed, a heap lives as long as the values it hands out.

use fxhash::FxHashMap;

use crate::error::{Result, RuntimeError};
use crate::value::{Cell, ForeignPtr, HashTable, Number, OpaqueKind, Value};

/// How deep [Heap::hash] looks into pairs and vectors.
const HASH_DEPTH: usize = 4;

#[derive(Default, Debug)]
pub struct Heap {
    cells: Vec<Cell>,
    symbols: FxHashMap<Box<str>, Value>,
    keywords: FxHashMap<Value, Value>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    fn alloc(&mut self, cell: Cell) -> Value {
        let index = self.cells.len();
        self.cells.push(cell);
        Value::from_address(index)
    }

    /// Number of allocated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell a heap handle points to. Immediates and handles that point outside of the arena
    /// have no cell.
    pub fn cell(&self, value: Value) -> Option<&Cell> {
        self.cells.get(value.address()?)
    }

    fn cell_mut(&mut self, value: Value) -> Option<&mut Cell> {
        self.cells.get_mut(value.address()?)
    }

    /// Reads the first word of a heap cell.
    pub fn type_word(&self, value: Value) -> Option<u64> {
        self.cell(value).map(Cell::type_word)
    }

    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        self.alloc(Cell::Pair { car, cdr })
    }

    /// Builds a proper list.
    pub fn list(&mut self, items: Vec<Value>) -> Value {
        self.list_with_tail(items, Value::EOL)
    }

    /// Builds a list that ends in `tail`, improper when `tail` is not `()`.
    pub fn list_with_tail(&mut self, items: Vec<Value>, tail: Value) -> Value {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| self.cons(item, acc))
    }

    pub fn string(&mut self, string: &str) -> Value {
        self.alloc(Cell::Str(string.to_string()))
    }

    /// Returns the unique symbol with this name.
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(symbol) = self.symbols.get(name) {
            return *symbol;
        }
        let symbol = self.alloc(Cell::Symbol(name.into()));
        self.symbols.insert(name.into(), symbol);
        symbol
    }

    /// Returns the unique keyword with this name, the name doesn't include the `#:` prefix.
    pub fn keyword(&mut self, name: &str) -> Value {
        let symbol = self.intern(name);
        if let Some(keyword) = self.keywords.get(&symbol) {
            return *keyword;
        }
        let keyword = self.alloc(Cell::Keyword(symbol));
        self.keywords.insert(symbol, keyword);
        keyword
    }

    /// Exact integer, a fixnum when it fits.
    pub fn integer(&mut self, number: i128) -> Value {
        match i64::try_from(number).ok().and_then(Value::fixnum) {
            Some(fixnum) => fixnum,
            None => self.alloc(Cell::Number(Number::Integer(number))),
        }
    }

    pub fn real(&mut self, number: f64) -> Value {
        self.alloc(Cell::Number(Number::Real(number)))
    }

    pub fn vector(&mut self, items: Vec<Value>) -> Value {
        self.alloc(Cell::Vector(items))
    }

    pub fn bytevector(&mut self, bytes: Vec<u8>) -> Value {
        self.alloc(Cell::Bytevector(bytes))
    }

    pub fn make_hash_table(&mut self, capacity: usize) -> Value {
        self.alloc(Cell::HashTable(HashTable::with_capacity(capacity)))
    }

    pub fn make_struct(&mut self, vtable: Value, fields: Vec<Value>) -> Value {
        self.alloc(Cell::Struct { vtable, fields })
    }

    pub fn make_closure(&mut self, env: Vec<Value>, addr: ForeignPtr) -> Value {
        self.alloc(Cell::Closure { env, addr })
    }

    pub fn make_pointer(&mut self, ptr: ForeignPtr) -> Value {
        self.alloc(Cell::Pointer(ptr))
    }

    pub fn make_opaque(&mut self, kind: OpaqueKind) -> Value {
        self.alloc(Cell::Opaque(kind))
    }

    /// Both halves of a pair.
    pub fn pair(&self, value: Value) -> Option<(Value, Value)> {
        match self.cell(value)? {
            Cell::Pair { car, cdr } => Some((*car, *cdr)),
            _ => None,
        }
    }

    pub fn car(&self, value: Value) -> Option<Value> {
        self.pair(value).map(|(car, _)| car)
    }

    pub fn cdr(&self, value: Value) -> Option<Value> {
        self.pair(value).map(|(_, cdr)| cdr)
    }

    pub fn set_car(&mut self, pair: Value, value: Value) -> Result<()> {
        match self.cell_mut(pair) {
            Some(Cell::Pair { car, .. }) => {
                *car = value;
                Ok(())
            }
            _ => Err(RuntimeError::expected_pair(pair)),
        }
    }

    pub fn set_cdr(&mut self, pair: Value, value: Value) -> Result<()> {
        match self.cell_mut(pair) {
            Some(Cell::Pair { cdr, .. }) => {
                *cdr = value;
                Ok(())
            }
            _ => Err(RuntimeError::expected_pair(pair)),
        }
    }

    pub fn string_ref(&self, value: Value) -> Option<&str> {
        match self.cell(value)? {
            Cell::Str(string) => Some(string),
            _ => None,
        }
    }

    pub fn symbol_name(&self, value: Value) -> Option<&str> {
        match self.cell(value)? {
            Cell::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn keyword_name(&self, value: Value) -> Option<&str> {
        match self.cell(value)? {
            Cell::Keyword(symbol) => self.symbol_name(*symbol),
            _ => None,
        }
    }

    /// Heap allocated number, fixnums are read with [Value::as_fixnum].
    pub fn number(&self, value: Value) -> Option<Number> {
        match self.cell(value)? {
            Cell::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn is_inexact(&self, value: Value) -> bool {
        self.number(value).is_some_and(|number| number.is_inexact())
    }

    pub fn hash_table(&self, value: Value) -> Option<&HashTable> {
        match self.cell(value)? {
            Cell::HashTable(table) => Some(table),
            _ => None,
        }
    }

    fn hash_table_mut(&mut self, value: Value) -> Result<&mut HashTable> {
        match self.cell_mut(value) {
            Some(Cell::HashTable(table)) => Ok(table),
            _ => Err(RuntimeError::expected_table(value)),
        }
    }

    pub fn vector_ref(&self, value: Value) -> Option<&[Value]> {
        match self.cell(value)? {
            Cell::Vector(items) => Some(items),
            _ => None,
        }
    }

    pub fn bytevector_ref(&self, value: Value) -> Option<&[u8]> {
        match self.cell(value)? {
            Cell::Bytevector(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Hash consistent with [Heap::equal]. Symbols and keywords are interned, so they and every
    /// object without structural equality hash by identity.
    pub fn hash(&self, value: Value) -> u64 {
        self.hash_bounded(value, HASH_DEPTH)
    }

    fn hash_bounded(&self, value: Value, depth: usize) -> u64 {
        match self.cell(value) {
            Some(Cell::Str(string)) => fxhash::hash64(string.as_str()),
            Some(Cell::Number(Number::Integer(number))) => fxhash::hash64(number),
            Some(Cell::Number(Number::Real(number))) => fxhash::hash64(&number.to_bits()),
            Some(Cell::Bytevector(bytes)) => fxhash::hash64(bytes),
            Some(Cell::Pair { car, cdr }) if depth > 0 => {
                let car = self.hash_bounded(*car, depth - 1);
                let cdr = self.hash_bounded(*cdr, depth - 1);
                fxhash::hash64(&(car, cdr))
            }
            Some(Cell::Pair { .. }) => fxhash::hash64("pair"),
            Some(Cell::Vector(items)) if depth > 0 => {
                let hashes = items
                    .iter()
                    .take(HASH_DEPTH)
                    .map(|item| self.hash_bounded(*item, depth - 1))
                    .collect::<Vec<_>>();
                fxhash::hash64(&(items.len(), hashes))
            }
            Some(Cell::Vector(items)) => fxhash::hash64(&items.len()),
            Some(Cell::HashTable(table)) => fxhash::hash64(&table.len()),
            _ => fxhash::hash64(&value.bits()),
        }
    }

    /// Structural equality in the spirit of `equal?`. Lists are compared iteratively along their
    /// spine. Cyclic structures never terminate.
    pub fn equal(&self, mut left: Value, mut right: Value) -> bool {
        loop {
            if left == right {
                return true;
            }

            match (self.cell(left), self.cell(right)) {
                (Some(Cell::Pair { car: a, cdr: b }), Some(Cell::Pair { car: x, cdr: y })) => {
                    if !self.equal(*a, *x) {
                        return false;
                    }
                    left = *b;
                    right = *y;
                }
                (Some(Cell::Str(a)), Some(Cell::Str(b))) => return a == b,
                (Some(Cell::Number(a)), Some(Cell::Number(b))) => {
                    return match (a, b) {
                        (Number::Integer(a), Number::Integer(b)) => a == b,
                        (Number::Real(a), Number::Real(b)) => a.to_bits() == b.to_bits(),
                        _ => false,
                    };
                }
                (Some(Cell::Bytevector(a)), Some(Cell::Bytevector(b))) => return a == b,
                (Some(Cell::Vector(a)), Some(Cell::Vector(b))) => {
                    return a.len() == b.len() && a.iter().zip(b).all(|(a, b)| self.equal(*a, *b))
                }
                (Some(Cell::HashTable(a)), Some(Cell::HashTable(_))) => {
                    return self.table_subset(a, right) && a.len() == self.table_len(right)
                }
                _ => return false,
            }
        }
    }

    fn table_len(&self, table: Value) -> usize {
        self.hash_table(table).map_or(0, HashTable::len)
    }

    fn table_subset(&self, table: &HashTable, other: Value) -> bool {
        self.entries(table).into_iter().all(|(key, value)| {
            matches!(self.hash_ref(other, key), Ok(Some(found)) if self.equal(value, found))
        })
    }

    /// Every `(key, value)` of a table, in bucket order.
    pub fn entries(&self, table: &HashTable) -> Vec<(Value, Value)> {
        let mut entries = Vec::with_capacity(table.len());
        for bucket in table.buckets() {
            let mut chain = *bucket;
            while let Some((entry, next)) = self.pair(chain) {
                if let Some(pair) = self.pair(entry) {
                    entries.push(pair);
                }
                chain = next;
            }
        }
        entries
    }

    fn bucket_index(&self, key: Value, buckets: usize) -> usize {
        (self.hash(key) % buckets as u64) as usize
    }

    /// Finds the `(key . value)` entry of an association list.
    fn assoc(&self, mut alist: Value, key: Value) -> Option<Value> {
        while let Some((entry, next)) = self.pair(alist) {
            if let Some(found) = self.car(entry) {
                if self.equal(found, key) {
                    return Some(entry);
                }
            }
            alist = next;
        }
        None
    }

    pub fn hash_ref(&self, table: Value, key: Value) -> Result<Option<Value>> {
        let buckets = &self
            .hash_table(table)
            .ok_or_else(|| RuntimeError::expected_table(table))?
            .buckets;

        let head = buckets[self.bucket_index(key, buckets.len())];
        Ok(self.assoc(head, key).and_then(|entry| self.cdr(entry)))
    }

    /// Inserts or replaces an entry, growing the bucket array when chains get long.
    pub fn hash_set(&mut self, table: Value, key: Value, value: Value) -> Result<()> {
        let size = self
            .hash_table(table)
            .ok_or_else(|| RuntimeError::expected_table(table))?
            .buckets
            .len();

        let index = self.bucket_index(key, size);
        let head = self.hash_table_mut(table)?.buckets[index];

        if let Some(entry) = self.assoc(head, key) {
            return self.set_cdr(entry, value);
        }

        let entry = self.cons(key, value);
        let chain = self.cons(entry, head);

        let handle = self.hash_table_mut(table)?;
        handle.buckets[index] = chain;
        handle.items += 1;

        if handle.items > handle.buckets.len() * 2 {
            self.rehash(table)?;
        }

        Ok(())
    }

    fn rehash(&mut self, table: Value) -> Result<()> {
        let old = std::mem::take(&mut self.hash_table_mut(table)?.buckets);
        let mut buckets = vec![Value::EOL; old.len() * 2 + 1];

        for head in old {
            let mut chain = head;
            while let Some((entry, next)) = self.pair(chain) {
                let key = self.car(entry).ok_or(RuntimeError::expected_pair(entry))?;
                let index = self.bucket_index(key, buckets.len());
                buckets[index] = self.cons(entry, buckets[index]);
                chain = next;
            }
        }

        self.hash_table_mut(table)?.buckets = buckets;
        Ok(())
    }
}
