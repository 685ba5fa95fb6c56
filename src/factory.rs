//! The capability the decoder needs from a runtime: building values. [crate::unpack] only goes
//! through this trait, so any runtime, or a plain tree in tests, can be the target.

use soft_runtime::{Heap, Value};

/// Singleton constants a wire payload can stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    EmptyList,
    Nil,
    Eof,
    Unspecified,
    Undefined,
}

pub trait ValueFactory {
    type Value: Clone;

    fn constant(&mut self, constant: Constant) -> Self::Value;

    fn boolean(&mut self, value: bool) -> Self::Value;

    fn unsigned(&mut self, value: u64) -> Self::Value;

    fn signed(&mut self, value: i64) -> Self::Value;

    fn real(&mut self, value: f64) -> Self::Value;

    fn string(&mut self, value: &str) -> Self::Value;

    fn bytevector(&mut self, bytes: &[u8]) -> Self::Value;

    fn symbol(&mut self, name: &str) -> Self::Value;

    fn keyword(&mut self, name: &str) -> Self::Value;

    fn cons(&mut self, car: Self::Value, cdr: Self::Value) -> Self::Value;

    /// Proper list of `items`, built back to front.
    fn list(&mut self, items: Vec<Self::Value>) -> Self::Value {
        let tail = self.constant(Constant::EmptyList);
        items.into_iter().rev().fold(tail, |tail, item| self.cons(item, tail))
    }

    fn vector(&mut self, items: Vec<Self::Value>) -> Self::Value;

    /// Fresh empty table expected to hold `capacity` entries.
    fn table(&mut self, capacity: usize) -> Self::Value;

    fn table_insert(&mut self, table: &Self::Value, key: Self::Value, value: Self::Value);
}

impl ValueFactory for Heap {
    type Value = Value;

    fn constant(&mut self, constant: Constant) -> Value {
        match constant {
            Constant::EmptyList => Value::EOL,
            Constant::Nil => Value::NIL,
            Constant::Eof => Value::EOF,
            Constant::Unspecified => Value::UNSPECIFIED,
            Constant::Undefined => Value::UNDEFINED,
        }
    }

    fn boolean(&mut self, value: bool) -> Value {
        Value::boolean(value)
    }

    fn unsigned(&mut self, value: u64) -> Value {
        self.integer(value.into())
    }

    fn signed(&mut self, value: i64) -> Value {
        self.integer(value.into())
    }

    fn real(&mut self, value: f64) -> Value {
        Heap::real(self, value)
    }

    fn string(&mut self, value: &str) -> Value {
        Heap::string(self, value)
    }

    fn bytevector(&mut self, bytes: &[u8]) -> Value {
        Heap::bytevector(self, bytes.to_vec())
    }

    fn symbol(&mut self, name: &str) -> Value {
        self.intern(name)
    }

    fn keyword(&mut self, name: &str) -> Value {
        Heap::keyword(self, name)
    }

    fn cons(&mut self, car: Value, cdr: Value) -> Value {
        Heap::cons(self, car, cdr)
    }

    fn list(&mut self, items: Vec<Value>) -> Value {
        Heap::list(self, items)
    }

    fn vector(&mut self, items: Vec<Value>) -> Value {
        Heap::vector(self, items)
    }

    fn table(&mut self, capacity: usize) -> Value {
        self.make_hash_table(capacity)
    }

    fn table_insert(&mut self, table: &Value, key: Value, value: Value) {
        // Tables only ever come from `table` above.
        let inserted = self.hash_set(*table, key, value);
        debug_assert!(inserted.is_ok(), "{inserted:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_builds_proper_lists() {
        let mut heap = Heap::new();
        let items = vec![
            ValueFactory::unsigned(&mut heap, 1),
            ValueFactory::boolean(&mut heap, false),
        ];
        let list = ValueFactory::list(&mut heap, items);

        assert_eq!(heap.display(list).to_string(), "(1 #f)");
    }

    #[test]
    fn heap_tables_use_equal_keys() {
        let mut heap = Heap::new();
        let table = heap.table(2);
        let key = ValueFactory::string(&mut heap, "k");
        let same = ValueFactory::string(&mut heap, "k");
        let one = heap.unsigned(1);
        heap.table_insert(&table, key, one);

        assert_eq!(heap.hash_ref(table, same).unwrap(), Some(one));
        assert_eq!(heap.hash_table(table).unwrap().len(), 1);
    }

    #[test]
    fn integers_outside_fixnum_range_go_to_the_heap() {
        let mut heap = Heap::new();
        let big = heap.unsigned(u64::MAX);
        assert!(big.is_heap());
        assert_eq!(heap.display(big).to_string(), u64::MAX.to_string());
    }
}
