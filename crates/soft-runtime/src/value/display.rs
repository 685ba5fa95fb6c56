use std::fmt::{Display, Formatter, Result};

use super::*;
use crate::Heap;

/// Nesting depth after which the printer gives up and writes `...`.
const MAX_DEPTH: usize = 64;

/// Elements of a single list or vector printed before eliding the rest, this also stops cyclic
/// lists from printing forever.
const MAX_ITEMS: usize = 4096;

/// Prints a value in `write` syntax. Built by [Heap::display].
pub struct Printer<'h> {
    heap: &'h Heap,
    value: Value,
}

impl Heap {
    pub fn display(&self, value: Value) -> Printer<'_> {
        Printer { heap: self, value }
    }
}

impl Printer<'_> {
    fn write(&self, f: &mut Formatter<'_>, value: Value, depth: usize) -> Result {
        if depth > MAX_DEPTH {
            return write!(f, "...");
        }

        let Some(cell) = self.heap.cell(value) else {
            return self.write_immediate(f, value);
        };

        match cell {
            Cell::Pair { car, cdr } => self.write_list(f, *car, *cdr, depth),
            Cell::Struct { .. } => write!(f, "#<struct>"),
            Cell::Closure { .. } => write!(f, "#<closure>"),
            Cell::Symbol(name) => write!(f, "{name}"),
            Cell::Keyword(symbol) => {
                write!(f, "#:")?;
                self.write(f, *symbol, depth + 1)
            }
            Cell::Str(string) => write!(f, "{string:?}"),
            Cell::Number(Number::Integer(number)) => write!(f, "{number}"),
            Cell::Number(Number::Real(number)) => write_real(f, *number),
            Cell::HashTable(table) => {
                write!(f, "#<hash-table {}/{}>", table.len(), table.buckets().len())
            }
            Cell::Vector(items) => {
                write!(f, "#(")?;
                for (i, item) in items.iter().take(MAX_ITEMS).enumerate() {
                    if i != 0 {
                        write!(f, " ")?;
                    }
                    self.write(f, *item, depth + 1)?;
                }
                if items.len() > MAX_ITEMS {
                    write!(f, " ...")?;
                }
                write!(f, ")")
            }
            Cell::Bytevector(bytes) => {
                write!(f, "#vu8(")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i != 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte}")?;
                }
                write!(f, ")")
            }
            Cell::Pointer(ptr) => write!(f, "#<pointer {:#x}>", ptr.address()),
            Cell::Opaque(kind) => write!(f, "#<{}>", kind.name()),
        }
    }

    fn write_list(&self, f: &mut Formatter<'_>, head: Value, tail: Value, depth: usize) -> Result {
        write!(f, "(")?;
        self.write(f, head, depth + 1)?;

        let mut current = tail;
        let mut printed = 1;

        while let Some((car, cdr)) = self.heap.pair(current) {
            if printed == MAX_ITEMS {
                return write!(f, " ...)");
            }
            write!(f, " ")?;
            self.write(f, car, depth + 1)?;
            current = cdr;
            printed += 1;
        }

        if !current.is_eol() {
            write!(f, " . ")?;
            self.write(f, current, depth + 1)?;
        }

        write!(f, ")")
    }

    fn write_immediate(&self, f: &mut Formatter<'_>, value: Value) -> Result {
        if let Some(number) = value.as_fixnum() {
            return write!(f, "{number}");
        }

        if let Some(chr) = value.as_char() {
            return write!(f, "#\\{chr}");
        }

        match value.bits() {
            imm::TRUE => write!(f, "#t"),
            imm::FALSE => write!(f, "#f"),
            imm::NIL => write!(f, "#nil"),
            imm::EOL => write!(f, "()"),
            imm::EOF => write!(f, "#<eof>"),
            imm::UNSPECIFIED => write!(f, "#<unspecified>"),
            imm::UNDEFINED => write!(f, "#<undefined>"),
            bits => write!(f, "#<invalid {bits:#x}>"),
        }
    }
}

fn write_real(f: &mut Formatter<'_>, number: f64) -> Result {
    if number.is_nan() {
        write!(f, "+nan.0")
    } else if number.is_infinite() {
        write!(f, "{}inf.0", if number > 0.0 { "+" } else { "-" })
    } else if number.fract() == 0.0 && number.abs() < 1e16 {
        write!(f, "{number:.1}")
    } else {
        write!(f, "{number}")
    }
}

impl Display for Printer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.write(f, self.value, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let heap = Heap::new();
        assert_eq!(heap.display(Value::TRUE).to_string(), "#t");
        assert_eq!(heap.display(Value::EOL).to_string(), "()");
        assert_eq!(heap.display(Value::EOF).to_string(), "#<eof>");
        assert_eq!(heap.display(Value::character('a')).to_string(), "#\\a");
    }

    #[test]
    fn test_dotted() {
        let mut heap = Heap::new();
        let pair = heap.cons(Value::FALSE, Value::fixnum(345).unwrap());
        assert_eq!(heap.display(pair).to_string(), "(#f . 345)");
    }

    #[test]
    fn test_nested() {
        let mut heap = Heap::new();
        let name = heap.string("eu amo a gabii");
        let keyword = heap.keyword("test");
        let real = heap.real(2.0);
        let inner = heap.list(vec![keyword, real]);
        let vector = heap.vector(vec![inner, name]);
        assert_eq!(
            heap.display(vector).to_string(),
            "#((#:test 2.0) \"eu amo a gabii\")"
        );
    }

    #[test]
    fn test_cyclic_list_terminates() {
        let mut heap = Heap::new();
        let pair = heap.cons(Value::TRUE, Value::EOL);
        heap.set_cdr(pair, pair).unwrap();
        assert!(heap.display(pair).to_string().ends_with("...)"));
    }
}
