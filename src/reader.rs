//! Datum reader, turns Scheme `write` syntax into runtime values. The main function is [read].

use std::{fmt::Display, iter::Peekable, str::Chars};

use soft_runtime::{Heap, Value};
use thiserror::Error;

/// Line and column of the last character the reader consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("unmatched parenthesis at {0}")]
    UnmatchedParenthesis(Location),

    #[error("unclosed parenthesis at {0}")]
    UnclosedParenthesis(Location),

    #[error("unclosed string at {0}")]
    UnclosedString(Location),

    #[error("unmatched quote at {0}")]
    UnmatchedQuote(Location),

    #[error("invalid escape '\\{1}' at {0}")]
    InvalidEscape(Location, char),

    #[error("misplaced dot at {0}")]
    MisplacedDot(Location),

    #[error("unknown syntax '{1}' at {0}")]
    UnknownSyntax(Location, String),

    #[error("bytevector element at {0} is not a byte")]
    InvalidByte(Location),

    #[error("hash table entry at {0} is not a pair")]
    InvalidEntry(Location),

    #[error("expected a single datum but found {0}")]
    ExpectedOne(usize),
}

pub type Result<T, E = ReadError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    List,
    Vector,
    Bytevector,
    Table,
}

/// An open bracket: what it builds, where its items start on the stack and where a dotted tail
/// begins, if any.
struct Open {
    frame: Frame,
    index: usize,
    dot: Option<usize>,
}

struct State<'a, 'h> {
    heap: &'h mut Heap,
    peekable: Peekable<Chars<'a>>,
    stack: Vec<Value>,
    open: Vec<Open>,
    /// Quotes waiting for their datum, keyed by the nesting level they appeared at.
    quotes: Vec<usize>,
    position: Location,
}

fn is_delimiter(chr: char) -> bool {
    chr.is_whitespace() || matches!(chr, '(' | ')' | '"' | ';')
}

impl<'a, 'h> State<'a, 'h> {
    fn new(heap: &'h mut Heap, input: &'a str) -> Self {
        Self {
            heap,
            peekable: input.chars().peekable(),
            stack: Vec::new(),
            open: Vec::new(),
            quotes: Vec::new(),
            position: Location { line: 1, column: 0 },
        }
    }

    fn advance(&mut self) -> Option<char> {
        let chr = self.peekable.next()?;

        match chr {
            '\n' => {
                self.position.line += 1;
                self.position.column = 0;
            }
            _ => self.position.column += 1,
        }

        Some(chr)
    }

    fn accumulate_while<F>(&mut self, chr: char, mut f: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut string: String = chr.into();

        while let Some(&next) = self.peekable.peek() {
            if !f(next) {
                break;
            }
            string.push(next);
            self.advance();
        }

        string
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn open(&mut self, frame: Frame) {
        self.open.push(Open {
            frame,
            index: self.stack.len(),
            dot: None,
        });
    }

    fn dot(&mut self, start: Location) -> Result<()> {
        let len = self.stack.len();
        match self.open.last_mut() {
            Some(open) if open.frame == Frame::List && open.dot.is_none() && len > open.index => {
                open.dot = Some(len);
                Ok(())
            }
            _ => Err(ReadError::MisplacedDot(start)),
        }
    }

    fn close(&mut self) -> Result<()> {
        let Some(open) = self.open.pop() else {
            return Err(ReadError::UnmatchedParenthesis(self.position));
        };
        let mut items = self.stack.split_off(open.index);

        let value = match open.frame {
            Frame::List => match open.dot {
                Some(dot) => {
                    if items.len() != dot - open.index + 1 {
                        return Err(ReadError::MisplacedDot(self.position));
                    }
                    let tail = items.pop().unwrap_or(Value::EOL);
                    self.heap.list_with_tail(items, tail)
                }
                None => self.heap.list(items),
            },
            Frame::Vector => self.heap.vector(items),
            Frame::Bytevector => {
                let bytes = items
                    .into_iter()
                    .map(|item| item.as_fixnum().and_then(|byte| u8::try_from(byte).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or(ReadError::InvalidByte(self.position))?;
                self.heap.bytevector(bytes)
            }
            Frame::Table => {
                let table = self.heap.make_hash_table(items.len());
                for item in items {
                    let (key, value) = self
                        .heap
                        .pair(item)
                        .ok_or(ReadError::InvalidEntry(self.position))?;
                    self.heap
                        .hash_set(table, key, value)
                        .map_err(|_| ReadError::InvalidEntry(self.position))?;
                }
                table
            }
        };

        self.push(value);
        Ok(())
    }

    /// A datum just finished, it satisfies a pending quote at the same nesting level.
    fn quote_close(&mut self) {
        if self.quotes.last() == Some(&self.open.len()) {
            self.quotes.pop();
        }
    }

    fn read(&mut self) -> Result<Vec<Value>> {
        while let Some(chr) = self.advance() {
            let start = self.position;
            match chr {
                c if c.is_whitespace() => continue,
                '\'' => {
                    self.quotes.push(self.open.len());
                    continue;
                }
                ';' => {
                    self.parse_comment();
                    continue;
                }
                '(' => {
                    self.open(Frame::List);
                    continue;
                }
                ')' => self.close()?,
                '"' => self.parse_string(start)?,
                '#' => {
                    if self.parse_hash(start)? {
                        continue;
                    }
                }
                '.' if self.peekable.peek().map_or(true, |&c| is_delimiter(c)) => {
                    self.dot(start)?;
                    continue;
                }
                _ => self.parse_rest(chr),
            }
            self.quote_close();
        }

        if !self.quotes.is_empty() {
            return Err(ReadError::UnmatchedQuote(self.position));
        }

        if !self.open.is_empty() {
            return Err(ReadError::UnclosedParenthesis(self.position));
        }

        Ok(std::mem::take(&mut self.stack))
    }

    fn parse_comment(&mut self) {
        self.accumulate_while(';', |c| c != '\n');
        self.advance();
    }

    fn parse_string(&mut self, start: Location) -> Result<()> {
        let mut string = String::new();

        loop {
            match self.advance() {
                None => return Err(ReadError::UnclosedString(start)),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => return Err(ReadError::InvalidEscape(self.position, other)),
                        None => return Err(ReadError::UnclosedString(start)),
                    };
                    string.push(escaped);
                }
                Some(chr) => string.push(chr),
            }
        }

        let value = self.heap.string(&string);
        self.push(value);
        Ok(())
    }

    /// Reads the `#` syntaxes. Returns true when a bracket was opened, so no datum finished yet.
    fn parse_hash(&mut self, start: Location) -> Result<bool> {
        if self.peekable.peek() == Some(&'(') {
            self.advance();
            self.open(Frame::Vector);
            return Ok(true);
        }

        let token = if self.peekable.peek() == Some(&'\\') {
            self.advance();
            // The character right after `#\` is part of the literal even when it delimits.
            match self.advance() {
                Some(chr) => format!("#\\{}", self.accumulate_while(chr, |c| !is_delimiter(c))),
                None => String::from("#\\"),
            }
        } else {
            self.accumulate_while('#', |c| !is_delimiter(c))
        };

        let value = match token.as_str() {
            "#t" | "#true" => Value::TRUE,
            "#f" | "#false" => Value::FALSE,
            "#nil" => Value::NIL,
            "#eof" => Value::EOF,
            "#unspecified" => Value::UNSPECIFIED,
            "#undefined" => Value::UNDEFINED,
            "#vu8" | "#hash" if self.peekable.peek() == Some(&'(') => {
                self.advance();
                let frame = if token == "#vu8" { Frame::Bytevector } else { Frame::Table };
                self.open(frame);
                return Ok(true);
            }
            "#\\space" => Value::character(' '),
            "#\\newline" => Value::character('\n'),
            _ => {
                if let Some(name) = token.strip_prefix("#:").filter(|name| !name.is_empty()) {
                    self.heap.keyword(name)
                } else if let Some(chr) = single_char(&token) {
                    Value::character(chr)
                } else {
                    return Err(ReadError::UnknownSyntax(start, token));
                }
            }
        };

        self.push(value);
        Ok(false)
    }

    fn parse_rest(&mut self, chr: char) {
        let string = self.accumulate_while(chr, |c| !is_delimiter(c));

        let value = if let Ok(int) = string.parse::<i128>() {
            self.heap.integer(int)
        } else if let Some(real) = parse_real(&string) {
            self.heap.real(real)
        } else {
            self.heap.intern(&string)
        };

        self.push(value);
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.strip_prefix("#\\")?.chars();
    let chr = chars.next()?;
    chars.next().is_none().then_some(chr)
}

fn parse_real(string: &str) -> Option<f64> {
    match string {
        "+inf.0" => Some(f64::INFINITY),
        "-inf.0" => Some(f64::NEG_INFINITY),
        "+nan.0" | "-nan.0" => Some(f64::NAN),
        // Rust also accepts `inf` and `nan`, those are symbols here.
        _ if string.chars().any(|c| c.is_ascii_digit()) => string.parse().ok(),
        _ => None,
    }
}

/// Reads every datum of `input`.
pub fn read_all(heap: &mut Heap, input: &str) -> Result<Vec<Value>> {
    State::new(heap, input).read()
}

/// Reads exactly one datum.
pub fn read(heap: &mut Heap, input: &str) -> Result<Value> {
    match read_all(heap, input)?.as_slice() {
        [value] => Ok(*value),
        values => Err(ReadError::ExpectedOne(values.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        let mut heap = Heap::new();
        let value = read(&mut heap, input).unwrap();
        heap.display(value).to_string()
    }

    #[test]
    fn atoms() {
        assert_eq!(roundtrip("123"), "123");
        assert_eq!(roundtrip("-7"), "-7");
        assert_eq!(roundtrip("123.456"), "123.456");
        assert_eq!(roundtrip("#t"), "#t");
        assert_eq!(roundtrip("#false"), "#f");
        assert_eq!(roundtrip("#nil"), "#nil");
        assert_eq!(roundtrip("#eof"), "#<eof>");
        assert_eq!(roundtrip("#unspecified"), "#<unspecified>");
        assert_eq!(roundtrip("#:key"), "#:key");
        assert_eq!(roundtrip("nan"), "nan");
        assert_eq!(roundtrip("+inf.0"), "+inf.0");
        assert_eq!(roundtrip("#\\a"), "#\\a");
    }

    #[test]
    fn delimiter_characters() {
        let mut heap = Heap::new();
        assert_eq!(read(&mut heap, "#\\(").unwrap(), Value::character('('));
        assert_eq!(read(&mut heap, "#\\)").unwrap(), Value::character(')'));
        assert_eq!(read(&mut heap, "#\\ ").unwrap(), Value::character(' '));

        let list = read(&mut heap, "(#\\) #\\()").unwrap();
        assert_eq!(heap.car(list), Some(Value::character(')')));
        let rest = heap.cdr(list).unwrap();
        assert_eq!(heap.car(rest), Some(Value::character('(')));
        assert_eq!(heap.cdr(rest), Some(Value::EOL));

        assert!(matches!(
            read(&mut heap, "#\\"),
            Err(ReadError::UnknownSyntax(_, token)) if token == "#\\"
        ));
    }

    #[test]
    fn big_integers() {
        let mut heap = Heap::new();
        let value = read(&mut heap, "18446744073709551615").unwrap();
        assert!(value.is_heap());
        assert_eq!(heap.display(value).to_string(), "18446744073709551615");
    }

    #[test]
    fn strings() {
        assert_eq!(roundtrip(r#""a \"b\" \\ c\n""#), r#""a \"b\" \\ c\n""#);
        assert_eq!(roundtrip("\"日本語\""), "\"日本語\"");

        let mut heap = Heap::new();
        assert!(matches!(read(&mut heap, "\"open"), Err(ReadError::UnclosedString(_))));
        assert!(matches!(read(&mut heap, r#""\q""#), Err(ReadError::InvalidEscape(_, 'q'))));
    }

    #[test]
    fn lists() {
        assert_eq!(roundtrip("(#f 345)"), "(#f 345)");
        assert_eq!(roundtrip("()"), "()");
        assert_eq!(roundtrip("(1 (2 3) . 4)"), "(1 (2 3) . 4)");
        assert_eq!(roundtrip("'(a b) ; comment"), "(a b)");
        assert_eq!(roundtrip("(a 'b)"), "(a b)");
    }

    #[test]
    fn compound_syntax() {
        assert_eq!(roundtrip("#(1 #t)"), "#(1 #t)");
        assert_eq!(roundtrip("#vu8(1 255)"), "#vu8(1 255)");
        assert_eq!(roundtrip("#hash((a . 1) (b . 2))"), "#<hash-table 2/7>");
    }

    #[test]
    fn errors() {
        let mut heap = Heap::new();
        assert!(matches!(read(&mut heap, "(1 2"), Err(ReadError::UnclosedParenthesis(_))));
        assert!(matches!(read(&mut heap, "1)"), Err(ReadError::UnmatchedParenthesis(_))));
        assert!(matches!(read(&mut heap, "(. 1)"), Err(ReadError::MisplacedDot(_))));
        assert!(matches!(read(&mut heap, "(1 . 2 3)"), Err(ReadError::MisplacedDot(_))));
        assert!(matches!(read(&mut heap, "#vu8(256)"), Err(ReadError::InvalidByte(_))));
        assert!(matches!(read(&mut heap, "#hash(1)"), Err(ReadError::InvalidEntry(_))));
        assert!(matches!(read(&mut heap, "#bogus"), Err(ReadError::UnknownSyntax(..))));
        assert!(matches!(read(&mut heap, "'"), Err(ReadError::UnmatchedQuote(_))));
        assert_eq!(read(&mut heap, "1 2"), Err(ReadError::ExpectedOne(2)));
        assert_eq!(read(&mut heap, ""), Err(ReadError::ExpectedOne(0)));
    }

    #[test]
    fn error_locations() {
        let mut heap = Heap::new();
        let err = read(&mut heap, "(1\n  #bogus)").unwrap_err();
        assert_eq!(err, ReadError::UnknownSyntax(Location { line: 2, column: 3 }, "#bogus".into()));
    }
}
