use proptest::prelude::*;
use soft_mpack::wire::Writer;
use soft_mpack::{
    classify, pack, reader, unpack, Category, CodecFlags, Config, Constant, Opaque, PackError,
    UnknownPolicy, UnpackError, ValueFactory, DEFAULT_MAX_DEPTH,
};
use soft_runtime::{Heap, OpaqueKind, Value};

/// Runtime-independent factory that builds a plain tree, so decoding can be checked without a
/// heap.
#[derive(Default)]
struct Recorder {
    tables: Vec<Vec<(Node, Node)>>,
    calls: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Constant(Constant),
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Real(f64),
    Str(String),
    Bytes(Vec<u8>),
    Symbol(String),
    Keyword(String),
    Pair(Box<Node>, Box<Node>),
    Vector(Vec<Node>),
    Table(usize),
}

impl Recorder {
    fn node(&mut self, node: Node) -> Node {
        self.calls += 1;
        node
    }
}

impl ValueFactory for Recorder {
    type Value = Node;

    fn constant(&mut self, constant: Constant) -> Node {
        self.node(Node::Constant(constant))
    }

    fn boolean(&mut self, value: bool) -> Node {
        self.node(Node::Boolean(value))
    }

    fn unsigned(&mut self, value: u64) -> Node {
        self.node(Node::Unsigned(value))
    }

    fn signed(&mut self, value: i64) -> Node {
        self.node(Node::Signed(value))
    }

    fn real(&mut self, value: f64) -> Node {
        self.node(Node::Real(value))
    }

    fn string(&mut self, value: &str) -> Node {
        self.node(Node::Str(value.into()))
    }

    fn bytevector(&mut self, bytes: &[u8]) -> Node {
        self.node(Node::Bytes(bytes.to_vec()))
    }

    fn symbol(&mut self, name: &str) -> Node {
        self.node(Node::Symbol(name.into()))
    }

    fn keyword(&mut self, name: &str) -> Node {
        self.node(Node::Keyword(name.into()))
    }

    fn cons(&mut self, car: Node, cdr: Node) -> Node {
        self.node(Node::Pair(Box::new(car), Box::new(cdr)))
    }

    fn vector(&mut self, items: Vec<Node>) -> Node {
        self.node(Node::Vector(items))
    }

    fn table(&mut self, capacity: usize) -> Node {
        self.tables.push(Vec::with_capacity(capacity));
        self.node(Node::Table(self.tables.len() - 1))
    }

    fn table_insert(&mut self, table: &Node, key: Node, value: Node) {
        if let Node::Table(index) = table {
            self.tables[*index].push((key, value));
        }
    }
}

fn read(heap: &mut Heap, datum: &str) -> Value {
    reader::read(heap, datum).unwrap()
}

fn roundtrip(heap: &mut Heap, value: Value, config: &Config) -> Value {
    let bytes = pack(heap, value, config).unwrap();
    unpack(&bytes, heap, config).unwrap()
}

#[test]
fn boolean_and_integer_list_matches_wire_bytes() {
    let mut heap = Heap::new();
    let value = read(&mut heap, "(#f 345)");

    let bytes = pack(&heap, value, &Config::default()).unwrap();
    assert_eq!(bytes, [0x92, 0xc2, 0xcd, 0x01, 0x59]);

    let back = unpack(&bytes, &mut heap, &Config::default()).unwrap();
    assert_eq!(heap.display(back).to_string(), "(#f 345)");
}

#[test]
fn supported_values_roundtrip() {
    let datums = [
        "123",
        "-5",
        "0",
        "18446744073709551615",
        "-9223372036854775808",
        "1.5",
        "-0.25",
        "\"hello\"",
        "\"\"",
        "#t",
        "#f",
        "()",
        "sym",
        "#:kw",
        "(1 (2 \"three\") #t (()))",
        "#hash((a . 1) (\"b\" . (1 2)) (#:c . #hash()))",
    ];

    let mut heap = Heap::new();
    for datum in datums {
        let value = read(&mut heap, datum);
        let back = roundtrip(&mut heap, value, &Config::default());
        assert!(heap.equal(value, back), "{datum} came back as {}", heap.display(back));
        assert_eq!(classify(&heap, value), classify(&heap, back), "{datum}");
    }
}

#[test]
fn singletons_collapse_unless_distinct() {
    let mut heap = Heap::new();
    let singletons = [Value::EOF, Value::NIL, Value::UNSPECIFIED, Value::UNDEFINED];

    for value in singletons {
        assert_eq!(roundtrip(&mut heap, value, &Config::default()), Value::EOL);
    }

    let distinct = Config::new(CodecFlags::DISTINCT_SINGLETONS);
    for value in singletons.into_iter().chain([Value::EOL]) {
        assert_eq!(roundtrip(&mut heap, value, &distinct), value);
    }
}

#[test]
fn disabled_name_extensions_come_back_as_strings() {
    let mut heap = Heap::new();
    let value = read(&mut heap, "(sym #:kw)");
    let config = Config::new(CodecFlags::DISABLE_SYMBOL_EXT | CodecFlags::DISABLE_KEYWORD_EXT);

    let back = roundtrip(&mut heap, value, &config);
    assert_eq!(heap.display(back).to_string(), "(\"sym\" \"kw\")");
}

#[test]
fn classification_is_idempotent() {
    let mut heap = Heap::new();
    let port = heap.make_opaque(OpaqueKind::Port);
    let values = [
        read(&mut heap, "(1 2)"),
        read(&mut heap, "#(1 2)"),
        read(&mut heap, "#\\x"),
        read(&mut heap, "2.5"),
        port,
        Value::from_bits(0b111),
    ];

    for value in values {
        let first = classify(&heap, value);
        assert_eq!(first, classify(&heap, value));
    }
    assert_eq!(classify(&heap, Value::from_bits(0b111)), Category::Invalid);
}

#[test]
fn three_entry_table() {
    let mut heap = Heap::new();
    let table = read(&mut heap, "#hash((a . 1) (b . 2) (c . 3))");

    let bytes = pack(&heap, table, &Config::default()).unwrap();
    assert_eq!(bytes[0], 0x83);

    let back = unpack(&bytes, &mut heap, &Config::default()).unwrap();
    assert_eq!(heap.hash_table(back).unwrap().len(), 3);
    for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
        let key = heap.intern(key);
        assert_eq!(heap.hash_ref(back, key).unwrap(), Value::fixnum(value));
    }

    let mut recorder = Recorder::default();
    let node = unpack(&bytes, &mut recorder, &Config::default()).unwrap();
    assert_eq!(node, Node::Table(0));
    let mut entries = recorder.tables[0].clone();
    entries.sort_by_key(|(_, value)| match value {
        Node::Unsigned(n) => *n,
        _ => u64::MAX,
    });
    assert_eq!(
        entries,
        [
            (Node::Symbol("a".into()), Node::Unsigned(1)),
            (Node::Symbol("b".into()), Node::Unsigned(2)),
            (Node::Symbol("c".into()), Node::Unsigned(3)),
        ]
    );
}

#[test]
fn unknown_extension_is_kept_as_code_and_bytes() {
    let mut recorder = Recorder::default();
    let bytes = [0xd5, 0xc8, 0xaa, 0xbb];

    let node = unpack(&bytes, &mut recorder, &Config::default()).unwrap();
    let (code, body) = match node {
        Node::Pair(code, body) => match (*code, *body) {
            (Node::Signed(code), Node::Bytes(body)) => (code, body),
            other => panic!("expected a code and bytes, got {other:?}"),
        },
        other => panic!("expected a pair, got {other:?}"),
    };
    assert_eq!(code as u8, 200);
    assert_eq!(body, [0xaa, 0xbb]);

    let mut writer = Writer::new();
    writer.ext(code as i8, &body).unwrap();
    assert_eq!(writer.into_inner(), bytes);
}

#[test]
fn map_truncated_after_two_entries_is_malformed() {
    let mut heap = Heap::new();
    let table = read(&mut heap, "#hash((1 . 10) (2 . 20) (3 . 30))");
    let bytes = pack(&heap, table, &Config::default()).unwrap();

    // Header plus two one-byte keys and two one-byte values.
    let truncated = &bytes[..5];
    let mut recorder = Recorder::default();
    let err = unpack(truncated, &mut recorder, &Config::default()).unwrap_err();

    assert!(err.is_malformed(), "{err}");
    assert_eq!(recorder.calls, 0);
    assert!(recorder.tables.is_empty());
}

#[test]
fn unsupported_value_fails_or_becomes_nil() {
    let mut heap = Heap::new();
    let port = heap.make_opaque(OpaqueKind::Port);

    let err = pack(&heap, port, &Config::default()).unwrap_err();
    assert!(matches!(
        err,
        PackError::Unsupported {
            category: Category::Opaque(Opaque::Port)
        }
    ));

    let null = Config::default().with_unknown_policy(UnknownPolicy::Null);
    assert_eq!(pack(&heap, port, &null).unwrap(), [0xc0]);
}

#[test]
fn multi_byte_utf8_strings() {
    let mut heap = Heap::new();
    let text = "héllo 日本 🎉";
    let value = heap.string(text);

    let bytes = pack(&heap, value, &Config::default()).unwrap();
    assert_eq!(bytes[0], 0xa0 | text.len() as u8);
    assert_eq!(&bytes[1..], text.as_bytes());

    let back = unpack(&bytes, &mut heap, &Config::default()).unwrap();
    assert_eq!(heap.string_ref(back), Some(text));
}

#[test]
fn improper_lists_are_rejected() {
    let mut heap = Heap::new();
    let value = read(&mut heap, "(1 2 . 3)");
    assert!(matches!(
        pack(&heap, value, &Config::default()),
        Err(PackError::ImproperList)
    ));
}

#[test]
fn depth_limit_in_both_directions() {
    let mut heap = Heap::new();
    let mut value = Value::EOL;
    for _ in 0..600 {
        value = heap.cons(value, Value::EOL);
    }
    assert!(matches!(
        pack(&heap, value, &Config::default()),
        Err(PackError::DepthExceeded { limit: 512 })
    ));
    assert!(pack(&heap, value, &Config::default().with_max_depth(600)).is_ok());

    let mut bytes = vec![0x91; 600];
    bytes.push(0xc0);
    assert_eq!(
        unpack(&bytes, &mut heap, &Config::default()),
        Err(UnpackError::DepthExceeded { limit: 512 })
    );
}

#[test]
fn default_depth_unpacks_on_a_small_thread() {
    let mut bytes = vec![0x91; DEFAULT_MAX_DEPTH];
    bytes.push(0xc0);

    let depth = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || {
            let mut heap = Heap::new();
            let mut value = unpack(&bytes, &mut heap, &Config::default()).unwrap();
            let mut depth = 0;
            while let Some(inner) = heap.car(value) {
                value = inner;
                depth += 1;
            }
            depth
        })
        .unwrap()
        .join()
        .unwrap();
    // The innermost array holds only a nil, which decodes to the empty list.
    assert_eq!(depth, DEFAULT_MAX_DEPTH);
}

#[test]
fn deep_map_key_unpacks_on_a_small_thread() {
    let depth = 500;
    let mut bytes = vec![0x81];
    bytes.extend(std::iter::repeat(0x91).take(depth));
    bytes.extend([0xc0, 0x01]);

    let tables = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || {
            let mut recorder = Recorder::default();
            unpack(&bytes, &mut recorder, &Config::default()).unwrap();
            recorder.tables.len()
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn arrays_decode_to_vectors_on_request() {
    let mut heap = Heap::new();
    let value = read(&mut heap, "#(1 #(2) \"x\")");
    let config = Config::new(CodecFlags::ENCODE_VECTORS | CodecFlags::ARRAYS_AS_VECTORS);

    let back = roundtrip(&mut heap, value, &config);
    assert!(heap.equal(value, back));
}

#[test]
fn bytevectors_roundtrip_when_enabled() {
    let mut heap = Heap::new();
    let value = read(&mut heap, "#vu8(0 1 255)");
    let config = Config::new(CodecFlags::ENCODE_BYTEVECTORS);

    assert_eq!(pack(&heap, value, &config).unwrap(), [0xc4, 3, 0, 1, 255]);
    let back = roundtrip(&mut heap, value, &config);
    assert!(heap.equal(value, back));
}

#[test]
fn recorder_sees_constants() {
    let mut recorder = Recorder::default();
    let node = unpack(&[0xc0], &mut recorder, &Config::default()).unwrap();
    assert_eq!(node, Node::Constant(Constant::EmptyList));

    let bytes = [0x91, 0xcb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0];
    let node = unpack(&bytes, &mut recorder, &Config::default()).unwrap();
    assert_eq!(
        node,
        Node::Pair(
            Box::new(Node::Real(1.5)),
            Box::new(Node::Constant(Constant::EmptyList))
        )
    );
}

proptest! {
    #[test]
    fn integers_roundtrip(number in any::<i64>()) {
        let mut heap = Heap::new();
        let value = heap.integer(number.into());
        let back = roundtrip(&mut heap, value, &Config::default());
        prop_assert!(heap.equal(value, back));
    }

    #[test]
    fn unsigned_integers_roundtrip(number in any::<u64>()) {
        let mut heap = Heap::new();
        let value = heap.integer(number.into());
        let back = roundtrip(&mut heap, value, &Config::default());
        prop_assert!(heap.equal(value, back));
    }

    #[test]
    fn strings_roundtrip(text in any::<String>()) {
        let mut heap = Heap::new();
        let value = heap.string(&text);
        let back = roundtrip(&mut heap, value, &Config::default());
        prop_assert_eq!(heap.string_ref(back), Some(text.as_str()));
    }
}
