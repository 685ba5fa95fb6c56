//! Bounded MessagePack parser. The whole tree is parsed before anything reaches a runtime
//! factory, so truncated or malformed input fails without side effects. Containers are parsed
//! with an explicit stack of open frames, nesting never grows the call stack.

use rmp::decode::bytes::BytesReadError;
use rmp::decode::{self, Bytes, RmpRead, ValueReadError};
use rmp::Marker;

use crate::error::UnpackError;

use super::Payload;

pub type Result<T, E = UnpackError> = std::result::Result<T, E>;

/// Parses one payload from the front of `bytes`, returning it with the number of bytes used.
/// Containers nested more than `max_depth` levels fail.
pub fn read(bytes: &[u8], max_depth: usize) -> Result<(Payload<'_>, usize)> {
    let mut cursor = Cursor {
        input: bytes,
        bytes: Bytes::new(bytes),
        max_depth,
    };

    let mut parents: Vec<Frame<'_>> = Vec::new();
    let mut step = cursor.next(0)?;
    loop {
        step = match step {
            Step::Value(payload) => match parents.pop() {
                None => return Ok((payload, cursor.offset())),
                Some(mut frame) => {
                    frame.push(payload);
                    Step::Open(frame)
                }
            },
            Step::Open(frame) if frame.is_full() => Step::Value(frame.finish()),
            Step::Open(frame) => {
                parents.push(frame);
                cursor.next(parents.len())?
            }
        };
    }
}

/// A container whose elements are still being read.
enum Frame<'a> {
    Array {
        len: usize,
        items: Vec<Payload<'a>>,
    },
    Map {
        len: usize,
        key: Option<Payload<'a>>,
        entries: Vec<(Payload<'a>, Payload<'a>)>,
    },
}

impl<'a> Frame<'a> {
    fn is_full(&self) -> bool {
        match self {
            Frame::Array { len, items } => items.len() == *len,
            Frame::Map { len, entries, .. } => entries.len() == *len,
        }
    }

    fn push(&mut self, payload: Payload<'a>) {
        match self {
            Frame::Array { items, .. } => items.push(payload),
            Frame::Map { key, entries, .. } => match key.take() {
                Some(key) => entries.push((key, payload)),
                None => *key = Some(payload),
            },
        }
    }

    fn finish(self) -> Payload<'a> {
        match self {
            Frame::Array { items, .. } => Payload::Array(items),
            Frame::Map { entries, .. } => Payload::Map(entries),
        }
    }
}

enum Step<'a> {
    Value(Payload<'a>),
    Open(Frame<'a>),
}

struct Cursor<'a> {
    input: &'a [u8],
    bytes: Bytes<'a>,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    fn offset(&self) -> usize {
        self.input.len() - self.bytes.remaining_slice().len()
    }

    fn truncated(&self, err: BytesReadError) -> UnpackError {
        let needed = match err {
            BytesReadError::InsufficientBytes {
                expected, actual, ..
            } => expected - actual,
            _ => 1,
        };
        UnpackError::Truncated {
            offset: self.offset(),
            needed,
        }
    }

    fn data<T>(
        &mut self,
        read: impl FnOnce(&mut Bytes<'a>) -> Result<T, ValueReadError<BytesReadError>>,
    ) -> Result<T> {
        read(&mut self.bytes).map_err(|err| match err {
            ValueReadError::InvalidMarkerRead(err) | ValueReadError::InvalidDataRead(err) => {
                self.truncated(err)
            }
            ValueReadError::TypeMismatch(marker) => UnpackError::Reserved {
                offset: self.offset(),
                marker: marker.to_u8(),
            },
        })
    }

    fn len8(&mut self) -> Result<usize> {
        self.data(|bytes| bytes.read_data_u8()).map(usize::from)
    }

    fn len16(&mut self) -> Result<usize> {
        self.data(|bytes| bytes.read_data_u16()).map(usize::from)
    }

    fn len32(&mut self) -> Result<usize> {
        self.data(|bytes| bytes.read_data_u32()).map(|len| len as usize)
    }

    /// Borrows the next `len` bytes from the input.
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let rest = self.bytes.remaining_slice();
        if rest.len() < len {
            return Err(UnpackError::Truncated {
                offset: self.offset(),
                needed: len - rest.len(),
            });
        }
        let (body, rest) = rest.split_at(len);
        self.bytes = Bytes::new(rest);
        Ok(body)
    }

    fn signed(value: i64) -> Payload<'a> {
        match u64::try_from(value) {
            Ok(unsigned) => Payload::Unsigned(unsigned),
            Err(_) => Payload::Signed(value),
        }
    }

    fn str(&mut self, len: usize) -> Result<Payload<'a>> {
        let offset = self.offset();
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(Payload::Str)
            .map_err(|_| UnpackError::InvalidUtf8 { offset })
    }

    fn ext(&mut self, len: usize) -> Result<Payload<'a>> {
        let code = self.data(|bytes| bytes.read_data_i8())?;
        Ok(Payload::Ext(code, self.take(len)?))
    }

    /// Opens a container one level below its `parents`.
    fn open(&self, parents: usize, frame: impl FnOnce(usize) -> Frame<'a>) -> Result<Step<'a>> {
        if parents + 1 > self.max_depth {
            return Err(UnpackError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        // Every element takes at least one byte.
        Ok(Step::Open(frame(self.bytes.remaining_slice().len())))
    }

    fn array(&self, len: usize, parents: usize) -> Result<Step<'a>> {
        self.open(parents, |remaining| Frame::Array {
            len,
            items: Vec::with_capacity(len.min(remaining)),
        })
    }

    fn map(&self, len: usize, parents: usize) -> Result<Step<'a>> {
        self.open(parents, |remaining| Frame::Map {
            len,
            key: None,
            entries: Vec::with_capacity(len.min(remaining / 2)),
        })
    }

    /// Reads the next scalar, or the header of the next container.
    fn next(&mut self, parents: usize) -> Result<Step<'a>> {
        let offset = self.offset();
        let marker = decode::read_marker(&mut self.bytes).map_err(|err| self.truncated(err.0))?;

        let payload = match marker {
            Marker::Null => Payload::Nil,
            Marker::True => Payload::Boolean(true),
            Marker::False => Payload::Boolean(false),
            Marker::FixPos(value) => Payload::Unsigned(value.into()),
            Marker::FixNeg(value) => Payload::Signed(value.into()),
            Marker::U8 => Payload::Unsigned(self.data(|bytes| bytes.read_data_u8())?.into()),
            Marker::U16 => Payload::Unsigned(self.data(|bytes| bytes.read_data_u16())?.into()),
            Marker::U32 => Payload::Unsigned(self.data(|bytes| bytes.read_data_u32())?.into()),
            Marker::U64 => Payload::Unsigned(self.data(|bytes| bytes.read_data_u64())?),
            Marker::I8 => Self::signed(self.data(|bytes| bytes.read_data_i8())?.into()),
            Marker::I16 => Self::signed(self.data(|bytes| bytes.read_data_i16())?.into()),
            Marker::I32 => Self::signed(self.data(|bytes| bytes.read_data_i32())?.into()),
            Marker::I64 => Self::signed(self.data(|bytes| bytes.read_data_i64())?),
            Marker::F32 => Payload::F32(self.data(|bytes| bytes.read_data_f32())?),
            Marker::F64 => Payload::F64(self.data(|bytes| bytes.read_data_f64())?),
            Marker::FixStr(len) => self.str(len.into())?,
            Marker::Str8 => {
                let len = self.len8()?;
                self.str(len)?
            }
            Marker::Str16 => {
                let len = self.len16()?;
                self.str(len)?
            }
            Marker::Str32 => {
                let len = self.len32()?;
                self.str(len)?
            }
            Marker::Bin8 => {
                let len = self.len8()?;
                Payload::Bin(self.take(len)?)
            }
            Marker::Bin16 => {
                let len = self.len16()?;
                Payload::Bin(self.take(len)?)
            }
            Marker::Bin32 => {
                let len = self.len32()?;
                Payload::Bin(self.take(len)?)
            }
            Marker::FixArray(len) => return self.array(len.into(), parents),
            Marker::Array16 => {
                let len = self.len16()?;
                return self.array(len, parents);
            }
            Marker::Array32 => {
                let len = self.len32()?;
                return self.array(len, parents);
            }
            Marker::FixMap(len) => return self.map(len.into(), parents),
            Marker::Map16 => {
                let len = self.len16()?;
                return self.map(len, parents);
            }
            Marker::Map32 => {
                let len = self.len32()?;
                return self.map(len, parents);
            }
            Marker::FixExt1 => self.ext(1)?,
            Marker::FixExt2 => self.ext(2)?,
            Marker::FixExt4 => self.ext(4)?,
            Marker::FixExt8 => self.ext(8)?,
            Marker::FixExt16 => self.ext(16)?,
            Marker::Ext8 => {
                let len = self.len8()?;
                self.ext(len)?
            }
            Marker::Ext16 => {
                let len = self.len16()?;
                self.ext(len)?
            }
            Marker::Ext32 => {
                let len = self.len32()?;
                self.ext(len)?
            }
            Marker::Reserved => {
                return Err(UnpackError::Reserved {
                    offset,
                    marker: marker.to_u8(),
                });
            }
        };

        Ok(Step::Value(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::DEFAULT_MAX_DEPTH;

    fn parse(bytes: &[u8]) -> Result<Payload<'_>> {
        read(bytes, 16).map(|(payload, _)| payload)
    }

    #[test]
    fn scalars() {
        assert_eq!(parse(&[0xc0]).unwrap(), Payload::Nil);
        assert_eq!(parse(&[0xc3]).unwrap(), Payload::Boolean(true));
        assert_eq!(parse(&[0x7b]).unwrap(), Payload::Unsigned(123));
        assert_eq!(parse(&[0xe0]).unwrap(), Payload::Signed(-32));
        assert_eq!(parse(&[0xd1, 0xff, 0x00]).unwrap(), Payload::Signed(-256));
        assert_eq!(
            parse(&[0xca, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Payload::F32(1.5)
        );
    }

    #[test]
    fn non_negative_signed_ints_are_unsigned() {
        assert_eq!(parse(&[0xd0, 0x05]).unwrap(), Payload::Unsigned(5));
        assert_eq!(
            parse(&[0xd3, 0, 0, 0, 0, 0, 0, 0x01, 0x00]).unwrap(),
            Payload::Unsigned(256)
        );
    }

    #[test]
    fn strings_and_binaries() {
        assert_eq!(parse(&[0xa2, b'h', b'i']).unwrap(), Payload::Str("hi"));
        assert_eq!(parse(&[0xd9, 1, b'x']).unwrap(), Payload::Str("x"));
        assert_eq!(parse(&[0xc4, 2, 1, 2]).unwrap(), Payload::Bin(&[1, 2]));
        assert_eq!(
            parse(&[0xa2, 0xff, 0xfe]),
            Err(UnpackError::InvalidUtf8 { offset: 1 })
        );
    }

    #[test]
    fn extensions_keep_signed_code() {
        assert_eq!(parse(&[0xd4, 0xc8, 0x01]).unwrap(), Payload::Ext(-56, &[1]));
        assert_eq!(parse(&[0xc7, 0, 100]).unwrap(), Payload::Ext(100, &[]));
    }

    #[test]
    fn truncated_map() {
        // Declares three entries but only carries two.
        let bytes = [0x83, 0x01, 0x01, 0x02, 0x02];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err, UnpackError::Truncated { offset: 5, needed: 1 });
        assert!(err.is_malformed());
    }

    #[test]
    fn truncated_header() {
        assert_eq!(
            parse(&[0xcd, 0x01]),
            Err(UnpackError::Truncated { offset: 1, needed: 1 })
        );
        assert!(parse(&[]).unwrap_err().is_malformed());
    }

    #[test]
    fn reserved_marker() {
        assert_eq!(
            parse(&[0xc1]),
            Err(UnpackError::Reserved { offset: 0, marker: 0xc1 })
        );
    }

    #[test]
    fn depth_limit() {
        let nested = [0x91, 0x91, 0x91, 0xc0];
        assert!(read(&nested, 3).is_ok());
        assert_eq!(
            read(&nested, 2).map(|(payload, _)| payload),
            Err(UnpackError::DepthExceeded { limit: 2 })
        );
    }

    #[test]
    fn nested_containers_keep_order() {
        // {1: [2, {}], 3: 4}
        let bytes = [0x82, 0x01, 0x92, 0x02, 0x80, 0x03, 0x04];
        assert_eq!(
            parse(&bytes).unwrap(),
            Payload::Map(vec![
                (
                    Payload::Unsigned(1),
                    Payload::Array(vec![Payload::Unsigned(2), Payload::Map(vec![])])
                ),
                (Payload::Unsigned(3), Payload::Unsigned(4)),
            ])
        );
    }

    #[test]
    fn default_depth_fits_a_small_thread() {
        let mut bytes = vec![0x91; DEFAULT_MAX_DEPTH];
        bytes.push(0xc0);

        let used = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(move || read(&bytes, DEFAULT_MAX_DEPTH).map(|(_, used)| used))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(used, Ok(DEFAULT_MAX_DEPTH + 1));
    }

    #[test]
    fn reports_consumed_length() {
        let (payload, used) = read(&[0x01, 0x02, 0x03], 4).unwrap();
        assert_eq!(payload, Payload::Unsigned(1));
        assert_eq!(used, 1);
    }

    #[test]
    fn huge_declared_length_does_not_preallocate() {
        let bytes = [0xdd, 0xff, 0xff, 0xff, 0xff];
        assert!(parse(&bytes).unwrap_err().is_malformed());
    }
}
