//! Thin layer over `rmp::encode` that writes into an owned buffer and reports failures as
//! [PackError].

use rmp::encode;

use crate::error::PackError;

pub type Result<T, E = PackError> = std::result::Result<T, E>;

fn io<E: Into<std::io::Error>>(err: E) -> PackError {
    PackError::Write(err.into())
}

fn wire_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| PackError::TooLarge { len })
}

/// Growable output buffer of MessagePack bytes.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn nil(&mut self) -> Result<()> {
        encode::write_nil(&mut self.buf).map_err(io)
    }

    pub fn boolean(&mut self, value: bool) -> Result<()> {
        encode::write_bool(&mut self.buf, value).map_err(io)
    }

    pub fn unsigned(&mut self, value: u64) -> Result<()> {
        encode::write_uint(&mut self.buf, value).map_err(io)?;
        Ok(())
    }

    pub fn signed(&mut self, value: i64) -> Result<()> {
        encode::write_sint(&mut self.buf, value).map_err(io)?;
        Ok(())
    }

    /// Writes an exact integer with the smallest encoding, non negative numbers always use the
    /// unsigned family. Anything outside of `i64::MIN..=u64::MAX` overflows.
    pub fn integer(&mut self, value: i128) -> Result<()> {
        if let Ok(unsigned) = u64::try_from(value) {
            self.unsigned(unsigned)
        } else if let Ok(signed) = i64::try_from(value) {
            self.signed(signed)
        } else {
            Err(PackError::Overflow { value })
        }
    }

    pub fn f32(&mut self, value: f32) -> Result<()> {
        encode::write_f32(&mut self.buf, value).map_err(io)
    }

    pub fn f64(&mut self, value: f64) -> Result<()> {
        encode::write_f64(&mut self.buf, value).map_err(io)
    }

    /// UTF-8 string with a byte length prefix.
    pub fn str(&mut self, value: &str) -> Result<()> {
        wire_len(value.len())?;
        encode::write_str(&mut self.buf, value).map_err(io)
    }

    pub fn bin(&mut self, value: &[u8]) -> Result<()> {
        wire_len(value.len())?;
        encode::write_bin(&mut self.buf, value).map_err(io)
    }

    pub fn array_len(&mut self, len: usize) -> Result<()> {
        encode::write_array_len(&mut self.buf, wire_len(len)?).map_err(io)?;
        Ok(())
    }

    pub fn map_len(&mut self, len: usize) -> Result<()> {
        encode::write_map_len(&mut self.buf, wire_len(len)?).map_err(io)?;
        Ok(())
    }

    pub fn ext(&mut self, code: i8, data: &[u8]) -> Result<()> {
        encode::write_ext_meta(&mut self.buf, wire_len(data.len())?, code).map_err(io)?;
        self.buf.extend_from_slice(data);
        Ok(())
    }
}
