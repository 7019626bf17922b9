//! Binary serialization primitives shared by encoder and decoder.
//!
//! Wire conventions:
//! - fixed-width integers are little-endian
//! - booleans are a single byte (zero = false)
//! - strings are a u32 byte length followed by UTF-8 bytes
//! - arrays are a u32 element count followed by the elements
//! - objects are encoded field by field with no length prefix

use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// Decoding failures. A malformed packet aborts processing of that packet
/// only; the connection it arrived on stays open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Types that can write themselves into a scratch buffer.
pub trait Encode {
    fn encode(&self, w: &mut Writer<'_>);
}

/// Types that can be reconstructed from a received buffer.
pub trait Decode: Sized {
    fn decode(r: &mut Reader<'_>) -> CodecResult<Self>;
}

/// Append-only writer over a caller-supplied scratch buffer.
///
/// Callers size the scratch buffer ahead of the largest single message;
/// history dumps are the largest.
pub struct Writer<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_string(&mut self, value: &str) {
        self.buf.put_u32_le(value.len() as u32);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn write_array<T: Encode>(&mut self, values: &[T]) {
        self.buf.put_u32_le(values.len() as u32);
        for value in values {
            value.encode(self);
        }
    }

    /// Delegates to the type's own field-level encoder, no length prefix.
    pub fn write_object<T: Encode>(&mut self, value: &T) {
        value.encode(self);
    }
}

/// Bounds-checked reader over a received packet buffer.
///
/// Not resilient to truncation beyond the explicit checks here: any read
/// past the buffer end fails with [`CodecError::Malformed`].
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(CodecError::Malformed("read past end of buffer"));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_u32()? as usize;
        if len > self.buf.len() {
            return Err(CodecError::Malformed(
                "string length exceeds remaining buffer",
            ));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CodecError::Malformed("string is not valid UTF-8"))
    }

    pub fn read_array<T: Decode>(&mut self) -> CodecResult<Vec<T>> {
        let count = self.read_u32()? as usize;
        // Every encodable element occupies at least one byte, so a count
        // larger than the remaining buffer cannot be satisfied.
        if count > self.buf.len() {
            return Err(CodecError::Malformed(
                "array count exceeds remaining buffer",
            ));
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(T::decode(self)?);
        }
        Ok(values)
    }

    pub fn read_object<T: Decode>(&mut self) -> CodecResult<T> {
        T::decode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let mut buf = BytesMut::new();
        let mut w = Writer::new(&mut buf);
        w.write_string("hello");
        w.write_string("");

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_string().unwrap(), "hello");
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn string_length_is_byte_count_not_chars() {
        let mut buf = BytesMut::new();
        Writer::new(&mut buf).write_string("héllo");

        // "héllo" is 5 chars but 6 bytes
        assert_eq!(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), 6);

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_string().unwrap(), "héllo");
    }

    #[test]
    fn string_declared_length_past_end_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(100);
        buf.put_slice(b"short");

        let mut r = Reader::new(&buf);
        assert!(matches!(r.read_string(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn string_invalid_utf8_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_slice(&[0xFF, 0xFE]);

        let mut r = Reader::new(&buf);
        assert!(matches!(r.read_string(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn integers_are_little_endian() {
        let mut buf = BytesMut::new();
        let mut w = Writer::new(&mut buf);
        w.write_u16(0x0102);
        w.write_u32(0x0304_0506);

        assert_eq!(&buf[..], &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.read_u32().unwrap(), 0x0304_0506);
    }

    #[test]
    fn bool_roundtrip() {
        let mut buf = BytesMut::new();
        let mut w = Writer::new(&mut buf);
        w.write_bool(true);
        w.write_bool(false);

        let mut r = Reader::new(&buf);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
    }

    #[test]
    fn read_past_end_is_malformed() {
        let mut r = Reader::new(&[0x01]);
        assert!(matches!(r.read_u32(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn array_count_past_end_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1_000_000);

        let mut r = Reader::new(&buf);
        assert!(matches!(
            r.read_array::<crate::types::UserInfo>(),
            Err(CodecError::Malformed(_))
        ));
    }
}
