//! Length-delimited field encoding used by the host ledger's binary codec.
//!
//! A field is `uvarint(number << 3 | wire_type)` followed by either a uvarint
//! (wire type 0) or `uvarint(len) || bytes` (wire type 2).

use super::CodecError;

pub const WIRE_VARINT: u8 = 0;
pub const WIRE_BYTES: u8 = 2;

pub fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

pub fn put_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    put_uvarint(buf, (u64::from(field) << 3) | u64::from(WIRE_VARINT));
    put_uvarint(buf, value);
}

pub fn put_bytes_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_uvarint(buf, (u64::from(field) << 3) | u64::from(WIRE_BYTES));
    put_uvarint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// A decoded field value
#[derive(Debug, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

/// Sequential field reader over a byte slice
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_uvarint(&mut self) -> Result<u64, CodecError> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or_else(|| CodecError::MalformedAggregate("truncated varint".into()))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::MalformedAggregate("varint overflow".into()))
    }

    /// Read the next `(field number, value)` pair
    pub fn next_field(&mut self) -> Result<(u32, FieldValue<'a>), CodecError> {
        let tag = self.read_uvarint()?;
        let field = (tag >> 3) as u32;
        match (tag & 0x7) as u8 {
            WIRE_VARINT => Ok((field, FieldValue::Varint(self.read_uvarint()?))),
            WIRE_BYTES => {
                let len = self.read_uvarint()? as usize;
                let end = self
                    .pos
                    .checked_add(len)
                    .filter(|end| *end <= self.data.len())
                    .ok_or_else(|| {
                        CodecError::MalformedAggregate(format!(
                            "field {} length {} exceeds input",
                            field, len
                        ))
                    })?;
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok((field, FieldValue::Bytes(bytes)))
            }
            other => Err(CodecError::MalformedAggregate(format!(
                "unsupported wire type {} for field {}",
                other, field
            ))),
        }
    }
}
