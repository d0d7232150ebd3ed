//! A flat, positional primitive stream in the shape of an Android `Parcel`.
//!
//! Every primitive is little-endian and 4-byte aligned. Strings are written as
//! an `i32` count of UTF-16 code units followed by the units, a NUL unit and
//! padding; a count of `-1` marks an absent string, which is distinct from the
//! empty string.

use crate::error::{MalformedRecordError, ParcelResult};
use byteorder::{ByteOrder, LittleEndian};

const NULL_STRING_LENGTH: i32 = -1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parcel {
    data: Vec<u8>,
    pos: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Parcel::default()
    }

    /// Wraps bytes received from another process; reading starts at offset 0.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Parcel {
            data: bytes.to_vec(),
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn write_i32(&mut self, value: i32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, value);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_i32(if value { 1 } else { 0 });
    }

    pub fn write_string(&mut self, value: Option<&str>) {
        let Some(text) = value else {
            self.write_i32(NULL_STRING_LENGTH);
            return;
        };
        let units: Vec<u16> = text.encode_utf16().collect();
        self.write_i32(units.len() as i32);
        let mut bytes = [0u8; 2];
        for unit in units {
            LittleEndian::write_u16(&mut bytes, unit);
            self.data.extend_from_slice(&bytes);
        }
        self.data.extend_from_slice(&[0, 0]);
        self.pad();
    }

    pub fn read_i32(&mut self) -> ParcelResult<i32> {
        let bytes = self.take(4, "i32")?;
        Ok(LittleEndian::read_i32(bytes))
    }

    /// Any non-zero value reads as `true`.
    pub fn read_bool(&mut self) -> ParcelResult<bool> {
        Ok(self.read_i32()? != 0)
    }

    pub fn read_string(&mut self) -> ParcelResult<Option<String>> {
        let start = self.pos;
        let length = self.read_i32()?;
        if length == NULL_STRING_LENGTH {
            return Ok(None);
        }
        if length < 0 {
            return Err(MalformedRecordError::InvalidStringLength {
                position: start,
                length,
            });
        }
        let unit_count = length as usize;
        let byte_len = unit_count
            .checked_add(1)
            .and_then(|units| units.checked_mul(2))
            .ok_or(MalformedRecordError::InvalidStringLength {
                position: start,
                length,
            })?;
        let payload = self.take(byte_len, "string")?;
        let units: Vec<u16> = payload[..unit_count * 2]
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();
        let text = String::from_utf16(&units)
            .map_err(|_| MalformedRecordError::InvalidString { position: start })?;
        self.skip_padding();
        Ok(Some(text))
    }

    fn take(&mut self, len: usize, wanted: &'static str) -> ParcelResult<&[u8]> {
        if self.remaining() < len {
            return Err(MalformedRecordError::Truncated {
                position: self.pos,
                wanted,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    fn pad(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    // A writer always pads, but a sender that trims the final pad is tolerated.
    fn skip_padding(&mut self) {
        let aligned = (self.pos + 3) & !3;
        self.pos = aligned.min(self.data.len());
    }
}
