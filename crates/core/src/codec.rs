//! Big-endian byte codec shared by every boxgraph encoding.
//!
//! Layout conventions:
//! - integers and floats are big-endian
//! - strings are an `int32` byte length followed by UTF-8 bytes
//! - blobs are an `int32` byte length followed by raw bytes
//! - uuids are their 16 raw bytes

use byteorder::{BigEndian, ByteOrder};
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};

// =============================================================================
// Output
// =============================================================================

/// Growable output buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteOutput {
    buf: Vec<u8>,
}

impl ByteOutput {
    /// Create an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an output with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write an unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    /// Write a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_i32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    /// Write a 32-bit float.
    pub fn write_f32(&mut self, value: f32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_f32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a length-prefixed byte blob.
    pub fn write_blob(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Write raw bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a uuid as 16 raw bytes.
    pub fn write_uuid(&mut self, uuid: &Uuid) {
        self.buf.extend_from_slice(uuid.as_bytes());
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the output and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_len(&mut self, len: usize) {
        // Payloads larger than i32::MAX cannot be represented in the format.
        let len = i32::try_from(len).unwrap_or(i32::MAX);
        self.write_i32(len);
    }
}

// =============================================================================
// Input
// =============================================================================

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteInput<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Check if the cursor reached the end.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the input. Does not advance the cursor.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read a boolean byte. Any non-zero value is `true`.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a signed 32-bit integer.
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Read a 32-bit float.
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a length-prefixed blob, borrowing from the input.
    pub fn read_blob(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Read a 16-byte uuid.
    pub fn read_uuid(&mut self) -> CodecResult<Uuid> {
        let bytes = self.take(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    /// Read a length prefix and validate it is non-negative.
    pub fn read_len(&mut self) -> CodecResult<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}
