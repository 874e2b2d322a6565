//! Little-endian binary writer and reader
//!
//! [`DataSerializer`] grows a byte buffer; [`DataDeserializer`] walks a byte
//! slice and fails instead of reading past its end.

use thiserror::Error;

/// Errors raised while encoding or decoding binary data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the layout was complete
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },

    /// A length does not fit its prefix
    #[error("Length {len} exceeds the maximum of {max}")]
    LengthOverflow {
        /// Length that was requested
        len: usize,
        /// Largest length the prefix can hold
        max: usize,
    },

    /// A string field was not valid UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A tag byte named no known kind
    #[error("Unknown type tag {0}")]
    UnknownTag(u8),
}

/// Growable little-endian byte writer
#[derive(Debug, Default, Clone)]
pub struct DataSerializer {
    data: Vec<u8>,
}

impl DataSerializer {
    /// Create an empty serializer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    /// Append a byte
    pub fn add_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Append a little-endian u16
    pub fn add_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian u32
    pub fn add_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian i32
    pub fn add_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian f32
    pub fn add_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a sequence of f32 values
    pub fn add_f32_slice(&mut self, values: &[f32]) {
        for v in values {
            self.add_f32(*v);
        }
    }

    /// Append a boolean as a single byte
    pub fn add_bool(&mut self, value: bool) {
        self.add_u8(u8::from(value));
    }

    /// Append a string with a u16 length prefix
    pub fn add_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = u16::try_from(value.len()).map_err(|_| CodecError::LengthOverflow {
            len: value.len(),
            max: usize::from(u16::MAX),
        })?;
        self.add_u16(len);
        self.data.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Append a string with a u8 length prefix
    pub fn add_short_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.add_u8(short_len(value.len())?);
        self.data.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Append raw bytes with no prefix
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Number of bytes written so far
    pub fn bytes_filled(&self) -> usize {
        self.data.len()
    }

    /// Discard everything written, keeping the allocation
    pub fn reset_fill(&mut self) {
        self.data.clear();
    }

    /// Written bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the serializer and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Convert a count to a u8 prefix
pub fn short_len(len: usize) -> Result<u8, CodecError> {
    u8::try_from(len).map_err(|_| CodecError::LengthOverflow {
        len,
        max: usize::from(u8::MAX),
    })
}

/// Cursor reading little-endian values from a byte slice
#[derive(Debug, Clone)]
pub struct DataDeserializer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataDeserializer<'a> {
    /// Start reading at the beginning of `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed
    pub const fn bytes_left(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Bytes consumed so far
    pub const fn bytes_read(&self) -> usize {
        self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.bytes_left();
        if needed > remaining {
            return Err(CodecError::UnexpectedEnd { needed, remaining });
        }
        let slice = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a byte
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a little-endian u16
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian u32
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian i32
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian f32
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read `N` consecutive f32 values
    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N], CodecError> {
        let mut out = [0.0; N];
        for slot in &mut out {
            *slot = self.read_f32()?;
        }
        Ok(out)
    }

    /// Read a single-byte boolean; any nonzero byte is true
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a string with a u16 length prefix
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = usize::from(self.read_u16()?);
        self.read_utf8(len)
    }

    /// Read a string with a u8 length prefix
    pub fn read_short_string(&mut self) -> Result<String, CodecError> {
        let len = usize::from(self.read_u8()?);
        self.read_utf8(len)
    }

    /// Read `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take(len)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, CodecError> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}
