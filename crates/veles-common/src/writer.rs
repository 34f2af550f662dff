//! Binary writer producing little-endian byte buffers.
//!
//! This module provides [`BinaryWriter`], the encode-side counterpart to
//! [`BinaryReader`](crate::BinaryReader). On top of plain scalar writes it
//! supports placeholder slots: a fixed-size region is reserved at the
//! current position and patched with its final value later, once the data
//! it points at has been laid out.

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::{Error, Result};

/// A binary writer that appends little-endian data to a growable buffer.
///
/// # Example
///
/// ```
/// use veles_common::BinaryWriter;
///
/// let mut writer = BinaryWriter::new();
/// let slot = writer.reserve_u32().unwrap();
/// writer.write_u16(7).unwrap();
/// writer.patch_u32(slot, writer.position() as u32).unwrap();
///
/// assert_eq!(writer.into_bytes(), vec![6, 0, 0, 0, 7, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    /// Create a new empty writer.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current write position (always the end of the buffer).
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Consume the writer and return the produced buffer.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Append raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value).map_err(Error::Io)
    }

    /// Write a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.buf.write_i8(value).map_err(Error::Io)
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a little-endian i16.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.buf.write_i16::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a little-endian u64.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.buf.write_u64::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a little-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(value).map_err(Error::Io)
    }

    /// Write a null-terminated UTF-8 string.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    /// Write a struct using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) -> Result<()> {
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Reserve a 4-byte placeholder at the current position.
    ///
    /// Returns the slot position to pass to [`patch_u32`](Self::patch_u32).
    pub fn reserve_u32(&mut self) -> Result<usize> {
        let slot = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        Ok(slot)
    }

    /// Patch a previously reserved 4-byte slot.
    pub fn patch_u32(&mut self, slot: usize, value: u32) -> Result<()> {
        let end = slot.checked_add(4).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                self.buf[slot..end].copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
            None => Err(Error::InvalidPatchSlot {
                slot,
                len: self.buf.len(),
            }),
        }
    }

    /// Pad with zero bytes until the position is a multiple of `alignment`.
    pub fn align_to(&mut self, alignment: usize) -> Result<()> {
        debug_assert!(alignment.is_power_of_two());
        while self.buf.len() % alignment != 0 {
            self.buf.push(0);
        }
        Ok(())
    }
}
