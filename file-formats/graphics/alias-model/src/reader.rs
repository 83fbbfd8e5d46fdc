//! Bounds-checked access to model file bytes
//!
//! Loaders never index the raw buffer directly. Every header offset and count
//! goes through [`ModelData`], which checks the requested region against the
//! buffer length (with overflow-checked arithmetic) and reports violations as
//! [`AliasError::OutOfBounds`] naming the model and the region.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use glam::Vec3;

use crate::error::{AliasError, Result};

/// Read helpers for the little-endian records shared by all formats
pub(crate) trait ReadAliasExt: Read {
    fn read_vec3(&mut self) -> io::Result<Vec3> {
        let x = self.read_f32::<LittleEndian>()?;
        let y = self.read_f32::<LittleEndian>()?;
        let z = self.read_f32::<LittleEndian>()?;
        Ok(Vec3::new(x, y, z))
    }

    fn read_f32_array<const N: usize>(&mut self) -> io::Result<[f32; N]> {
        let mut out = [0.0; N];
        self.read_f32_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }

    /// Fixed-size, NUL-padded name field
    fn read_name(&mut self, len: usize) -> io::Result<String> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(c_string(&buf))
    }
}

impl<R: Read + ?Sized> ReadAliasExt for R {}

/// Text up to the first NUL byte, decoded lossily
pub(crate) fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// A model's bytes together with its name, for error reporting
#[derive(Clone, Copy)]
pub(crate) struct ModelData<'a> {
    name: &'a str,
    bytes: &'a [u8],
}

impl<'a> ModelData<'a> {
    pub fn new(name: &'a str, bytes: &'a [u8]) -> Self {
        Self { name, bytes }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Borrow `size` bytes at `offset`
    pub fn region(&self, what: &'static str, offset: usize, size: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(size)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| AliasError::OutOfBounds {
                model: self.name.to_string(),
                what,
                offset,
                size,
                len: self.bytes.len(),
            })
    }

    /// Borrow a table of `count` records of `record_size` bytes at `offset`
    pub fn table(
        &self,
        what: &'static str,
        offset: usize,
        count: usize,
        record_size: usize,
    ) -> Result<&'a [u8]> {
        let size = count
            .checked_mul(record_size)
            .ok_or_else(|| AliasError::OutOfBounds {
                model: self.name.to_string(),
                what,
                offset,
                size: usize::MAX,
                len: self.bytes.len(),
            })?;
        self.region(what, offset, size)
    }

    /// Convert a signed file offset, rejecting negative values
    pub fn offset(&self, what: &'static str, value: i64) -> Result<usize> {
        usize::try_from(value).map_err(|_| AliasError::OutOfBounds {
            model: self.name.to_string(),
            what,
            offset: 0,
            size: 0,
            len: self.bytes.len(),
        })
    }

    /// Check a header count against the half-open range `[min, max)`
    pub fn count(&self, field: &'static str, value: i64, min: i64, max: i64) -> Result<usize> {
        if value < min || value >= max {
            return Err(AliasError::InvalidCount {
                model: self.name.to_string(),
                field,
                value,
                min,
                max,
            });
        }
        self.offset(field, value)
    }

    /// Sequential reader starting at `offset`
    pub fn stream(&self, offset: usize) -> ByteStream<'a> {
        ByteStream {
            data: *self,
            pos: offset,
        }
    }

    pub fn validation(&self, reason: impl Into<String>) -> AliasError {
        AliasError::Validation {
            model: self.name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_reference(&self, field: &'static str, value: i64, max: i64) -> AliasError {
        AliasError::InvalidReference {
            model: self.name.to_string(),
            field,
            value,
            max,
        }
    }
}

/// Forward-only reader for formats laid out as consecutive variable blocks
pub(crate) struct ByteStream<'a> {
    data: ModelData<'a>,
    pos: usize,
}

impl<'a> ByteStream<'a> {
    /// Take the next `size` bytes
    pub fn take(&mut self, what: &'static str, size: usize) -> Result<&'a [u8]> {
        let region = self.data.region(what, self.pos, size)?;
        self.pos += size;
        Ok(region)
    }

    /// Take `count` records of `record_size` bytes
    pub fn take_table(
        &mut self,
        what: &'static str,
        count: usize,
        record_size: usize,
    ) -> Result<&'a [u8]> {
        let region = self.data.table(what, self.pos, count, record_size)?;
        self.pos += region.len();
        Ok(region)
    }

    pub fn read_i32(&mut self, what: &'static str) -> Result<i32> {
        let mut region = self.take(what, 4)?;
        Ok(region.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self, what: &'static str) -> Result<f32> {
        let mut region = self.take(what, 4)?;
        Ok(region.read_f32::<LittleEndian>()?)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}
