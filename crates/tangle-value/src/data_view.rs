//! Untyped byte-range views over array buffers.

use crate::array_buffer::{ArrayBufferData, BufferError};
use crate::shared::Shared;

/// Backing data of a data-view value.
#[derive(Debug)]
pub struct DataViewData {
    buffer: Shared<ArrayBufferData>,
    byte_offset: usize,
    byte_length: usize,
}

impl DataViewData {
    /// A view of `byte_length` bytes starting at `byte_offset`.
    pub fn new(
        buffer: Shared<ArrayBufferData>,
        byte_offset: usize,
        byte_length: usize,
    ) -> Result<Self, BufferError> {
        let capacity = buffer.read().byte_length();
        if byte_offset + byte_length > capacity {
            return Err(BufferError::OutOfBounds {
                offset: byte_offset,
                byte_length,
                capacity,
            });
        }
        Ok(Self {
            buffer,
            byte_offset,
            byte_length,
        })
    }

    /// Byte offset into the backing buffer.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Length of the view in bytes.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The backing buffer handle.
    pub fn buffer(&self) -> Shared<ArrayBufferData> {
        self.buffer.clone()
    }

    /// Read one byte, view-relative.
    pub fn get_u8(&self, index: usize) -> Option<u8> {
        if index >= self.byte_length {
            return None;
        }
        Some(self.buffer.read().bytes()[self.byte_offset + index])
    }

    /// Write one byte, view-relative. Returns whether the index was in range.
    pub fn set_u8(&self, index: usize, value: u8) -> bool {
        if index >= self.byte_length {
            return false;
        }
        self.buffer.write().bytes_mut()[self.byte_offset + index] = value;
        true
    }

    /// Snapshot the viewed bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let guard = self.buffer.read();
        guard.bytes()[self.byte_offset..self.byte_offset + self.byte_length].to_vec()
    }

    /// Copy this view; deep duplicates the backing bytes, shallow shares them.
    pub fn duplicate(&self, deep: bool) -> Self {
        let buffer = if deep {
            Shared::new(self.buffer.read().duplicate())
        } else {
            self.buffer.clone()
        };
        Self {
            buffer,
            byte_offset: self.byte_offset,
            byte_length: self.byte_length,
        }
    }
}
