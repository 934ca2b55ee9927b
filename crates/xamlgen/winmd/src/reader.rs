// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Bounds-checked little-endian cursor over metadata bytes

use crate::error::{MetadataError, MetadataResult};

/// Cursor over a byte slice that never reads past the end
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> MetadataResult<Self> {
        if offset > data.len() {
            return Err(MetadataError::UnexpectedEof {
                offset,
                needed: 0,
                available: data.len(),
            });
        }
        Ok(Self { data, position: offset })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move the cursor to an absolute offset
    pub fn seek(&mut self, offset: usize) -> MetadataResult<()> {
        *self = Self::at(self.data, offset)?;
        Ok(())
    }

    /// Advance the cursor by `count` bytes
    pub fn skip(&mut self, count: usize) -> MetadataResult<()> {
        self.bytes(count).map(|_| ())
    }

    /// Read `count` raw bytes
    pub fn bytes(&mut self, count: usize) -> MetadataResult<&'a [u8]> {
        let end = self.position.checked_add(count).filter(|end| *end <= self.data.len()).ok_or(MetadataError::UnexpectedEof {
            offset: self.position,
            needed: count,
            available: self.remaining(),
        })?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> MetadataResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> MetadataResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> MetadataResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> MetadataResult<u64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a 2 or 4 byte index, widening to u32
    pub fn index(&mut self, width: usize) -> MetadataResult<u32> {
        match width {
            2 => self.u16().map(u32::from),
            _ => self.u32(),
        }
    }

    /// Read an ECMA-335 compressed unsigned integer (II.23.2)
    pub fn compressed_u32(&mut self) -> MetadataResult<u32> {
        let first = self.u8()?;
        if first & 0x80 == 0 {
            return Ok(u32::from(first));
        }
        if first & 0xC0 == 0x80 {
            let second = self.u8()?;
            return Ok((u32::from(first & 0x3F) << 8) | u32::from(second));
        }
        if first & 0xE0 == 0xC0 {
            let rest = self.bytes(3)?;
            return Ok((u32::from(first & 0x1F) << 24) | (u32::from(rest[0]) << 16) | (u32::from(rest[1]) << 8) | u32::from(rest[2]));
        }
        Err(MetadataError::InvalidSignature(format!("bad compressed integer lead byte {first:#04x} at offset {}", self.position - 1)))
    }

    /// Read a null-terminated string, consuming the terminator
    pub fn null_terminated(&mut self) -> MetadataResult<&'a str> {
        let rest = &self.data[self.position..];
        let len = rest.iter().position(|b| *b == 0).ok_or(MetadataError::UnexpectedEof {
            offset: self.position,
            needed: rest.len() + 1,
            available: rest.len(),
        })?;
        let text = std::str::from_utf8(&rest[..len])?;
        self.position += len + 1;
        Ok(text)
    }

    /// Advance to the next multiple of four relative to `base`
    pub fn align4(&mut self, base: usize) -> MetadataResult<()> {
        let relative = self.position - base;
        let padding = (4 - relative % 4) % 4;
        self.skip(padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u16().unwrap(), 0x0201);
        assert_eq!(reader.u32().unwrap(), 0x0605_0403);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_compressed_integers() {
        // Examples from ECMA-335 II.23.2
        let cases: &[(&[u8], u32)] = &[
            (&[0x03], 0x03),
            (&[0x7F], 0x7F),
            (&[0x80, 0x80], 0x80),
            (&[0xAE, 0x57], 0x2E57),
            (&[0xBF, 0xFF], 0x3FFF),
            (&[0xC0, 0x00, 0x40, 0x00], 0x4000),
            (&[0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];
        for (bytes, expected) in cases {
            let mut reader = ByteReader::new(bytes);
            assert_eq!(reader.compressed_u32().unwrap(), *expected);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_compressed_integer_rejects_bad_lead_byte() {
        let mut reader = ByteReader::new(&[0xFF]);
        assert!(matches!(reader.compressed_u32(), Err(MetadataError::InvalidSignature(_))));
    }

    #[test]
    fn test_read_past_end_is_an_error() {
        let mut reader = ByteReader::new(&[0x01]);
        let err = reader.u32().unwrap_err();
        assert!(matches!(err, MetadataError::UnexpectedEof { offset: 0, needed: 4, available: 1 }));
    }

    #[test]
    fn test_null_terminated_and_alignment() {
        let data = b"#~\0\0next";
        let mut reader = ByteReader::new(data);
        assert_eq!(reader.null_terminated().unwrap(), "#~");
        reader.align4(0).unwrap();
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.bytes(4).unwrap(), b"next");
    }
}
