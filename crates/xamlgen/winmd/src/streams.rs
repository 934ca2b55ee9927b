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

//! Metadata root, stream headers and heaps (ECMA-335 II.24)

use crate::error::{MetadataError, MetadataResult};
use crate::pe::METADATA_MAGIC;
use crate::reader::ByteReader;

/// The streams of one metadata blob
#[derive(Debug, Clone, Copy)]
pub struct MetadataStreams<'a> {
    /// Runtime version string from the metadata root, e.g. `WindowsRuntime 1.4`
    pub version: &'a str,
    pub tables: &'a [u8],
    pub strings: StringHeap<'a>,
    pub blobs: BlobHeap<'a>,
    pub guids: &'a [u8],
}

impl<'a> MetadataStreams<'a> {
    /// Parse the metadata root at the start of `metadata`
    pub fn parse(metadata: &'a [u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(metadata);
        let magic = reader.u32()?;
        if magic != METADATA_MAGIC {
            return Err(MetadataError::BadMagic(magic));
        }
        let _major = reader.u16()?;
        let _minor = reader.u16()?;
        let _reserved = reader.u32()?;
        let version_length = reader.u32()? as usize;
        let version_bytes = reader.bytes(version_length)?;
        let version_end = version_bytes.iter().position(|b| *b == 0).unwrap_or(version_bytes.len());
        let version = std::str::from_utf8(&version_bytes[..version_end])?;
        let _flags = reader.u16()?;
        let stream_count = reader.u16()?;

        let mut tables = None;
        let mut strings: &[u8] = &[];
        let mut blobs: &[u8] = &[];
        let mut guids: &[u8] = &[];

        for _ in 0..stream_count {
            let offset = reader.u32()? as usize;
            let size = reader.u32()? as usize;
            let name_start = reader.position();
            let name = reader.null_terminated()?;
            reader.align4(name_start)?;

            let data = ByteReader::at(metadata, offset)?.bytes(size)?;
            match name {
                "#~" | "#-" => tables = Some(data),
                "#Strings" => strings = data,
                "#Blob" => blobs = data,
                "#GUID" => guids = data,
                _ => {} // #US and vendor streams carry nothing we read
            }
        }

        Ok(Self {
            version,
            tables: tables.ok_or(MetadataError::MissingStream("#~"))?,
            strings: StringHeap { data: strings },
            blobs: BlobHeap { data: blobs },
            guids,
        })
    }
}

/// The `#Strings` heap: null-terminated UTF-8 strings addressed by byte offset
#[derive(Debug, Clone, Copy)]
pub struct StringHeap<'a> {
    data: &'a [u8],
}

impl<'a> StringHeap<'a> {
    pub fn get(&self, index: u32) -> MetadataResult<&'a str> {
        // Index 0 is the empty string even for an empty heap
        if index == 0 && self.data.is_empty() {
            return Ok("");
        }
        let mut reader = ByteReader::at(self.data, index as usize).map_err(|_| MetadataError::InvalidHeapIndex { heap: "#Strings", index })?;
        reader.null_terminated()
    }
}

/// The `#Blob` heap: length-prefixed byte runs addressed by byte offset
#[derive(Debug, Clone, Copy)]
pub struct BlobHeap<'a> {
    data: &'a [u8],
}

impl<'a> BlobHeap<'a> {
    pub fn get(&self, index: u32) -> MetadataResult<&'a [u8]> {
        if index == 0 && self.data.is_empty() {
            return Ok(&[]);
        }
        let mut reader = ByteReader::at(self.data, index as usize).map_err(|_| MetadataError::InvalidHeapIndex { heap: "#Blob", index })?;
        let length = reader.compressed_u32()? as usize;
        reader.bytes(length)
    }
}
