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

//! PE/COFF image handling: locate the CLI metadata inside a WinMD file

use crate::error::{MetadataError, MetadataResult};
use crate::reader::ByteReader;

const DOS_MAGIC: u16 = 0x5A4D; // "MZ"
const PE_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
const PE32_MAGIC: u16 = 0x010B;
const PE32_PLUS_MAGIC: u16 = 0x020B;
const CLI_HEADER_DIRECTORY: usize = 14;
pub(crate) const METADATA_MAGIC: u32 = 0x424A_5342; // "BSJB"

/// A section header, reduced to what RVA translation needs
#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_offset: u32,
}

impl Section {
    fn contains(&self, rva: u32) -> bool {
        let size = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && rva - self.virtual_address < size
    }
}

/// Return the metadata blob of `image`.
///
/// Accepts either a PE image carrying a CLI header or a bare metadata blob
/// that starts directly with the `BSJB` root signature.
pub fn metadata_slice(image: &[u8]) -> MetadataResult<&[u8]> {
    let mut reader = ByteReader::new(image);
    let lead = reader.u32()?;
    if lead == METADATA_MAGIC {
        return Ok(image);
    }
    if lead as u16 != DOS_MAGIC {
        return Err(MetadataError::InvalidImage("missing MZ or BSJB signature".to_string()));
    }

    reader.seek(0x3C)?;
    let pe_offset = reader.u32()? as usize;
    reader.seek(pe_offset)?;
    if reader.u32()? != PE_SIGNATURE {
        return Err(MetadataError::InvalidImage("missing PE signature".to_string()));
    }

    // COFF file header
    let _machine = reader.u16()?;
    let section_count = reader.u16()?;
    reader.skip(12)?;
    let optional_header_size = reader.u16()? as usize;
    let _characteristics = reader.u16()?;

    let optional_header = reader.position();
    let directories = match reader.u16()? {
        PE32_MAGIC => optional_header + 96,
        PE32_PLUS_MAGIC => optional_header + 112,
        other => return Err(MetadataError::InvalidImage(format!("unknown optional header magic {other:#06x}"))),
    };
    let directory_count_offset = directories - 4;
    reader.seek(directory_count_offset)?;
    let directory_count = reader.u32()? as usize;
    if directory_count <= CLI_HEADER_DIRECTORY {
        return Err(MetadataError::InvalidImage("image has no CLI header directory".to_string()));
    }
    reader.seek(directories + CLI_HEADER_DIRECTORY * 8)?;
    let cli_rva = reader.u32()?;
    let cli_size = reader.u32()?;
    if cli_rva == 0 || cli_size == 0 {
        return Err(MetadataError::InvalidImage("image is not a CLI image".to_string()));
    }

    reader.seek(optional_header + optional_header_size)?;
    let mut sections = Vec::with_capacity(section_count as usize);
    for _ in 0..section_count {
        reader.skip(8)?; // name
        let virtual_size = reader.u32()?;
        let virtual_address = reader.u32()?;
        let raw_size = reader.u32()?;
        let raw_offset = reader.u32()?;
        reader.skip(16)?;
        sections.push(Section {
            virtual_address,
            virtual_size,
            raw_size,
            raw_offset,
        });
    }

    let cli_offset = rva_to_offset(&sections, cli_rva)?;
    let mut cli = ByteReader::at(image, cli_offset)?;
    let _cb = cli.u32()?;
    let _runtime_version = cli.u32()?;
    let metadata_rva = cli.u32()?;
    let metadata_size = cli.u32()? as usize;

    let metadata_offset = rva_to_offset(&sections, metadata_rva)?;
    let mut metadata = ByteReader::at(image, metadata_offset)?;
    metadata.bytes(metadata_size)
}

fn rva_to_offset(sections: &[Section], rva: u32) -> MetadataResult<usize> {
    sections
        .iter()
        .find(|section| section.contains(rva))
        .map(|section| (rva - section.virtual_address + section.raw_offset) as usize)
        .ok_or_else(|| MetadataError::InvalidImage(format!("RVA {rva:#x} is not inside any section")))
}
