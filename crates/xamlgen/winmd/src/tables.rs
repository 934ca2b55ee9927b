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

//! The `#~` table stream: schema, row counts and row access (ECMA-335 II.22, II.24.2.6)
//!
//! Every table present in a file is laid out back to back, so all of them have
//! to be sized even though only a handful are decoded.

use crate::error::{MetadataError, MetadataResult};
use crate::reader::ByteReader;

/// Identifier of a metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableId {
    Module = 0x00,
    TypeRef,
    TypeDef,
    FieldPtr,
    Field,
    MethodPtr,
    MethodDef,
    ParamPtr,
    Param,
    InterfaceImpl,
    MemberRef,
    Constant,
    CustomAttribute,
    FieldMarshal,
    DeclSecurity,
    ClassLayout,
    FieldLayout,
    StandAloneSig,
    EventMap,
    EventPtr,
    Event,
    PropertyMap,
    PropertyPtr,
    Property,
    MethodSemantics,
    MethodImpl,
    ModuleRef,
    TypeSpec,
    ImplMap,
    FieldRva,
    EncLog,
    EncMap,
    Assembly,
    AssemblyProcessor,
    AssemblyOs,
    AssemblyRef,
    AssemblyRefProcessor,
    AssemblyRefOs,
    File,
    ExportedType,
    ManifestResource,
    NestedClass,
    GenericParam,
    MethodSpec,
    GenericParamConstraint,
}

/// Number of tables defined by ECMA-335
pub const TABLE_COUNT: usize = 0x2D;

impl TableId {
    pub const ALL: [TableId; TABLE_COUNT] = [
        TableId::Module,
        TableId::TypeRef,
        TableId::TypeDef,
        TableId::FieldPtr,
        TableId::Field,
        TableId::MethodPtr,
        TableId::MethodDef,
        TableId::ParamPtr,
        TableId::Param,
        TableId::InterfaceImpl,
        TableId::MemberRef,
        TableId::Constant,
        TableId::CustomAttribute,
        TableId::FieldMarshal,
        TableId::DeclSecurity,
        TableId::ClassLayout,
        TableId::FieldLayout,
        TableId::StandAloneSig,
        TableId::EventMap,
        TableId::EventPtr,
        TableId::Event,
        TableId::PropertyMap,
        TableId::PropertyPtr,
        TableId::Property,
        TableId::MethodSemantics,
        TableId::MethodImpl,
        TableId::ModuleRef,
        TableId::TypeSpec,
        TableId::ImplMap,
        TableId::FieldRva,
        TableId::EncLog,
        TableId::EncMap,
        TableId::Assembly,
        TableId::AssemblyProcessor,
        TableId::AssemblyOs,
        TableId::AssemblyRef,
        TableId::AssemblyRefProcessor,
        TableId::AssemblyRefOs,
        TableId::File,
        TableId::ExportedType,
        TableId::ManifestResource,
        TableId::NestedClass,
        TableId::GenericParam,
        TableId::MethodSpec,
        TableId::GenericParamConstraint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TableId::Module => "Module",
            TableId::TypeRef => "TypeRef",
            TableId::TypeDef => "TypeDef",
            TableId::FieldPtr => "FieldPtr",
            TableId::Field => "Field",
            TableId::MethodPtr => "MethodPtr",
            TableId::MethodDef => "MethodDef",
            TableId::ParamPtr => "ParamPtr",
            TableId::Param => "Param",
            TableId::InterfaceImpl => "InterfaceImpl",
            TableId::MemberRef => "MemberRef",
            TableId::Constant => "Constant",
            TableId::CustomAttribute => "CustomAttribute",
            TableId::FieldMarshal => "FieldMarshal",
            TableId::DeclSecurity => "DeclSecurity",
            TableId::ClassLayout => "ClassLayout",
            TableId::FieldLayout => "FieldLayout",
            TableId::StandAloneSig => "StandAloneSig",
            TableId::EventMap => "EventMap",
            TableId::EventPtr => "EventPtr",
            TableId::Event => "Event",
            TableId::PropertyMap => "PropertyMap",
            TableId::PropertyPtr => "PropertyPtr",
            TableId::Property => "Property",
            TableId::MethodSemantics => "MethodSemantics",
            TableId::MethodImpl => "MethodImpl",
            TableId::ModuleRef => "ModuleRef",
            TableId::TypeSpec => "TypeSpec",
            TableId::ImplMap => "ImplMap",
            TableId::FieldRva => "FieldRVA",
            TableId::EncLog => "EncLog",
            TableId::EncMap => "EncMap",
            TableId::Assembly => "Assembly",
            TableId::AssemblyProcessor => "AssemblyProcessor",
            TableId::AssemblyOs => "AssemblyOS",
            TableId::AssemblyRef => "AssemblyRef",
            TableId::AssemblyRefProcessor => "AssemblyRefProcessor",
            TableId::AssemblyRefOs => "AssemblyRefOS",
            TableId::File => "File",
            TableId::ExportedType => "ExportedType",
            TableId::ManifestResource => "ManifestResource",
            TableId::NestedClass => "NestedClass",
            TableId::GenericParam => "GenericParam",
            TableId::MethodSpec => "MethodSpec",
            TableId::GenericParamConstraint => "GenericParamConstraint",
        }
    }

    /// Column layout of this table
    pub fn schema(self) -> &'static [Column] {
        use CodedIndex as C;
        use Column::*;
        match self {
            TableId::Module => &[U16, Str, Guid, Guid, Guid],
            TableId::TypeRef => &[Coded(C::ResolutionScope), Str, Str],
            TableId::TypeDef => &[U32, Str, Str, Coded(C::TypeDefOrRef), Table(TableId::Field), Table(TableId::MethodDef)],
            TableId::FieldPtr => &[Table(TableId::Field)],
            TableId::Field => &[U16, Str, Blob],
            TableId::MethodPtr => &[Table(TableId::MethodDef)],
            TableId::MethodDef => &[U32, U16, U16, Str, Blob, Table(TableId::Param)],
            TableId::ParamPtr => &[Table(TableId::Param)],
            TableId::Param => &[U16, U16, Str],
            TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(C::TypeDefOrRef)],
            TableId::MemberRef => &[Coded(C::MemberRefParent), Str, Blob],
            // The one-byte type is followed by a padding byte
            TableId::Constant => &[U16, Coded(C::HasConstant), Blob],
            TableId::CustomAttribute => &[Coded(C::HasCustomAttribute), Coded(C::CustomAttributeType), Blob],
            TableId::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
            TableId::DeclSecurity => &[U16, Coded(C::HasDeclSecurity), Blob],
            TableId::ClassLayout => &[U16, U32, Table(TableId::TypeDef)],
            TableId::FieldLayout => &[U32, Table(TableId::Field)],
            TableId::StandAloneSig => &[Blob],
            TableId::EventMap => &[Table(TableId::TypeDef), Table(TableId::Event)],
            TableId::EventPtr => &[Table(TableId::Event)],
            TableId::Event => &[U16, Str, Coded(C::TypeDefOrRef)],
            TableId::PropertyMap => &[Table(TableId::TypeDef), Table(TableId::Property)],
            TableId::PropertyPtr => &[Table(TableId::Property)],
            TableId::Property => &[U16, Str, Blob],
            TableId::MethodSemantics => &[U16, Table(TableId::MethodDef), Coded(C::HasSemantics)],
            TableId::MethodImpl => &[Table(TableId::TypeDef), Coded(C::MethodDefOrRef), Coded(C::MethodDefOrRef)],
            TableId::ModuleRef => &[Str],
            TableId::TypeSpec => &[Blob],
            TableId::ImplMap => &[U16, Coded(C::MemberForwarded), Str, Table(TableId::ModuleRef)],
            TableId::FieldRva => &[U32, Table(TableId::Field)],
            TableId::EncLog => &[U32, U32],
            TableId::EncMap => &[U32],
            TableId::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            TableId::AssemblyProcessor => &[U32],
            TableId::AssemblyOs => &[U32, U32, U32],
            TableId::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            TableId::AssemblyRefProcessor => &[U32, Table(TableId::AssemblyRef)],
            TableId::AssemblyRefOs => &[U32, U32, U32, Table(TableId::AssemblyRef)],
            TableId::File => &[U32, Str, Blob],
            TableId::ExportedType => &[U32, U32, Str, Str, Coded(C::Implementation)],
            TableId::ManifestResource => &[U32, U32, Str, Coded(C::Implementation)],
            TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
            TableId::GenericParam => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
            TableId::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
            TableId::GenericParamConstraint => &[Table(TableId::GenericParam), Coded(C::TypeDefOrRef)],
        }
    }
}

/// A column type in the table schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    U16,
    U32,
    Str,
    Guid,
    Blob,
    Table(TableId),
    Coded(CodedIndex),
}

/// Coded index kinds (ECMA-335 II.24.2.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedIndex {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndex {
    pub fn name(self) -> &'static str {
        match self {
            CodedIndex::TypeDefOrRef => "TypeDefOrRef",
            CodedIndex::HasConstant => "HasConstant",
            CodedIndex::HasCustomAttribute => "HasCustomAttribute",
            CodedIndex::HasFieldMarshal => "HasFieldMarshal",
            CodedIndex::HasDeclSecurity => "HasDeclSecurity",
            CodedIndex::MemberRefParent => "MemberRefParent",
            CodedIndex::HasSemantics => "HasSemantics",
            CodedIndex::MethodDefOrRef => "MethodDefOrRef",
            CodedIndex::MemberForwarded => "MemberForwarded",
            CodedIndex::Implementation => "Implementation",
            CodedIndex::CustomAttributeType => "CustomAttributeType",
            CodedIndex::ResolutionScope => "ResolutionScope",
            CodedIndex::TypeOrMethodDef => "TypeOrMethodDef",
        }
    }

    /// Tables addressable by this coded index, in tag order
    pub fn tables(self) -> &'static [Option<TableId>] {
        use TableId as T;
        match self {
            CodedIndex::TypeDefOrRef => &[Some(T::TypeDef), Some(T::TypeRef), Some(T::TypeSpec)],
            CodedIndex::HasConstant => &[Some(T::Field), Some(T::Param), Some(T::Property)],
            CodedIndex::HasCustomAttribute => &[
                Some(T::MethodDef),
                Some(T::Field),
                Some(T::TypeRef),
                Some(T::TypeDef),
                Some(T::Param),
                Some(T::InterfaceImpl),
                Some(T::MemberRef),
                Some(T::Module),
                Some(T::DeclSecurity),
                Some(T::Property),
                Some(T::Event),
                Some(T::StandAloneSig),
                Some(T::ModuleRef),
                Some(T::TypeSpec),
                Some(T::Assembly),
                Some(T::AssemblyRef),
                Some(T::File),
                Some(T::ExportedType),
                Some(T::ManifestResource),
                Some(T::GenericParam),
                Some(T::GenericParamConstraint),
                Some(T::MethodSpec),
            ],
            CodedIndex::HasFieldMarshal => &[Some(T::Field), Some(T::Param)],
            CodedIndex::HasDeclSecurity => &[Some(T::TypeDef), Some(T::MethodDef), Some(T::Assembly)],
            CodedIndex::MemberRefParent => &[Some(T::TypeDef), Some(T::TypeRef), Some(T::ModuleRef), Some(T::MethodDef), Some(T::TypeSpec)],
            CodedIndex::HasSemantics => &[Some(T::Event), Some(T::Property)],
            CodedIndex::MethodDefOrRef => &[Some(T::MethodDef), Some(T::MemberRef)],
            CodedIndex::MemberForwarded => &[Some(T::Field), Some(T::MethodDef)],
            CodedIndex::Implementation => &[Some(T::File), Some(T::AssemblyRef), Some(T::ExportedType)],
            CodedIndex::CustomAttributeType => &[None, None, Some(T::MethodDef), Some(T::MemberRef), None],
            CodedIndex::ResolutionScope => &[Some(T::Module), Some(T::ModuleRef), Some(T::AssemblyRef), Some(T::TypeRef)],
            CodedIndex::TypeOrMethodDef => &[Some(T::TypeDef), Some(T::MethodDef)],
        }
    }

    /// Number of low bits holding the table tag
    pub fn tag_bits(self) -> u32 {
        let tables = self.tables().len() as u32;
        u32::BITS - (tables - 1).leading_zeros()
    }

    /// Split a raw coded value into (table, row); `None` for a null reference
    pub fn decode(self, value: u32) -> MetadataResult<Option<(TableId, u32)>> {
        let bits = self.tag_bits();
        let tag = (value & ((1 << bits) - 1)) as usize;
        let row = value >> bits;
        if row == 0 {
            return Ok(None);
        }
        match self.tables().get(tag) {
            Some(Some(table)) => Ok(Some((*table, row))),
            _ => Err(MetadataError::InvalidCodedIndex { kind: self.name(), value }),
        }
    }

    /// Combine a table and row into the raw coded value
    pub fn encode(self, table: TableId, row: u32) -> Option<u32> {
        let tag = self.tables().iter().position(|t| *t == Some(table))? as u32;
        Some((row << self.tag_bits()) | tag)
    }
}

#[derive(Debug, Clone, Default)]
struct TableLayout {
    offset: usize,
    row_size: usize,
    /// (offset within row, width) per column
    columns: Vec<(usize, usize)>,
}

/// Decoded `#~` stream header and layout of every present table
#[derive(Debug, Clone)]
pub struct Tables<'a> {
    data: &'a [u8],
    row_counts: [u32; TABLE_COUNT],
    layouts: Vec<TableLayout>,
}

const LARGE_STRINGS: u8 = 0x01;
const LARGE_GUIDS: u8 = 0x02;
const LARGE_BLOBS: u8 = 0x04;
const EXTRA_DATA: u8 = 0x40;

impl<'a> Tables<'a> {
    pub fn parse(data: &'a [u8]) -> MetadataResult<Self> {
        let mut reader = ByteReader::new(data);
        let _reserved = reader.u32()?;
        let _major = reader.u8()?;
        let _minor = reader.u8()?;
        let heap_sizes = reader.u8()?;
        let _reserved = reader.u8()?;
        let valid = reader.u64()?;
        let _sorted = reader.u64()?;

        if valid >> TABLE_COUNT != 0 {
            return Err(MetadataError::InvalidImage(format!("unknown metadata tables present (valid mask {valid:#x})")));
        }

        let mut row_counts = [0u32; TABLE_COUNT];
        for (index, count) in row_counts.iter_mut().enumerate() {
            if valid & (1 << index) != 0 {
                *count = reader.u32()?;
            }
        }
        if heap_sizes & EXTRA_DATA != 0 {
            reader.skip(4)?;
        }

        let string_width = if heap_sizes & LARGE_STRINGS != 0 { 4 } else { 2 };
        let guid_width = if heap_sizes & LARGE_GUIDS != 0 { 4 } else { 2 };
        let blob_width = if heap_sizes & LARGE_BLOBS != 0 { 4 } else { 2 };

        let mut offset = reader.position();
        let mut layouts = Vec::with_capacity(TABLE_COUNT);
        for table in TableId::ALL {
            let mut columns = Vec::with_capacity(table.schema().len());
            let mut row_size = 0;
            for column in table.schema() {
                let width = match column {
                    Column::U16 => 2,
                    Column::U32 => 4,
                    Column::Str => string_width,
                    Column::Guid => guid_width,
                    Column::Blob => blob_width,
                    Column::Table(target) => simple_index_width(&row_counts, *target),
                    Column::Coded(kind) => coded_index_width(&row_counts, *kind),
                };
                columns.push((row_size, width));
                row_size += width;
            }
            layouts.push(TableLayout { offset, row_size, columns });
            offset += row_size * row_counts[table as usize] as usize;
        }

        if offset > data.len() {
            return Err(MetadataError::UnexpectedEof {
                offset: data.len(),
                needed: offset - data.len(),
                available: 0,
            });
        }

        Ok(Self { data, row_counts, layouts })
    }

    /// Number of rows in `table`
    pub fn len(&self, table: TableId) -> u32 {
        self.row_counts[table as usize]
    }

    /// Access a 1-based row of `table`
    pub fn row(&self, table: TableId, row: u32) -> MetadataResult<Row<'_>> {
        if row == 0 || row > self.len(table) {
            return Err(MetadataError::InvalidRow { table: table.name(), row });
        }
        let layout = &self.layouts[table as usize];
        let start = layout.offset + layout.row_size * (row as usize - 1);
        Ok(Row {
            data: &self.data[start..start + layout.row_size],
            columns: &layout.columns,
        })
    }

    /// Half-open row range `[first, end)` of a member list owned by `row`.
    ///
    /// Lists such as TypeDef.MethodList run until the next owner's list start
    /// or the end of the target table.
    pub fn list_range(&self, owner: TableId, row: u32, column: usize, target: TableId) -> MetadataResult<std::ops::Range<u32>> {
        let first = self.row(owner, row)?.value(column);
        let end = if row < self.len(owner) {
            self.row(owner, row + 1)?.value(column)
        } else {
            self.len(target) + 1
        };
        Ok(first..end.max(first))
    }
}

pub(crate) fn simple_index_width(row_counts: &[u32; TABLE_COUNT], table: TableId) -> usize {
    if row_counts[table as usize] < (1 << 16) { 2 } else { 4 }
}

pub(crate) fn coded_index_width(row_counts: &[u32; TABLE_COUNT], kind: CodedIndex) -> usize {
    let largest = kind.tables().iter().flatten().map(|table| row_counts[*table as usize]).max().unwrap_or(0);
    if largest < (1 << (16 - kind.tag_bits())) { 2 } else { 4 }
}

/// A single table row
#[derive(Debug, Clone, Copy)]
pub struct Row<'t> {
    data: &'t [u8],
    columns: &'t [(usize, usize)],
}

impl Row<'_> {
    /// Raw value of column `column`, widened to u32
    pub fn value(&self, column: usize) -> u32 {
        let (offset, width) = self.columns[column];
        let bytes = &self.data[offset..offset + width];
        match width {
            2 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}
