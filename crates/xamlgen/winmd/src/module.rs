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

//! Decoding one metadata file into owned descriptors

use std::collections::HashMap;
use std::ops::Range;

use tracing::debug;

use crate::descriptor::{Accessor, EnumMember, EventDescriptor, PropertyDescriptor, TypeDescriptor, TypeKind, method_attributes, type_attributes};
use crate::error::{MetadataError, MetadataResult};
use crate::pe;
use crate::reader::ByteReader;
use crate::signature::{SignatureDecoder, TypeName, TypeResolver, TypeSig, join_name};
use crate::streams::MetadataStreams;
use crate::tables::{CodedIndex, TableId, Tables};

const SEMANTICS_SETTER: u16 = 0x0001;
const SEMANTICS_GETTER: u16 = 0x0002;
const SEMANTICS_ADD_ON: u16 = 0x0008;
const SEMANTICS_REMOVE_ON: u16 = 0x0010;

const FIELD_STATIC: u16 = 0x0010;
const FIELD_LITERAL: u16 = 0x0040;

/// Where a TypeRef points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceScope {
    /// The referencing module itself
    Module,
    ModuleRef(String),
    AssemblyRef(String),
    /// Nested inside another reference
    Enclosing(TypeName),
}

/// A TypeRef row with its scope decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    pub name: TypeName,
    pub scope: ReferenceScope,
}

/// Everything the loader keeps from one metadata file
#[derive(Debug, Clone)]
pub struct ModuleData {
    pub assembly: String,
    pub runtime_version: String,
    /// TypeDefs in table order; index 0 is the `<Module>` pseudo type
    pub types: Vec<TypeDescriptor>,
    pub references: Vec<TypeReference>,
}

/// Parse a metadata file image
pub fn read_module(image: &[u8]) -> MetadataResult<ModuleData> {
    let metadata = pe::metadata_slice(image)?;
    let streams = MetadataStreams::parse(metadata)?;
    let tables = Tables::parse(streams.tables)?;
    let reader = ModuleReader { streams, tables };
    reader.read()
}

struct ModuleReader<'a> {
    streams: MetadataStreams<'a>,
    tables: Tables<'a>,
}

/// Member ranges and lookups shared by every TypeDef
struct MemberIndex {
    properties: HashMap<u32, Range<u32>>,
    events: HashMap<u32, Range<u32>>,
    semantics: HashMap<(TableId, u32), Vec<(u16, u32)>>,
    constants: HashMap<u32, i64>,
}

impl<'a> ModuleReader<'a> {
    fn read(&self) -> MetadataResult<ModuleData> {
        let assembly = self.assembly_name()?;
        let index = self.member_index()?;

        let mut types = Vec::with_capacity(self.tables.len(TableId::TypeDef) as usize);
        for row in 1..=self.tables.len(TableId::TypeDef) {
            types.push(self.type_def(row, &assembly, &index)?);
        }

        let mut references = Vec::with_capacity(self.tables.len(TableId::TypeRef) as usize);
        for row in 1..=self.tables.len(TableId::TypeRef) {
            references.push(self.type_ref(row)?);
        }

        debug!(assembly = %assembly, types = types.len(), references = references.len(), "decoded metadata module");
        Ok(ModuleData {
            assembly,
            runtime_version: self.streams.version.to_string(),
            types,
            references,
        })
    }

    fn string(&self, index: u32) -> MetadataResult<String> {
        self.streams.strings.get(index).map(str::to_string)
    }

    fn assembly_name(&self) -> MetadataResult<String> {
        if self.tables.len(TableId::Assembly) > 0 {
            return self.string(self.tables.row(TableId::Assembly, 1)?.value(7));
        }
        // Non-manifest modules only carry a module name such as `Foo.winmd`
        let module = self.string(self.tables.row(TableId::Module, 1)?.value(1))?;
        Ok(module.strip_suffix(".winmd").unwrap_or(&module).to_string())
    }

    fn member_index(&self) -> MetadataResult<MemberIndex> {
        let mut properties = HashMap::new();
        for row in 1..=self.tables.len(TableId::PropertyMap) {
            let parent = self.tables.row(TableId::PropertyMap, row)?.value(0);
            properties.insert(parent, self.tables.list_range(TableId::PropertyMap, row, 1, TableId::Property)?);
        }

        let mut events = HashMap::new();
        for row in 1..=self.tables.len(TableId::EventMap) {
            let parent = self.tables.row(TableId::EventMap, row)?.value(0);
            events.insert(parent, self.tables.list_range(TableId::EventMap, row, 1, TableId::Event)?);
        }

        let mut semantics: HashMap<(TableId, u32), Vec<(u16, u32)>> = HashMap::new();
        for row in 1..=self.tables.len(TableId::MethodSemantics) {
            let record = self.tables.row(TableId::MethodSemantics, row)?;
            let flags = record.value(0) as u16;
            let method = record.value(1);
            if let Some(association) = CodedIndex::HasSemantics.decode(record.value(2))? {
                semantics.entry(association).or_default().push((flags, method));
            }
        }

        let mut constants = HashMap::new();
        for row in 1..=self.tables.len(TableId::Constant) {
            let record = self.tables.row(TableId::Constant, row)?;
            let element_type = (record.value(0) & 0xFF) as u8;
            if let Some((TableId::Field, field)) = CodedIndex::HasConstant.decode(record.value(1))? {
                let blob = self.streams.blobs.get(record.value(2))?;
                if let Some(value) = constant_value(element_type, blob)? {
                    constants.insert(field, value);
                }
            }
        }

        Ok(MemberIndex {
            properties,
            events,
            semantics,
            constants,
        })
    }

    fn type_def(&self, row: u32, assembly: &str, index: &MemberIndex) -> MetadataResult<TypeDescriptor> {
        let record = self.tables.row(TableId::TypeDef, row)?;
        let attributes = record.value(0);
        let name = self.string(record.value(1))?;
        let namespace = self.string(record.value(2))?;
        let base = match CodedIndex::TypeDefOrRef.decode(record.value(3))? {
            Some((table, base_row)) => self.resolve_token(table, base_row, 0)?.named().cloned(),
            None => None,
        };
        let full_name = join_name(&namespace, &name);

        let kind = if attributes & type_attributes::INTERFACE != 0 {
            TypeKind::Interface
        } else {
            match base.as_ref().map(TypeName::full_name).as_deref() {
                Some("System.Enum") => TypeKind::Enum,
                Some("System.ValueType") => TypeKind::Struct,
                Some("System.MulticastDelegate") => TypeKind::Delegate,
                _ => TypeKind::Class,
            }
        };

        let methods = self.tables.list_range(TableId::TypeDef, row, 5, TableId::MethodDef)?;
        let mut has_default_constructor = false;
        for method in methods {
            let method_record = self.tables.row(TableId::MethodDef, method)?;
            let flags = method_record.value(2) as u16;
            let is_constructor = flags & method_attributes::RT_SPECIAL_NAME != 0 && self.streams.strings.get(method_record.value(3))? == ".ctor";
            if !is_constructor || flags & method_attributes::STATIC != 0 || flags & method_attributes::MEMBER_ACCESS_MASK != method_attributes::PUBLIC {
                continue;
            }
            let signature = SignatureDecoder::new(self.streams.blobs.get(method_record.value(4))?, self).method()?;
            if signature.param_count == 0 {
                has_default_constructor = true;
            }
        }

        let mut properties = Vec::new();
        for property in index.properties.get(&row).cloned().unwrap_or(0..0) {
            properties.push(self.property(property, &full_name, index)?);
        }

        let mut events = Vec::new();
        for event in index.events.get(&row).cloned().unwrap_or(0..0) {
            events.push(self.event(event, &full_name, index)?);
        }

        let mut enum_members = Vec::new();
        if kind == TypeKind::Enum {
            for field in self.tables.list_range(TableId::TypeDef, row, 4, TableId::Field)? {
                let field_record = self.tables.row(TableId::Field, field)?;
                let flags = field_record.value(0) as u16;
                if flags & (FIELD_STATIC | FIELD_LITERAL) != (FIELD_STATIC | FIELD_LITERAL) {
                    continue; // value__
                }
                if let Some(value) = index.constants.get(&field) {
                    enum_members.push(EnumMember {
                        name: self.string(field_record.value(1))?,
                        value: *value,
                    });
                }
            }
        }

        Ok(TypeDescriptor {
            namespace,
            name,
            assembly: assembly.to_string(),
            kind,
            attributes,
            base,
            has_default_constructor,
            properties,
            events,
            enum_members,
        })
    }

    /// Accessor methods attached to a property or event, by semantics flag
    fn accessor(&self, owner: (TableId, u32), semantics: u16, index: &MemberIndex) -> MetadataResult<Option<Accessor>> {
        let Some(methods) = index.semantics.get(&owner) else {
            return Ok(None);
        };
        match methods.iter().find(|(flags, _)| flags & semantics != 0) {
            Some((_, method)) => {
                let record = self.tables.row(TableId::MethodDef, *method)?;
                Ok(Some(Accessor::from_flags(self.string(record.value(3))?, record.value(2) as u16)))
            }
            None => Ok(None),
        }
    }

    fn property(&self, row: u32, declaring_type: &str, index: &MemberIndex) -> MetadataResult<PropertyDescriptor> {
        let record = self.tables.row(TableId::Property, row)?;
        let blob = self.streams.blobs.get(record.value(2))?;
        Ok(PropertyDescriptor {
            name: self.string(record.value(1))?,
            declaring_type: declaring_type.to_string(),
            value_type: SignatureDecoder::new(blob, self).property()?,
            getter: self.accessor((TableId::Property, row), SEMANTICS_GETTER, index)?,
            setter: self.accessor((TableId::Property, row), SEMANTICS_SETTER, index)?,
        })
    }

    fn event(&self, row: u32, declaring_type: &str, index: &MemberIndex) -> MetadataResult<EventDescriptor> {
        let record = self.tables.row(TableId::Event, row)?;
        let handler_type = match CodedIndex::TypeDefOrRef.decode(record.value(2))? {
            Some((table, handler_row)) => self.resolve_token(table, handler_row, 0)?,
            None => TypeSig::Object,
        };
        Ok(EventDescriptor {
            name: self.string(record.value(1))?,
            declaring_type: declaring_type.to_string(),
            handler_type,
            add: self.accessor((TableId::Event, row), SEMANTICS_ADD_ON, index)?,
            remove: self.accessor((TableId::Event, row), SEMANTICS_REMOVE_ON, index)?,
        })
    }

    fn type_ref(&self, row: u32) -> MetadataResult<TypeReference> {
        let record = self.tables.row(TableId::TypeRef, row)?;
        let name = TypeName::new(self.string(record.value(2))?, self.string(record.value(1))?);
        let scope = match CodedIndex::ResolutionScope.decode(record.value(0))? {
            None | Some((TableId::Module, _)) => ReferenceScope::Module,
            Some((TableId::ModuleRef, scope_row)) => ReferenceScope::ModuleRef(self.string(self.tables.row(TableId::ModuleRef, scope_row)?.value(0))?),
            Some((TableId::AssemblyRef, scope_row)) => ReferenceScope::AssemblyRef(self.string(self.tables.row(TableId::AssemblyRef, scope_row)?.value(6))?),
            Some((_, scope_row)) => ReferenceScope::Enclosing(self.type_ref_name(scope_row, 0)?),
        };
        Ok(TypeReference { name, scope })
    }

    /// Name of a TypeRef, spelling nested references as `Outer/Inner`
    fn type_ref_name(&self, row: u32, depth: usize) -> MetadataResult<TypeName> {
        let record = self.tables.row(TableId::TypeRef, row)?;
        let name = self.string(record.value(1))?;
        match CodedIndex::ResolutionScope.decode(record.value(0))? {
            Some((TableId::TypeRef, outer)) if depth < MAX_NESTING => {
                let enclosing = self.type_ref_name(outer, depth + 1)?;
                Ok(TypeName::new(enclosing.namespace, format!("{}/{}", enclosing.name, name)))
            }
            Some((TableId::TypeRef, _)) => Err(MetadataError::InvalidRow { table: "TypeRef", row }),
            _ => Ok(TypeName::new(self.string(record.value(2))?, name)),
        }
    }
}

const MAX_NESTING: usize = 16;

impl TypeResolver for ModuleReader<'_> {
    fn resolve_token(&self, table: TableId, row: u32, depth: usize) -> MetadataResult<TypeSig> {
        match table {
            TableId::TypeDef => {
                let record = self.tables.row(TableId::TypeDef, row)?;
                Ok(TypeSig::Named(TypeName::new(self.string(record.value(2))?, self.string(record.value(1))?)))
            }
            TableId::TypeRef => Ok(TypeSig::Named(self.type_ref_name(row, 0)?)),
            TableId::TypeSpec => {
                let blob = self.streams.blobs.get(self.tables.row(TableId::TypeSpec, row)?.value(0))?;
                SignatureDecoder::nested(blob, self, depth).type_spec()
            }
            other => Err(MetadataError::InvalidRow { table: other.name(), row }),
        }
    }
}

/// Integer value of a Constant row, if it is an integer
fn constant_value(element_type: u8, blob: &[u8]) -> MetadataResult<Option<i64>> {
    let mut reader = ByteReader::new(blob);
    let value = match element_type {
        0x02 | 0x05 => i64::from(reader.u8()?),
        0x04 => i64::from(reader.u8()? as i8),
        0x03 | 0x07 => i64::from(reader.u16()?),
        0x06 => i64::from(reader.u16()? as i16),
        0x08 => i64::from(reader.u32()? as i32),
        0x09 => i64::from(reader.u32()?),
        0x0A | 0x0B => reader.u64()? as i64,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_values() {
        assert_eq!(constant_value(0x08, &(-2i32).to_le_bytes()).unwrap(), Some(-2));
        assert_eq!(constant_value(0x09, &u32::MAX.to_le_bytes()).unwrap(), Some(i64::from(u32::MAX)));
        assert_eq!(constant_value(0x04, &[0xFF]).unwrap(), Some(-1));
        assert_eq!(constant_value(0x0E, b"text").unwrap(), None);
        assert!(constant_value(0x08, &[0x01]).is_err());
    }
}
