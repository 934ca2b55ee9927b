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

//! In-memory WinMD writer for tests.
//!
//! Produces small but well-formed metadata files (optionally wrapped in a PE
//! image) so the loader and everything built on it can be exercised without
//! shipping binary fixtures.
//!
//! ```ignore
//! let image = WinmdBuilder::new("Contoso")
//!     .class("Contoso.Controls", "Gauge", |t| {
//!         t.extends("Windows.UI.Xaml", "FrameworkElement")
//!             .default_constructor()
//!             .property("Value", TypeSig::Primitive(Primitive::F64))
//!     })
//!     .build();
//! ```

use std::collections::HashMap;

use crate::descriptor::{method_attributes, type_attributes};
use crate::pe::METADATA_MAGIC;
use crate::signature::{Primitive, TypeName, TypeSig, join_name};
use crate::tables::{CodedIndex, Column, TABLE_COUNT, TableId, coded_index_width, simple_index_width};

const RUNTIME_VERSION: &str = "WindowsRuntime 1.4";

const HIDE_BY_SIG: u16 = 0x0080;
const PRIVATE: u16 = 0x0001;

const FIELD_PUBLIC: u16 = 0x0006;
const FIELD_STATIC: u16 = 0x0010;
const FIELD_LITERAL: u16 = 0x0040;
const FIELD_SPECIAL_NAME: u16 = 0x0200;
const FIELD_RT_SPECIAL_NAME: u16 = 0x0400;
const FIELD_HAS_DEFAULT: u16 = 0x8000;

/// Visibility of a generated accessor or constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

impl Access {
    fn flags(self) -> u16 {
        match self {
            Access::Public => method_attributes::PUBLIC,
            Access::Private => PRIVATE,
        }
    }
}

/// A property to emit, with its accessors
#[derive(Debug, Clone)]
pub struct PropertyFixture {
    pub name: String,
    pub ty: TypeSig,
    pub getter: Option<Access>,
    pub setter: Option<Access>,
    pub is_static: bool,
}

impl PropertyFixture {
    /// Read-write public instance property
    pub fn new(name: impl Into<String>, ty: TypeSig) -> Self {
        Self {
            name: name.into(),
            ty,
            getter: Some(Access::Public),
            setter: Some(Access::Public),
            is_static: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.setter = None;
        self
    }

    pub fn setter(mut self, access: Access) -> Self {
        self.setter = Some(access);
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}

#[derive(Debug, Clone)]
struct EventFixture {
    name: String,
    handler: TypeSig,
    is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixtureKind {
    Class,
    Interface,
    Enum,
    Struct,
    Delegate,
}

/// One type definition to emit
#[derive(Debug, Clone)]
pub struct TypeFixture {
    namespace: String,
    name: String,
    kind: FixtureKind,
    public: bool,
    abstract_type: bool,
    base: Option<TypeName>,
    constructors: Vec<(Access, u32)>,
    properties: Vec<PropertyFixture>,
    events: Vec<EventFixture>,
    members: Vec<(String, i64)>,
}

impl TypeFixture {
    fn new(namespace: &str, name: &str, kind: FixtureKind) -> Self {
        let base = match kind {
            FixtureKind::Class => Some(TypeName::new("System", "Object")),
            FixtureKind::Interface => None,
            FixtureKind::Enum => Some(TypeName::new("System", "Enum")),
            FixtureKind::Struct => Some(TypeName::new("System", "ValueType")),
            FixtureKind::Delegate => Some(TypeName::new("System", "MulticastDelegate")),
        };
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            public: true,
            abstract_type: false,
            base,
            constructors: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            members: Vec::new(),
        }
    }

    fn full_name(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    pub fn extends(mut self, namespace: &str, name: &str) -> Self {
        self.base = Some(TypeName::new(namespace, name));
        self
    }

    /// Drop the base type entirely
    pub fn no_base(mut self) -> Self {
        self.base = None;
        self
    }

    pub fn not_public(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.abstract_type = true;
        self
    }

    pub fn default_constructor(self) -> Self {
        self.constructor(Access::Public, 0)
    }

    pub fn constructor(mut self, access: Access, params: u32) -> Self {
        self.constructors.push((access, params));
        self
    }

    pub fn property(self, name: &str, ty: TypeSig) -> Self {
        self.property_with(PropertyFixture::new(name, ty))
    }

    pub fn property_with(mut self, property: PropertyFixture) -> Self {
        self.properties.push(property);
        self
    }

    pub fn event(mut self, name: &str, handler: TypeSig) -> Self {
        self.events.push(EventFixture {
            name: name.to_string(),
            handler,
            is_static: false,
        });
        self
    }

    pub fn static_event(mut self, name: &str, handler: TypeSig) -> Self {
        self.events.push(EventFixture {
            name: name.to_string(),
            handler,
            is_static: true,
        });
        self
    }

    /// Enum constant
    pub fn member(mut self, name: &str, value: i64) -> Self {
        self.members.push((name.to_string(), value));
        self
    }
}

/// Shorthand for a non-generic reference type signature
pub fn named(namespace: &str, name: &str) -> TypeSig {
    TypeSig::Named(TypeName::new(namespace, name))
}

/// Shorthand for a value type signature
pub fn value_type(namespace: &str, name: &str) -> TypeSig {
    let mut type_name = TypeName::new(namespace, name);
    type_name.value_type = true;
    TypeSig::Named(type_name)
}

/// Shorthand for a generic instantiation
pub fn generic(namespace: &str, name: &str, arguments: Vec<TypeSig>) -> TypeSig {
    let mut type_name = TypeName::new(namespace, name);
    type_name.generics = arguments;
    TypeSig::Named(type_name)
}

/// Builder for a single metadata file
#[derive(Debug, Clone)]
pub struct WinmdBuilder {
    assembly: String,
    default_scope: String,
    scopes: HashMap<String, String>,
    types: Vec<TypeFixture>,
}

impl WinmdBuilder {
    pub fn new(assembly: &str) -> Self {
        Self {
            assembly: assembly.to_string(),
            default_scope: "Windows".to_string(),
            scopes: HashMap::new(),
            types: Vec::new(),
        }
    }

    /// Assembly that references to types not defined here point into
    pub fn references_into(mut self, assembly: &str) -> Self {
        self.default_scope = assembly.to_string();
        self
    }

    /// Point references to one external type at a specific assembly
    pub fn external_type(mut self, namespace: &str, name: &str, assembly: &str) -> Self {
        self.scopes.insert(join_name(namespace, name), assembly.to_string());
        self
    }

    pub fn class(self, namespace: &str, name: &str, configure: impl FnOnce(TypeFixture) -> TypeFixture) -> Self {
        self.add(namespace, name, FixtureKind::Class, configure)
    }

    pub fn interface(self, namespace: &str, name: &str, configure: impl FnOnce(TypeFixture) -> TypeFixture) -> Self {
        self.add(namespace, name, FixtureKind::Interface, configure)
    }

    pub fn structure(self, namespace: &str, name: &str) -> Self {
        self.add(namespace, name, FixtureKind::Struct, |t| t)
    }

    pub fn delegate(self, namespace: &str, name: &str) -> Self {
        self.add(namespace, name, FixtureKind::Delegate, |t| t)
    }

    pub fn enumeration(self, namespace: &str, name: &str, members: &[(&str, i64)]) -> Self {
        self.add(namespace, name, FixtureKind::Enum, |t| members.iter().fold(t, |t, (member, value)| t.member(member, *value)))
    }

    fn add(mut self, namespace: &str, name: &str, kind: FixtureKind, configure: impl FnOnce(TypeFixture) -> TypeFixture) -> Self {
        self.types.push(configure(TypeFixture::new(namespace, name, kind)));
        self
    }

    /// Bare metadata blob starting with the `BSJB` root
    pub fn build_metadata(&self) -> Vec<u8> {
        let mut emitter = Emitter::new(self);
        emitter.emit_types();
        emitter.finish()
    }

    /// Metadata wrapped in a minimal PE32 image with a CLI header
    pub fn build(&self) -> Vec<u8> {
        wrap_in_pe(&self.build_metadata())
    }
}

/// Heap with byte-offset addressing
#[derive(Default)]
struct Heap {
    data: Vec<u8>,
    strings: HashMap<String, u32>,
}

impl Heap {
    fn with_empty_entry() -> Self {
        Self {
            data: vec![0],
            strings: HashMap::new(),
        }
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.strings.get(value) {
            return *offset;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.strings.insert(value.to_string(), offset);
        offset
    }

    fn blob(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        let offset = self.data.len() as u32;
        write_compressed(&mut self.data, value.len() as u32);
        self.data.extend_from_slice(value);
        offset
    }
}

fn write_compressed(out: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.extend_from_slice(&[0x80 | (value >> 8) as u8, value as u8]);
    } else {
        out.extend_from_slice(&[0xC0 | (value >> 24) as u8, (value >> 16) as u8, (value >> 8) as u8, value as u8]);
    }
}

fn coded(kind: CodedIndex, table: TableId, row: u32) -> u32 {
    kind.encode(table, row).unwrap_or(0)
}

struct Emitter<'b> {
    builder: &'b WinmdBuilder,
    strings: Heap,
    blobs: Heap,
    rows: Vec<Vec<Vec<u32>>>,
    type_defs: HashMap<String, u32>,
    type_refs: HashMap<String, u32>,
    assembly_refs: HashMap<String, u32>,
}

impl<'b> Emitter<'b> {
    fn new(builder: &'b WinmdBuilder) -> Self {
        // Row 1 is the <Module> pseudo type
        let type_defs = builder.types.iter().enumerate().map(|(index, fixture)| (fixture.full_name(), index as u32 + 2)).collect();
        Self {
            builder,
            strings: Heap::with_empty_entry(),
            blobs: Heap::with_empty_entry(),
            rows: vec![Vec::new(); TABLE_COUNT],
            type_defs,
            type_refs: HashMap::new(),
            assembly_refs: HashMap::new(),
        }
    }

    fn push(&mut self, table: TableId, row: Vec<u32>) -> u32 {
        let rows = &mut self.rows[table as usize];
        rows.push(row);
        rows.len() as u32
    }

    fn next_row(&self, table: TableId) -> u32 {
        self.rows[table as usize].len() as u32 + 1
    }

    fn assembly_ref(&mut self, name: &str) -> u32 {
        if let Some(row) = self.assembly_refs.get(name) {
            return *row;
        }
        let name_index = self.strings.string(name);
        let row = self.push(TableId::AssemblyRef, vec![255, 255, 255, 255, 0, 0, name_index, 0, 0]);
        self.assembly_refs.insert(name.to_string(), row);
        row
    }

    fn type_ref(&mut self, name: &TypeName) -> u32 {
        let full_name = name.full_name();
        if let Some(row) = self.type_refs.get(&full_name) {
            return *row;
        }
        let scope = match self.builder.scopes.get(&full_name) {
            Some(assembly) => assembly.clone(),
            None if name.namespace == "System" => "mscorlib".to_string(),
            None => self.builder.default_scope.clone(),
        };
        let scope_row = self.assembly_ref(&scope);
        let name_index = self.strings.string(&name.name);
        let namespace_index = self.strings.string(&name.namespace);
        let row = self.push(TableId::TypeRef, vec![coded(CodedIndex::ResolutionScope, TableId::AssemblyRef, scope_row), name_index, namespace_index]);
        self.type_refs.insert(full_name, row);
        row
    }

    /// TypeDef or TypeRef for a non-generic name
    fn type_token(&mut self, name: &TypeName) -> (TableId, u32) {
        match self.type_defs.get(&name.full_name()) {
            Some(row) => (TableId::TypeDef, *row),
            None => (TableId::TypeRef, self.type_ref(name)),
        }
    }

    /// Coded TypeDefOrRef for any type, using a TypeSpec for constructed ones
    fn type_def_or_ref(&mut self, sig: &TypeSig) -> u32 {
        match sig {
            TypeSig::Named(name) if name.generics.is_empty() => {
                let (table, row) = self.type_token(name);
                coded(CodedIndex::TypeDefOrRef, table, row)
            }
            other => {
                let mut blob = Vec::new();
                self.encode_type(other, &mut blob);
                let blob_index = self.blobs.blob(&blob);
                let row = self.push(TableId::TypeSpec, vec![blob_index]);
                coded(CodedIndex::TypeDefOrRef, TableId::TypeSpec, row)
            }
        }
    }

    fn encode_token(&mut self, name: &TypeName, out: &mut Vec<u8>) {
        let (table, row) = self.type_token(name);
        let tag = if table == TableId::TypeDef { 0 } else { 1 };
        write_compressed(out, (row << 2) | tag);
    }

    fn encode_type(&mut self, sig: &TypeSig, out: &mut Vec<u8>) {
        match sig {
            TypeSig::Primitive(primitive) => out.push(match primitive {
                Primitive::Void => 0x01,
                Primitive::Bool => 0x02,
                Primitive::Char => 0x03,
                Primitive::I8 => 0x04,
                Primitive::U8 => 0x05,
                Primitive::I16 => 0x06,
                Primitive::U16 => 0x07,
                Primitive::I32 => 0x08,
                Primitive::U32 => 0x09,
                Primitive::I64 => 0x0A,
                Primitive::U64 => 0x0B,
                Primitive::F32 => 0x0C,
                Primitive::F64 => 0x0D,
                Primitive::ISize => 0x18,
                Primitive::USize => 0x19,
            }),
            TypeSig::String => out.push(0x0E),
            TypeSig::Object => out.push(0x1C),
            TypeSig::Named(name) if name.generics.is_empty() => {
                out.push(if name.value_type { 0x11 } else { 0x12 });
                self.encode_token(name, out);
            }
            TypeSig::Named(name) => {
                out.push(0x15);
                out.push(if name.value_type { 0x11 } else { 0x12 });
                let definition = TypeName::new(name.namespace.clone(), name.name.clone());
                self.encode_token(&definition, out);
                write_compressed(out, name.generics.len() as u32);
                for argument in &name.generics {
                    self.encode_type(argument, out);
                }
            }
            TypeSig::Array(element) => {
                out.push(0x1D);
                self.encode_type(element, out);
            }
            TypeSig::GenericParam { index, method } => {
                out.push(if *method { 0x1E } else { 0x13 });
                write_compressed(out, *index);
            }
            TypeSig::ByRef(inner) => {
                out.push(0x10);
                self.encode_type(inner, out);
            }
            TypeSig::Pointer(inner) => {
                out.push(0x0F);
                self.encode_type(inner, out);
            }
        }
    }

    fn method(&mut self, name: &str, flags: u16, signature: &[u8]) -> u32 {
        let name_index = self.strings.string(name);
        let signature_index = self.blobs.blob(signature);
        let param_list = self.next_row(TableId::Param);
        self.push(TableId::MethodDef, vec![0, 0, u32::from(flags), name_index, signature_index, param_list])
    }

    fn accessor_flags(access: Access, is_static: bool) -> u16 {
        let mut flags = access.flags() | method_attributes::SPECIAL_NAME | HIDE_BY_SIG;
        if is_static {
            flags |= method_attributes::STATIC;
        }
        flags
    }

    fn emit_types(&mut self) {
        let module_name = self.strings.string(&format!("{}.winmd", self.builder.assembly));
        self.push(TableId::Module, vec![0, module_name, 1, 0, 0]);
        let assembly_name = self.strings.string(&self.builder.assembly);
        self.push(TableId::Assembly, vec![0x8004, 255, 255, 255, 255, 0x200, 0, assembly_name, 0]);

        let module_type = self.strings.string("<Module>");
        self.push(TableId::TypeDef, vec![0, module_type, 0, 0, 1, 1]);

        let fixtures = self.builder.types.clone();
        for (index, fixture) in fixtures.iter().enumerate() {
            self.emit_type(index as u32 + 2, fixture);
        }
    }

    fn emit_type(&mut self, row: u32, fixture: &TypeFixture) {
        let mut flags = match fixture.kind {
            FixtureKind::Interface => type_attributes::INTERFACE | type_attributes::ABSTRACT,
            FixtureKind::Enum | FixtureKind::Struct | FixtureKind::Delegate => type_attributes::SEALED,
            FixtureKind::Class => 0,
        } | type_attributes::WINDOWS_RUNTIME;
        if fixture.public {
            flags |= type_attributes::PUBLIC;
        }
        if fixture.abstract_type {
            flags |= type_attributes::ABSTRACT;
        }

        let extends = match &fixture.base {
            Some(base) => {
                let (table, base_row) = self.type_token(base);
                coded(CodedIndex::TypeDefOrRef, table, base_row)
            }
            None => 0,
        };
        let name_index = self.strings.string(&fixture.name);
        let namespace_index = self.strings.string(&fixture.namespace);
        let field_list = self.next_row(TableId::Field);
        let method_list = self.next_row(TableId::MethodDef);
        self.push(TableId::TypeDef, vec![flags, name_index, namespace_index, extends, field_list, method_list]);

        if fixture.kind == FixtureKind::Enum {
            self.emit_enum_fields(row, fixture);
        }

        for (access, params) in &fixture.constructors {
            let mut signature = vec![0x20];
            write_compressed(&mut signature, *params);
            signature.push(0x01);
            signature.extend(std::iter::repeat_n(0x08, *params as usize));
            let flags = access.flags() | method_attributes::SPECIAL_NAME | method_attributes::RT_SPECIAL_NAME | HIDE_BY_SIG;
            self.method(".ctor", flags, &signature);
        }

        if !fixture.properties.is_empty() {
            let first = self.next_row(TableId::Property);
            self.push(TableId::PropertyMap, vec![row, first]);
            for property in &fixture.properties {
                self.emit_property(property);
            }
        }

        if !fixture.events.is_empty() {
            let first = self.next_row(TableId::Event);
            self.push(TableId::EventMap, vec![row, first]);
            for event in &fixture.events {
                self.emit_event(event);
            }
        }
    }

    fn emit_enum_fields(&mut self, row: u32, fixture: &TypeFixture) {
        let value_name = self.strings.string("value__");
        let value_signature = self.blobs.blob(&[0x06, 0x08]);
        self.push(TableId::Field, vec![u32::from(FIELD_PUBLIC | FIELD_SPECIAL_NAME | FIELD_RT_SPECIAL_NAME), value_name, value_signature]);

        let mut signature = vec![0x06, 0x11];
        write_compressed(&mut signature, row << 2);
        let signature_index = self.blobs.blob(&signature);
        for (name, value) in &fixture.members {
            let name_index = self.strings.string(name);
            let flags = FIELD_PUBLIC | FIELD_STATIC | FIELD_LITERAL | FIELD_HAS_DEFAULT;
            let field = self.push(TableId::Field, vec![u32::from(flags), name_index, signature_index]);
            let (element_type, bytes) = match i32::try_from(*value) {
                Ok(small) => (0x08, small.to_le_bytes()),
                Err(_) => (0x09, (*value as u32).to_le_bytes()),
            };
            let value_index = self.blobs.blob(&bytes);
            self.push(TableId::Constant, vec![element_type, coded(CodedIndex::HasConstant, TableId::Field, field), value_index]);
        }
    }

    fn emit_property(&mut self, property: &PropertyFixture) {
        let has_this = if property.is_static { 0x00 } else { 0x20 };
        let mut type_blob = Vec::new();
        self.encode_type(&property.ty, &mut type_blob);

        let mut signature = vec![0x08 | has_this, 0x00];
        signature.extend_from_slice(&type_blob);
        let name_index = self.strings.string(&property.name);
        let signature_index = self.blobs.blob(&signature);
        let row = self.push(TableId::Property, vec![0, name_index, signature_index]);
        let association = coded(CodedIndex::HasSemantics, TableId::Property, row);

        if let Some(access) = property.getter {
            let mut getter = vec![has_this, 0x00];
            getter.extend_from_slice(&type_blob);
            let method = self.method(&format!("get_{}", property.name), Self::accessor_flags(access, property.is_static), &getter);
            self.push(TableId::MethodSemantics, vec![0x0002, method, association]);
        }
        if let Some(access) = property.setter {
            let mut setter = vec![has_this, 0x01, 0x01];
            setter.extend_from_slice(&type_blob);
            let method = self.method(&format!("put_{}", property.name), Self::accessor_flags(access, property.is_static), &setter);
            self.push(TableId::MethodSemantics, vec![0x0001, method, association]);
        }
    }

    fn emit_event(&mut self, event: &EventFixture) {
        let handler = self.type_def_or_ref(&event.handler);
        let name_index = self.strings.string(&event.name);
        let row = self.push(TableId::Event, vec![0, name_index, handler]);
        let association = coded(CodedIndex::HasSemantics, TableId::Event, row);
        let has_this = if event.is_static { 0x00 } else { 0x20 };
        let flags = Self::accessor_flags(Access::Public, event.is_static);

        let add = self.method(&format!("add_{}", event.name), flags, &[has_this, 0x01, 0x01, 0x1C]);
        self.push(TableId::MethodSemantics, vec![0x0008, add, association]);
        let remove = self.method(&format!("remove_{}", event.name), flags, &[has_this, 0x01, 0x01, 0x1C]);
        self.push(TableId::MethodSemantics, vec![0x0010, remove, association]);
    }

    fn tables_stream(&self) -> Vec<u8> {
        let mut row_counts = [0u32; TABLE_COUNT];
        for (index, rows) in self.rows.iter().enumerate() {
            row_counts[index] = rows.len() as u32;
        }
        let large_strings = self.strings.data.len() >= 1 << 16;
        let large_blobs = self.blobs.data.len() >= 1 << 16;
        let heap_sizes = u8::from(large_strings) | (u8::from(large_blobs) << 2);

        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&[2, 0, heap_sizes, 1]);
        let valid = row_counts.iter().enumerate().filter(|(_, count)| **count > 0).fold(0u64, |mask, (index, _)| mask | (1 << index));
        out.extend_from_slice(&valid.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        for count in row_counts.iter().filter(|count| **count > 0) {
            out.extend_from_slice(&count.to_le_bytes());
        }

        for table in TableId::ALL {
            for row in &self.rows[table as usize] {
                for (column, value) in table.schema().iter().zip(row) {
                    let width = match column {
                        Column::U16 => 2,
                        Column::U32 => 4,
                        Column::Str if large_strings => 4,
                        Column::Blob if large_blobs => 4,
                        Column::Str | Column::Guid | Column::Blob => 2,
                        Column::Table(target) => simple_index_width(&row_counts, *target),
                        Column::Coded(kind) => coded_index_width(&row_counts, *kind),
                    };
                    if width == 2 {
                        out.extend_from_slice(&(*value as u16).to_le_bytes());
                    } else {
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        out
    }

    fn finish(self) -> Vec<u8> {
        let tables = self.tables_stream();
        let guid = [0x5Au8; 16];
        let streams: [(&str, &[u8]); 4] = [("#~", &tables), ("#Strings", &self.strings.data), ("#Blob", &self.blobs.data), ("#GUID", &guid)];

        let mut version = RUNTIME_VERSION.as_bytes().to_vec();
        version.push(0);
        pad4(&mut version);

        let header_size = 16 + version.len() + 4 + streams.iter().map(|(name, _)| 8 + padded_len(name.len() + 1)).sum::<usize>();

        let mut out = Vec::new();
        out.extend_from_slice(&METADATA_MAGIC.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(version.len() as u32).to_le_bytes());
        out.extend_from_slice(&version);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut offset = header_size;
        for (name, data) in &streams {
            let size = padded_len(data.len());
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(size as u32).to_le_bytes());
            let mut name_bytes = name.as_bytes().to_vec();
            name_bytes.push(0);
            pad4(&mut name_bytes);
            out.extend_from_slice(&name_bytes);
            offset += size;
        }
        for (_, data) in &streams {
            let mut chunk = data.to_vec();
            pad4(&mut chunk);
            out.extend_from_slice(&chunk);
        }
        out
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}

fn pad4(bytes: &mut Vec<u8>) {
    bytes.resize(padded_len(bytes.len()), 0);
}

const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER_SIZE: usize = 224;
const SECTION_RVA: u32 = 0x2000;
const SECTION_FILE_OFFSET: usize = 0x200;
const CLI_HEADER_SIZE: usize = 72;

fn wrap_in_pe(metadata: &[u8]) -> Vec<u8> {
    let section_size = CLI_HEADER_SIZE + metadata.len();
    let raw_size = section_size.div_ceil(0x200) * 0x200;
    let mut image = vec![0u8; SECTION_FILE_OFFSET + raw_size];

    let mut put = |offset: usize, bytes: &[u8]| image[offset..offset + bytes.len()].copy_from_slice(bytes);
    put(0, b"MZ");
    put(0x3C, &(PE_OFFSET as u32).to_le_bytes());
    put(PE_OFFSET, b"PE\0\0");

    let coff = PE_OFFSET + 4;
    put(coff, &0x014Cu16.to_le_bytes());
    put(coff + 2, &1u16.to_le_bytes());
    put(coff + 16, &(OPTIONAL_HEADER_SIZE as u16).to_le_bytes());
    put(coff + 18, &0x2102u16.to_le_bytes());

    let optional = coff + 20;
    put(optional, &0x010Bu16.to_le_bytes());
    put(optional + 92, &16u32.to_le_bytes());
    let cli_directory = optional + 96 + 14 * 8;
    put(cli_directory, &SECTION_RVA.to_le_bytes());
    put(cli_directory + 4, &(CLI_HEADER_SIZE as u32).to_le_bytes());

    let section = optional + OPTIONAL_HEADER_SIZE;
    put(section, b".text\0\0\0");
    put(section + 8, &(section_size as u32).to_le_bytes());
    put(section + 12, &SECTION_RVA.to_le_bytes());
    put(section + 16, &(raw_size as u32).to_le_bytes());
    put(section + 20, &(SECTION_FILE_OFFSET as u32).to_le_bytes());

    let cli = SECTION_FILE_OFFSET;
    put(cli, &(CLI_HEADER_SIZE as u32).to_le_bytes());
    put(cli + 4, &2u16.to_le_bytes());
    put(cli + 6, &5u16.to_le_bytes());
    put(cli + 8, &(SECTION_RVA + CLI_HEADER_SIZE as u32).to_le_bytes());
    put(cli + 12, &(metadata.len() as u32).to_le_bytes());
    put(cli + CLI_HEADER_SIZE, metadata);

    image
}
