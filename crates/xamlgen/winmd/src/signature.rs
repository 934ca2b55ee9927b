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

//! Blob signature decoding (ECMA-335 II.23.2)

use std::fmt;

use crate::error::{MetadataError, MetadataResult};
use crate::reader::ByteReader;
use crate::tables::TableId;

mod element {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const PTR: u8 = 0x0F;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const GENERICINST: u8 = 0x15;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const OBJECT: u8 = 0x1C;
    pub const SZARRAY: u8 = 0x1D;
    pub const MVAR: u8 = 0x1E;
    pub const CMOD_REQD: u8 = 0x1F;
    pub const CMOD_OPT: u8 = 0x20;
}

const SIG_HAS_THIS: u8 = 0x20;
const SIG_GENERIC: u8 = 0x10;
const SIG_PROPERTY: u8 = 0x08;

/// Built-in types with a dedicated element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    ISize,
    USize,
}

impl Primitive {
    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Void | Primitive::Bool)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void => "Void",
            Primitive::Bool => "Boolean",
            Primitive::Char => "Char",
            Primitive::I8 => "SByte",
            Primitive::U8 => "Byte",
            Primitive::I16 => "Int16",
            Primitive::U16 => "UInt16",
            Primitive::I32 => "Int32",
            Primitive::U32 => "UInt32",
            Primitive::I64 => "Int64",
            Primitive::U64 => "UInt64",
            Primitive::F32 => "Single",
            Primitive::F64 => "Double",
            Primitive::ISize => "IntPtr",
            Primitive::USize => "UIntPtr",
        }
    }
}

/// A named type reference, possibly generic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
    pub generics: Vec<TypeSig>,
    pub value_type: bool,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            generics: Vec::new(),
            value_type: false,
        }
    }

    /// `Namespace.Name`, without generic arguments
    pub fn full_name(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    /// Name with the generic arity suffix (`` `1 ``) removed
    pub fn base_name(&self) -> &str {
        self.name.split('`').next().unwrap_or(&self.name)
    }
}

/// Join a namespace and a type name the way metadata spells full names
pub fn join_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() { name.to_string() } else { format!("{namespace}.{name}") }
}

/// A decoded signature type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    Primitive(Primitive),
    String,
    Object,
    Named(TypeName),
    Array(Box<TypeSig>),
    /// Generic parameter of the enclosing type (`!0`) or method (`!!0`)
    GenericParam { index: u32, method: bool },
    ByRef(Box<TypeSig>),
    Pointer(Box<TypeSig>),
}

impl TypeSig {
    pub fn named(&self) -> Option<&TypeName> {
        match self {
            TypeSig::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Primitive(p) => write!(f, "{}", p.name()),
            TypeSig::String => write!(f, "String"),
            TypeSig::Object => write!(f, "Object"),
            TypeSig::Named(name) => {
                write!(f, "{}", name.full_name())?;
                if !name.generics.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in name.generics.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeSig::Array(element) => write!(f, "{element}[]"),
            TypeSig::GenericParam { index, method: false } => write!(f, "!{index}"),
            TypeSig::GenericParam { index, method: true } => write!(f, "!!{index}"),
            TypeSig::ByRef(inner) => write!(f, "{inner}&"),
            TypeSig::Pointer(inner) => write!(f, "{inner}*"),
        }
    }
}

/// Deepest type nesting a signature may have, TypeSpec indirections included
pub const MAX_SIGNATURE_DEPTH: usize = 64;

/// Turns TypeDefOrRef tokens found inside signatures into types
pub trait TypeResolver {
    /// `depth` is the nesting level of the token; pass it on when decoding a TypeSpec
    fn resolve_token(&self, table: TableId, row: u32, depth: usize) -> MetadataResult<TypeSig>;
}

/// Summary of a MethodDef signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    pub has_this: bool,
    pub generic_params: u32,
    pub param_count: u32,
}

/// Decoder over a single signature blob
pub struct SignatureDecoder<'a, 'r, R: TypeResolver + ?Sized> {
    reader: ByteReader<'a>,
    resolver: &'r R,
    depth: usize,
}

impl<'a, 'r, R: TypeResolver + ?Sized> SignatureDecoder<'a, 'r, R> {
    pub fn new(blob: &'a [u8], resolver: &'r R) -> Self {
        Self::nested(blob, resolver, 0)
    }

    /// Decoder for a blob reached from another signature at `depth`
    pub fn nested(blob: &'a [u8], resolver: &'r R, depth: usize) -> Self {
        Self {
            reader: ByteReader::new(blob),
            resolver,
            depth,
        }
    }

    /// Decode a PropertySig and return the property type
    pub fn property(mut self) -> MetadataResult<TypeSig> {
        let lead = self.reader.u8()?;
        if lead & !SIG_HAS_THIS != SIG_PROPERTY {
            return Err(MetadataError::InvalidSignature(format!("expected property signature, found {lead:#04x}")));
        }
        let _param_count = self.reader.compressed_u32()?;
        self.skip_custom_mods()?;
        self.type_sig(self.depth)
    }

    /// Decode the calling convention and counts of a MethodDefSig
    pub fn method(mut self) -> MetadataResult<MethodSignature> {
        let lead = self.reader.u8()?;
        let generic_params = if lead & SIG_GENERIC != 0 { self.reader.compressed_u32()? } else { 0 };
        let param_count = self.reader.compressed_u32()?;
        Ok(MethodSignature {
            has_this: lead & SIG_HAS_THIS != 0,
            generic_params,
            param_count,
        })
    }

    /// Decode a TypeSpec blob
    pub fn type_spec(mut self) -> MetadataResult<TypeSig> {
        self.type_sig(self.depth)
    }

    fn skip_custom_mods(&mut self) -> MetadataResult<()> {
        loop {
            let mut peek = self.reader;
            match peek.u8() {
                Ok(element::CMOD_REQD | element::CMOD_OPT) => {
                    self.reader = peek;
                    self.reader.compressed_u32()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn type_def_or_ref(&mut self, depth: usize) -> MetadataResult<TypeSig> {
        let encoded = self.reader.compressed_u32()?;
        let row = encoded >> 2;
        let table = match encoded & 0x3 {
            0 => TableId::TypeDef,
            1 => TableId::TypeRef,
            2 => TableId::TypeSpec,
            _ => return Err(MetadataError::InvalidSignature(format!("bad TypeDefOrRefEncoded value {encoded:#x}"))),
        };
        self.resolver.resolve_token(table, row, depth + 1)
    }

    fn type_sig(&mut self, depth: usize) -> MetadataResult<TypeSig> {
        if depth >= MAX_SIGNATURE_DEPTH {
            return Err(MetadataError::InvalidSignature(format!("type nested deeper than {MAX_SIGNATURE_DEPTH} levels")));
        }
        self.skip_custom_mods()?;
        let element_type = self.reader.u8()?;
        let sig = match element_type {
            element::VOID => TypeSig::Primitive(Primitive::Void),
            element::BOOLEAN => TypeSig::Primitive(Primitive::Bool),
            element::CHAR => TypeSig::Primitive(Primitive::Char),
            element::I1 => TypeSig::Primitive(Primitive::I8),
            element::U1 => TypeSig::Primitive(Primitive::U8),
            element::I2 => TypeSig::Primitive(Primitive::I16),
            element::U2 => TypeSig::Primitive(Primitive::U16),
            element::I4 => TypeSig::Primitive(Primitive::I32),
            element::U4 => TypeSig::Primitive(Primitive::U32),
            element::I8 => TypeSig::Primitive(Primitive::I64),
            element::U8 => TypeSig::Primitive(Primitive::U64),
            element::R4 => TypeSig::Primitive(Primitive::F32),
            element::R8 => TypeSig::Primitive(Primitive::F64),
            element::I => TypeSig::Primitive(Primitive::ISize),
            element::U => TypeSig::Primitive(Primitive::USize),
            element::STRING => TypeSig::String,
            element::OBJECT => TypeSig::Object,
            element::CLASS => self.type_def_or_ref(depth)?,
            element::VALUETYPE => mark_value_type(self.type_def_or_ref(depth)?),
            element::SZARRAY => TypeSig::Array(Box::new(self.type_sig(depth + 1)?)),
            element::BYREF => TypeSig::ByRef(Box::new(self.type_sig(depth + 1)?)),
            element::PTR => TypeSig::Pointer(Box::new(self.type_sig(depth + 1)?)),
            element::VAR => TypeSig::GenericParam {
                index: self.reader.compressed_u32()?,
                method: false,
            },
            element::MVAR => TypeSig::GenericParam {
                index: self.reader.compressed_u32()?,
                method: true,
            },
            element::GENERICINST => {
                let kind = self.reader.u8()?;
                let base = self.type_def_or_ref(depth)?;
                let count = self.reader.compressed_u32()?;
                // The count is untrusted; each argument needs at least one byte
                if count as usize > self.reader.remaining() {
                    return Err(MetadataError::InvalidSignature(format!("{count} generic arguments in a {} byte remainder", self.reader.remaining())));
                }
                let mut generics = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    generics.push(self.type_sig(depth + 1)?);
                }
                match base {
                    TypeSig::Named(mut name) => {
                        name.generics = generics;
                        name.value_type = kind == element::VALUETYPE;
                        TypeSig::Named(name)
                    }
                    other => return Err(MetadataError::InvalidSignature(format!("generic instantiation of non-named type {other}"))),
                }
            }
            other => return Err(MetadataError::InvalidSignature(format!("unsupported element type {other:#04x}"))),
        };
        Ok(sig)
    }
}

fn mark_value_type(sig: TypeSig) -> TypeSig {
    match sig {
        TypeSig::Named(mut name) => {
            name.value_type = true;
            TypeSig::Named(name)
        }
        other => other,
    }
}
