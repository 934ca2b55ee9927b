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

//! Immutable descriptors of the types and members found in metadata

use crate::signature::{TypeName, TypeSig, join_name};

/// TypeDef attribute bits used by the loader (ECMA-335 II.23.1.15)
pub mod type_attributes {
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;
    pub const PUBLIC: u32 = 0x0000_0001;
    pub const INTERFACE: u32 = 0x0000_0020;
    pub const ABSTRACT: u32 = 0x0000_0080;
    pub const SEALED: u32 = 0x0000_0100;
    pub const WINDOWS_RUNTIME: u32 = 0x0000_4000;
}

/// MethodDef attribute bits (ECMA-335 II.23.1.10)
pub mod method_attributes {
    pub const MEMBER_ACCESS_MASK: u16 = 0x0007;
    pub const PUBLIC: u16 = 0x0006;
    pub const STATIC: u16 = 0x0010;
    pub const SPECIAL_NAME: u16 = 0x0800;
    pub const RT_SPECIAL_NAME: u16 = 0x1000;
}

/// What a type definition is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Struct,
    Delegate,
}

/// A type definition from a loaded metadata file
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub namespace: String,
    pub name: String,
    /// Name of the assembly that defines the type
    pub assembly: String,
    pub kind: TypeKind,
    pub attributes: u32,
    pub base: Option<TypeName>,
    /// A public, instance, zero-parameter `.ctor` exists
    pub has_default_constructor: bool,
    pub properties: Vec<PropertyDescriptor>,
    pub events: Vec<EventDescriptor>,
    pub enum_members: Vec<EnumMember>,
}

impl TypeDescriptor {
    pub fn full_name(&self) -> String {
        join_name(&self.namespace, &self.name)
    }

    pub fn is_public(&self) -> bool {
        self.attributes & type_attributes::VISIBILITY_MASK == type_attributes::PUBLIC
    }

    pub fn is_abstract(&self) -> bool {
        self.attributes & type_attributes::ABSTRACT != 0
    }

    pub fn is_sealed(&self) -> bool {
        self.attributes & type_attributes::SEALED != 0
    }

    pub fn is_windows_runtime(&self) -> bool {
        self.attributes & type_attributes::WINDOWS_RUNTIME != 0
    }

    /// Full name of the base type, if any
    pub fn base_name(&self) -> Option<String> {
        self.base.as_ref().map(TypeName::full_name)
    }
}

/// A property accessor or event add/remove method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: String,
    pub is_public: bool,
    pub is_static: bool,
}

impl Accessor {
    pub(crate) fn from_flags(name: impl Into<String>, flags: u16) -> Self {
        Self {
            name: name.into(),
            is_public: flags & method_attributes::MEMBER_ACCESS_MASK == method_attributes::PUBLIC,
            is_static: flags & method_attributes::STATIC != 0,
        }
    }
}

/// A property declared on a type
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    /// Full name of the declaring type
    pub declaring_type: String,
    pub value_type: TypeSig,
    pub getter: Option<Accessor>,
    pub setter: Option<Accessor>,
}

impl PropertyDescriptor {
    pub fn is_static(&self) -> bool {
        self.getter.iter().chain(self.setter.iter()).any(|accessor| accessor.is_static)
    }

    pub fn has_public_getter(&self) -> bool {
        self.getter.as_ref().is_some_and(|getter| getter.is_public)
    }

    pub fn has_public_setter(&self) -> bool {
        self.setter.as_ref().is_some_and(|setter| setter.is_public)
    }
}

/// An event declared on a type
#[derive(Debug, Clone, PartialEq)]
pub struct EventDescriptor {
    pub name: String,
    /// Full name of the declaring type
    pub declaring_type: String,
    pub handler_type: TypeSig,
    pub add: Option<Accessor>,
    pub remove: Option<Accessor>,
}

impl EventDescriptor {
    pub fn is_static(&self) -> bool {
        self.add.iter().chain(self.remove.iter()).any(|accessor| accessor.is_static)
    }
}

/// A named constant of an enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}
