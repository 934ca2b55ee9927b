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

//! Text templates for the generated artifacts
//!
//! Each template is a pure function of its (already ordered) input, so the
//! same metadata always renders byte-identical files.
//!
//! - `type_creator`: native activation table for creatable types
//! - `type_properties`: native property metadata table
//! - `enum_converters`: native string to enum parsers
//! - `type_events`: native event metadata table
//! - `props`: TypeScript prop interfaces
//! - `types`: TypeScript type aliases and components

pub mod enum_converters;
pub mod props;
pub mod type_creator;
pub mod type_events;
pub mod type_properties;
pub mod types;

use std::collections::HashMap;
use std::fmt;

use xamlgen_winmd::{Primitive, TypeDescriptor, TypeGraph, TypeSig};

use crate::collector::{PropertyKind, property_kind};
use crate::emitter::{ArtifactKind, RenderedArtifact};
use crate::error::{CodegenError, CodegenResult};

pub use enum_converters::EnumConvertersTemplate;
pub use props::PropsTemplate;
pub use type_creator::TypeCreatorTemplate;
pub use type_events::TypeEventsTemplate;
pub use type_properties::TypePropertiesTemplate;
pub use types::TypesTemplate;

pub const BANNER: &str = "/*************************************************************
THIS FILE WAS AUTOMATICALLY GENERATED, DO NOT MODIFY MANUALLY
**************************************************************/
";

/// A template producing one artifact
pub trait ArtifactTemplate {
    /// The artifact this template renders
    fn artifact(&self) -> ArtifactKind;

    /// Write the artifact text
    fn write_to(&self, out: &mut String) -> fmt::Result;

    /// Render into an owned artifact
    fn render(&self) -> CodegenResult<RenderedArtifact> {
        let mut content = String::new();
        self.write_to(&mut content).map_err(|_| CodegenError::Render {
            artifact: self.artifact().file_name(),
        })?;
        Ok(RenderedArtifact {
            kind: self.artifact(),
            content,
        })
    }
}

/// `Windows.UI.Xaml.Controls.Button` -> `winrt::Windows::UI::Xaml::Controls::Button`
pub fn cpp_type_name(full_name: &str) -> String {
    let without_arity = full_name.split('`').next().unwrap_or(full_name);
    format!("winrt::{}", without_arity.replace('.', "::"))
}

/// C++/WinRT spelling of a signature type
pub fn cpp_value_type(sig: &TypeSig) -> String {
    match sig {
        TypeSig::Primitive(primitive) => match primitive {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Char => "char16_t",
            Primitive::I8 => "int8_t",
            Primitive::U8 => "uint8_t",
            Primitive::I16 => "int16_t",
            Primitive::U16 => "uint16_t",
            Primitive::I32 => "int32_t",
            Primitive::U32 => "uint32_t",
            Primitive::I64 => "int64_t",
            Primitive::U64 => "uint64_t",
            Primitive::F32 => "float",
            Primitive::F64 => "double",
            Primitive::ISize => "intptr_t",
            Primitive::USize => "uintptr_t",
        }
        .to_string(),
        TypeSig::String => "winrt::hstring".to_string(),
        TypeSig::Named(name) if name.generics.is_empty() => cpp_type_name(&name.full_name()),
        TypeSig::Named(name) => {
            let arguments: Vec<String> = name.generics.iter().map(cpp_value_type).collect();
            format!("{}<{}>", cpp_type_name(&name.full_name()), arguments.join(", "))
        }
        TypeSig::Array(element) => format!("winrt::com_array<{}>", cpp_value_type(element)),
        TypeSig::ByRef(inner) | TypeSig::Pointer(inner) => cpp_value_type(inner),
        TypeSig::Object | TypeSig::GenericParam { .. } => "winrt::Windows::Foundation::IInspectable".to_string(),
    }
}

/// `IsEnabled` -> `isEnabled`
pub fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// TypeScript spelling of a property value type
pub fn ts_value_type(graph: &TypeGraph, sig: &TypeSig) -> String {
    match property_kind(graph, sig) {
        PropertyKind::Boolean => "boolean".to_string(),
        PropertyKind::Number => "number".to_string(),
        PropertyKind::Color => "ColorValue".to_string(),
        PropertyKind::Map => "object".to_string(),
        PropertyKind::Unknown => "any".to_string(),
        PropertyKind::String => match graph.resolve(sig).filter(|ty| !ty.enum_members.is_empty()) {
            Some(enumeration) => enumeration.enum_members.iter().map(|member| format!("'{}'", member.name)).collect::<Vec<_>>().join(" | "),
            None => "string".to_string(),
        },
        PropertyKind::Array => {
            let element = match sig {
                TypeSig::Array(element) => ts_value_type(graph, element),
                TypeSig::Named(name) => name.generics.first().map_or_else(|| "any".to_string(), |argument| ts_value_type(graph, argument)),
                _ => "any".to_string(),
            };
            if element.contains(' ') { format!("({element})[]") } else { format!("{element}[]") }
        }
    }
}

/// Script identifiers for projected types: the short name, or the full name
/// with dots replaced when two projected types share a short name
pub fn script_names(types: &[&TypeDescriptor]) -> HashMap<String, String> {
    let mut short_counts: HashMap<&str, usize> = HashMap::new();
    for ty in types {
        *short_counts.entry(ty.name.as_str()).or_default() += 1;
    }
    types
        .iter()
        .map(|ty| {
            let identifier = if short_counts.get(ty.name.as_str()).copied().unwrap_or(0) > 1 { ty.full_name() } else { ty.name.clone() };
            (ty.full_name(), identifier.replace(['.', '`'], "_"))
        })
        .collect()
}
