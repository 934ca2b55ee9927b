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

//! Member collection: properties and events that get metadata entries

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::debug;
use xamlgen_winmd::{EventDescriptor, Primitive, PropertyDescriptor, TypeDescriptor, TypeGraph, TypeKind, TypeSig};

use crate::filter::derives_from;

const BRUSH: &str = "Windows.UI.Xaml.Media.Brush";

/// How a property value travels between script and native code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum PropertyKind {
    Unknown = -1,
    Boolean = 0,
    Number = 1,
    String = 2,
    Array = 3,
    Map = 4,
    Color = 5,
}

impl PropertyKind {
    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Unknown => "Unknown",
            PropertyKind::Boolean => "Boolean",
            PropertyKind::Number => "Number",
            PropertyKind::String => "String",
            PropertyKind::Array => "Array",
            PropertyKind::Map => "Map",
            PropertyKind::Color => "Color",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a property value type to its runtime representation
pub fn property_kind(graph: &TypeGraph, sig: &TypeSig) -> PropertyKind {
    match sig {
        TypeSig::Primitive(Primitive::Bool) => PropertyKind::Boolean,
        TypeSig::Primitive(primitive) if primitive.is_numeric() => PropertyKind::Number,
        TypeSig::String => PropertyKind::String,
        TypeSig::Array(_) => PropertyKind::Array,
        TypeSig::Named(name) => match name.full_name().as_str() {
            "Windows.Foundation.TimeSpan" => PropertyKind::Number,
            "Windows.Foundation.Uri" => PropertyKind::String,
            "Windows.UI.Color" | BRUSH => PropertyKind::Color,
            "Windows.Foundation.Collections.IVector`1" | "Windows.Foundation.Collections.IVectorView`1" | "Windows.Foundation.Collections.IIterable`1" => PropertyKind::Array,
            "Windows.Foundation.Collections.IMap`2" | "Windows.Foundation.Collections.IMapView`2" => PropertyKind::Map,
            full_name => match graph.get(full_name) {
                Some(ty) if ty.kind == TypeKind::Enum => PropertyKind::String,
                Some(ty) if ty.kind == TypeKind::Struct => PropertyKind::Map,
                Some(ty) if derives_from(graph, ty, BRUSH) => PropertyKind::Color,
                _ => PropertyKind::Unknown,
            },
        },
        _ => PropertyKind::Unknown,
    }
}

/// Instance, publicly read-write, and of a representable type
pub fn should_emit_property(graph: &TypeGraph, property: &PropertyDescriptor) -> bool {
    !property.is_static() && property.has_public_getter() && property.has_public_setter() && property_kind(graph, &property.value_type) != PropertyKind::Unknown
}

/// Instance event whose handler is a delegate type
pub fn should_emit_event(graph: &TypeGraph, event: &EventDescriptor) -> bool {
    if event.is_static() {
        return false;
    }
    match &event.handler_type {
        TypeSig::Named(name) => graph.get(&name.full_name()).is_none_or(|handler| handler.kind == TypeKind::Delegate),
        _ => false,
    }
}

/// A property accepted for emission
#[derive(Debug, Clone, Copy)]
pub struct CollectedProperty<'g> {
    pub descriptor: &'g PropertyDescriptor,
    pub kind: PropertyKind,
    /// The value type's definition when it is an enum
    pub enum_type: Option<&'g TypeDescriptor>,
}

impl CollectedProperty<'_> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn declaring_type(&self) -> &str {
        &self.descriptor.declaring_type
    }
}

/// Properties and events of the projected types
#[derive(Debug, Clone, Default)]
pub struct CollectedMembers<'g> {
    /// Sorted by name, ties in collection order
    pub properties: Vec<CollectedProperty<'g>>,
    /// Collection order
    pub events: Vec<&'g EventDescriptor>,
}

impl<'g> CollectedMembers<'g> {
    /// Gather eligible members of `types`, walked in the given order
    pub fn collect(graph: &'g TypeGraph, types: &[&'g TypeDescriptor]) -> Self {
        let mut seen_properties = HashSet::new();
        let mut seen_events = HashSet::new();
        let mut properties = Vec::new();
        let mut events = Vec::new();

        for ty in types {
            for property in ty.properties.iter().filter(|p| should_emit_property(graph, p)) {
                if !seen_properties.insert((property.declaring_type.as_str(), property.name.as_str())) {
                    continue;
                }
                let enum_type = graph.resolve(&property.value_type).filter(|resolved| resolved.kind == TypeKind::Enum);
                properties.push(CollectedProperty {
                    descriptor: property,
                    kind: property_kind(graph, &property.value_type),
                    enum_type,
                });
            }
            for event in ty.events.iter().filter(|e| should_emit_event(graph, e)) {
                if seen_events.insert((event.declaring_type.as_str(), event.name.as_str())) {
                    events.push(event);
                }
            }
        }

        properties.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(properties = properties.len(), events = events.len(), "collected members");
        Self { properties, events }
    }

    /// Properties declared by `full_name`, in emission order
    pub fn properties_of<'a>(&'a self, full_name: &'a str) -> impl Iterator<Item = &'a CollectedProperty<'g>> + 'a {
        self.properties.iter().filter(move |p| p.declaring_type() == full_name)
    }

    /// Events declared by `full_name`, in emission order
    pub fn events_of<'a>(&'a self, full_name: &'a str) -> impl Iterator<Item = &'g EventDescriptor> + 'a {
        self.events.iter().copied().filter(move |e| e.declaring_type == full_name)
    }

    /// Distinct enum types used by collected properties, sorted by full name
    pub fn enum_types(&self) -> Vec<&'g TypeDescriptor> {
        let by_name: BTreeMap<String, &TypeDescriptor> = self.properties.iter().filter_map(|p| p.enum_type).map(|ty| (ty.full_name(), ty)).collect();
        by_name.into_values().collect()
    }
}
