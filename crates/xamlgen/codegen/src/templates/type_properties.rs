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

//! `TypeProperties.g.h`: dependency property metadata

use std::fmt::{self, Write};

use super::{ArtifactTemplate, BANNER, camel_case, cpp_type_name, cpp_value_type};
use crate::collector::CollectedProperty;
use crate::emitter::ArtifactKind;

pub struct TypePropertiesTemplate<'a> {
    /// Accepted properties, sorted by name
    pub properties: &'a [CollectedProperty<'a>],
}

impl ArtifactTemplate for TypePropertiesTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::TypeProperties
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "#pragma once")?;
        writeln!(out)?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "#include \"XamlMetadata.h\"")?;
        writeln!(out)?;
        writeln!(out, "inline const std::vector<PropInfo> xamlPropertyMap{{")?;
        for property in self.properties {
            let owner = cpp_type_name(property.declaring_type());
            writeln!(
                out,
                "  {{ \"{key}\", IsType<{owner}>, []() {{ return {owner}::{name}Property(); }}, SetPropValue<{value}>, ViewManagerPropertyType::{kind} }},",
                key = camel_case(property.name()),
                name = property.name(),
                value = cpp_value_type(&property.descriptor.value_type),
                kind = property.kind,
            )?;
        }
        writeln!(out, "}};")
    }
}
