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

//! `EnumConverters.g.cpp`: string to enum parsers

use std::fmt::{self, Write};

use xamlgen_winmd::TypeDescriptor;

use super::{ArtifactTemplate, BANNER, cpp_type_name};
use crate::emitter::ArtifactKind;

pub struct EnumConvertersTemplate<'a> {
    /// Enum types referenced by emitted properties, sorted by full name
    pub enums: &'a [&'a TypeDescriptor],
}

impl ArtifactTemplate for EnumConvertersTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::EnumConverters
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "#include \"pch.h\"")?;
        writeln!(out, "#include \"XamlMetadata.h\"")?;
        writeln!(out)?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "template<typename T> T ParseEnum(const std::string_view& value);")?;
        for enumeration in self.enums {
            let full_name = enumeration.full_name();
            let cpp_name = cpp_type_name(&full_name);
            writeln!(out)?;
            writeln!(out, "template<>")?;
            writeln!(out, "{cpp_name} ParseEnum<{cpp_name}>(const std::string_view& value) {{")?;
            for member in &enumeration.enum_members {
                writeln!(out, "  if (value == \"{}\") {{", member.name)?;
                writeln!(out, "    return {cpp_name}::{};", member.name)?;
                writeln!(out, "  }}")?;
            }
            writeln!(out, "  throw std::invalid_argument(\"Invalid value for {full_name}\");")?;
            writeln!(out, "}}")?;
        }
        Ok(())
    }
}
