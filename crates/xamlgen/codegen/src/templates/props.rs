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

//! `Props.ts`: one prop interface per projected type

use std::fmt::{self, Write};

use xamlgen_winmd::{MAX_ANCESTOR_DEPTH, TypeDescriptor, TypeGraph};

use super::{ArtifactTemplate, BANNER, camel_case, script_names, ts_value_type};
use crate::collector::CollectedMembers;
use crate::emitter::ArtifactKind;

pub struct PropsTemplate<'a> {
    pub graph: &'a TypeGraph,
    /// Projected types in metadata order
    pub types: &'a [&'a TypeDescriptor],
    pub members: &'a CollectedMembers<'a>,
}

impl ArtifactTemplate for PropsTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::Props
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        let names = script_names(self.types);

        writeln!(out, "{BANNER}")?;
        writeln!(out, "import type {{ ColorValue, NativeSyntheticEvent, ViewProps }} from 'react-native';")?;
        writeln!(out)?;
        writeln!(out, "export interface NativeXamlEvent {{")?;
        writeln!(out, "  sender: any;")?;
        writeln!(out, "  args: any;")?;
        writeln!(out, "}}")?;

        for ty in self.types {
            let full_name = ty.full_name();
            let Some(name) = names.get(&full_name) else {
                continue;
            };
            // Nearest projected ancestor, if any
            let parent = self
                .graph
                .ancestors(ty)
                .take(MAX_ANCESTOR_DEPTH)
                .find_map(|ancestor| names.get(&ancestor))
                .map_or_else(|| "ViewProps".to_string(), |parent| format!("{parent}Props"));

            writeln!(out)?;
            writeln!(out, "export interface {name}Props extends {parent} {{")?;
            for property in self.members.properties_of(&full_name) {
                writeln!(out, "  {}?: {};", camel_case(property.name()), ts_value_type(self.graph, &property.descriptor.value_type))?;
            }
            for event in self.members.events_of(&full_name) {
                writeln!(out, "  on{}?: (event: NativeSyntheticEvent<NativeXamlEvent>) => void;", event.name)?;
            }
            writeln!(out, "}}")?;
        }
        Ok(())
    }
}
