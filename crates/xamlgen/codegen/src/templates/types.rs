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

//! `Types.tsx`: prop type aliases and components for creatable types

use std::fmt::{self, Write};

use xamlgen_winmd::TypeDescriptor;

use super::{ArtifactTemplate, BANNER, script_names};
use crate::emitter::ArtifactKind;

pub struct TypesTemplate<'a> {
    /// Projected types in metadata order
    pub types: &'a [&'a TypeDescriptor],
    /// Creatable subset, sorted
    pub creatable: &'a [&'a TypeDescriptor],
}

impl ArtifactTemplate for TypesTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::Types
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        let names = script_names(self.types);

        writeln!(out, "{BANNER}")?;
        writeln!(out, "import React from 'react';")?;
        writeln!(out, "import {{ requireNativeComponent }} from 'react-native';")?;
        writeln!(out, "import type {{ ViewProps }} from 'react-native';")?;
        writeln!(out, "import type * as Props from './Props';")?;
        writeln!(out)?;
        writeln!(out, "const XamlControl = requireNativeComponent<ViewProps & {{ type: string }}>('XamlControl');")?;

        if !self.types.is_empty() {
            writeln!(out)?;
        }
        for ty in self.types {
            if let Some(name) = names.get(&ty.full_name()) {
                writeln!(out, "export type {name}Props = Props.{name}Props;")?;
            }
        }

        for ty in self.creatable {
            let full_name = ty.full_name();
            let Some(name) = names.get(&full_name) else {
                continue;
            };
            writeln!(out)?;
            writeln!(out, "export function {name}(props: {name}Props) {{")?;
            writeln!(out, "  return <XamlControl {{...props}} type=\"{full_name}\" />;")?;
            writeln!(out, "}}")?;
        }
        Ok(())
    }
}
