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

//! `TypeEvents.g.h`: event metadata

use std::fmt::{self, Write};

use xamlgen_winmd::EventDescriptor;

use super::{ArtifactTemplate, BANNER, cpp_type_name};
use crate::emitter::ArtifactKind;

pub struct TypeEventsTemplate<'a> {
    /// Accepted events in collection order
    pub events: &'a [&'a EventDescriptor],
}

impl ArtifactTemplate for TypeEventsTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::TypeEvents
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "#pragma once")?;
        writeln!(out)?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "#include \"XamlMetadata.h\"")?;
        writeln!(out)?;
        writeln!(out, "inline const std::vector<EventInfo> xamlEventMap{{")?;
        for event in self.events {
            writeln!(
                out,
                "  {{ \"{name}\", [](const winrt::Windows::Foundation::IInspectable& o, const EventAttachCallback& cb) -> winrt::event_token {{",
                name = event.name
            )?;
            writeln!(
                out,
                "      return o.as<{owner}>().{name}([cb](const auto& sender, const auto& args) {{ cb(sender, args); }});",
                owner = cpp_type_name(&event.declaring_type),
                name = event.name
            )?;
            writeln!(out, "    }} }},")?;
        }
        writeln!(out, "}};")
    }
}
