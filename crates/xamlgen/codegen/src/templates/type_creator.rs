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

//! `TypeCreator.g.cpp`: activation of creatable types by name

use std::fmt::{self, Write};

use xamlgen_winmd::TypeDescriptor;

use super::{ArtifactTemplate, BANNER, cpp_type_name};
use crate::emitter::ArtifactKind;

pub struct TypeCreatorTemplate<'a> {
    /// Creatable types, already sorted
    pub types: &'a [&'a TypeDescriptor],
}

impl ArtifactTemplate for TypeCreatorTemplate<'_> {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::TypeCreator
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "#include \"pch.h\"")?;
        writeln!(out, "#include \"XamlMetadata.h\"")?;
        writeln!(out, "#include \"Crc32Str.h\"")?;
        writeln!(out, "#include <winstring.h>")?;
        writeln!(out)?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "winrt::Windows::Foundation::IInspectable XamlMetadata::Create(const std::string_view& typeName) const {{")?;
        for ty in self.types {
            writeln!(out, "  if (typeName == \"{}\") {{", ty.full_name())?;
            writeln!(out, "    return {}();", cpp_type_name(&ty.full_name()))?;
            writeln!(out, "  }}")?;
        }
        if !self.types.is_empty() {
            writeln!(out)?;
        }
        // Anything else goes through the activation factory
        out.push_str(
            r#"  wchar_t buf[128]{};
  for (auto i = 0u; i < typeName.size() && i < ARRAYSIZE(buf) - 1; i++) {
    buf[i] = static_cast<wchar_t>(typeName[i]);
  }

  HSTRING clsid = nullptr;
  if (SUCCEEDED(WindowsCreateString(buf, static_cast<UINT32>(wcslen(buf)), &clsid))) {
    winrt::com_ptr<::IInspectable> insp{ nullptr };
    if (SUCCEEDED(RoActivateInstance(clsid, insp.put()))) {
      winrt::IUnknown unk{ nullptr };
      winrt::copy_from_abi(unk, insp.get());
      WindowsDeleteString(clsid);
      return unk.as<winrt::IInspectable>();
    }
  }
  WindowsDeleteString(clsid);
  assert(false && "xaml type not found");
  return nullptr;
}
"#,
        );
        Ok(())
    }
}
