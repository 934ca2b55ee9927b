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

//! Writing rendered artifacts to their output directories

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CodegenError, CodegenResult};

/// Which output directory an artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRoot {
    /// C++ sources of the native module
    Native,
    /// TypeScript sources of the package
    Script,
}

/// The generated files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    TypeCreator,
    TypeProperties,
    EnumConverters,
    TypeEvents,
    Props,
    Types,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::TypeCreator,
        ArtifactKind::TypeProperties,
        ArtifactKind::EnumConverters,
        ArtifactKind::TypeEvents,
        ArtifactKind::Props,
        ArtifactKind::Types,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::TypeCreator => "TypeCreator.g.cpp",
            ArtifactKind::TypeProperties => "TypeProperties.g.h",
            ArtifactKind::EnumConverters => "EnumConverters.g.cpp",
            ArtifactKind::TypeEvents => "TypeEvents.g.h",
            ArtifactKind::Props => "Props.ts",
            ArtifactKind::Types => "Types.tsx",
        }
    }

    pub fn root(self) -> OutputRoot {
        match self {
            ArtifactKind::Props | ArtifactKind::Types => OutputRoot::Script,
            _ => OutputRoot::Native,
        }
    }
}

/// A fully rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    pub content: String,
}

impl RenderedArtifact {
    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }
}

/// The two output directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRoots {
    pub native: PathBuf,
    pub script: PathBuf,
}

impl OutputRoots {
    pub fn new(native: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            native: native.into(),
            script: script.into(),
        }
    }

    pub fn dir(&self, root: OutputRoot) -> &Path {
        match root {
            OutputRoot::Native => &self.native,
            OutputRoot::Script => &self.script,
        }
    }

    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.dir(kind.root()).join(kind.file_name())
    }
}

/// Writes artifacts, overwriting existing files
pub struct Emitter {
    roots: OutputRoots,
}

impl Emitter {
    pub fn new(roots: OutputRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &OutputRoots {
        &self.roots
    }

    /// Check that the script directory exists and create the native one
    pub fn prepare(&self) -> CodegenResult<()> {
        if !self.roots.script.is_dir() {
            return Err(CodegenError::MissingOutputDirectory(self.roots.script.clone()));
        }
        if !self.roots.native.is_dir() {
            debug!(path = %self.roots.native.display(), "creating native output directory");
            fs::create_dir_all(&self.roots.native).map_err(|source| CodegenError::Write {
                path: self.roots.native.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Write one artifact and return its path
    pub fn write(&self, artifact: &RenderedArtifact) -> CodegenResult<PathBuf> {
        let path = self.roots.path_of(artifact.kind);
        fs::write(&path, &artifact.content).map_err(|source| CodegenError::Write { path: path.clone(), source })?;
        debug!(path = %path.display(), bytes = artifact.content.len(), "wrote artifact");
        Ok(path)
    }

    /// Prepare the directories, then write every artifact in order.
    ///
    /// Stops at the first failure; files already written stay on disk.
    pub fn write_all(&self, artifacts: &[RenderedArtifact]) -> CodegenResult<Vec<PathBuf>> {
        self.prepare()?;
        artifacts.iter().map(|artifact| self.write(artifact)).collect()
    }
}
