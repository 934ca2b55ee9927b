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

//! Error types for binding generation

use std::path::PathBuf;
use thiserror::Error;
use xamlgen_winmd::MetadataError;

/// Errors that can occur while generating binding sources
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Failed to load metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Cannot read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Output directory {0:?} does not exist")]
    MissingOutputDirectory(PathBuf),

    #[error("Failed to render {artifact}")]
    Render { artifact: &'static str },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for generation operations
pub type CodegenResult<T> = Result<T, CodegenError>;
