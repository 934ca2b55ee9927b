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

//! Error types for metadata loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading WinMD metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Cannot read metadata file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed metadata in {path:?}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<MetadataError>,
    },

    #[error("Invalid PE image: {0}")]
    InvalidImage(String),

    #[error("Unexpected end of data at offset {offset} (needed {needed} bytes, {available} available)")]
    UnexpectedEof { offset: usize, needed: usize, available: usize },

    #[error("Invalid metadata root magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Missing required metadata stream: {0}")]
    MissingStream(&'static str),

    #[error("Invalid {heap} heap index: {index}")]
    InvalidHeapIndex { heap: &'static str, index: u32 },

    #[error("Invalid row {row} in table {table}")]
    InvalidRow { table: &'static str, row: u32 },

    #[error("Invalid coded index {value:#x} for {kind}")]
    InvalidCodedIndex { kind: &'static str, value: u32 },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("String heap entry is not valid UTF-8: {0}")]
    InvalidString(#[from] std::str::Utf8Error),
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;
