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

//! WinMD metadata loading
//!
//! This crate reads Windows Runtime metadata files (ECMA-335 images with the
//! WinRT extensions) into an immutable [`TypeGraph`]: type definitions with
//! their base types, properties, events, constructors and enum values, linked
//! by full name across every file loaded into a [`LoadContext`].
//!
//! Only the parts of the format needed to describe a type surface are decoded;
//! method bodies, custom attributes and generic constraints are sized but
//! otherwise skipped.

pub mod context;
pub mod descriptor;
pub mod error;
pub mod module;
pub mod pe;
pub mod reader;
pub mod signature;
pub mod streams;
pub mod tables;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use context::{AssemblyId, LoadContext, MAX_ANCESTOR_DEPTH, ResolutionReport, TypeGraph};
pub use descriptor::{Accessor, EnumMember, EventDescriptor, PropertyDescriptor, TypeDescriptor, TypeKind};
pub use error::{MetadataError, MetadataResult};
pub use signature::{MAX_SIGNATURE_DEPTH, Primitive, TypeName, TypeSig};
