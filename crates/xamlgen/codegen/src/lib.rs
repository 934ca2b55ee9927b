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

//! Binding generation for React Native XAML
//!
//! Walks the type graph produced by `xamlgen-winmd`, selects the types that
//! derive from the configured XAML base classes, collects their bindable
//! properties and events, and renders the native and TypeScript sources that
//! the React Native XAML package compiles against.
//!
//! - `config`: project settings loaded from TOML
//! - `filter`: inheritance based type selection
//! - `collector`: property and event inclusion rules
//! - `templates`: one text template per generated file
//! - `emitter`: output directories and file writes
//! - `pipeline`: the end-to-end run

pub mod collector;
pub mod config;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod templates;

pub use collector::{CollectedMembers, CollectedProperty, PropertyKind};
pub use config::GeneratorConfig;
pub use emitter::{ArtifactKind, Emitter, OutputRoot, OutputRoots, RenderedArtifact};
pub use error::{CodegenError, CodegenResult};
pub use filter::TypeFilter;
pub use pipeline::{GenerationPipeline, GenerationReport, GenerationStats, render_artifacts};
