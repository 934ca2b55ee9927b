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

//! End-to-end generation: load metadata, select types, render, write

use std::path::PathBuf;

use tracing::{info, info_span};
use xamlgen_winmd::{AssemblyId, LoadContext, TypeDescriptor, TypeGraph};

use crate::collector::CollectedMembers;
use crate::config::GeneratorConfig;
use crate::emitter::{Emitter, OutputRoots, RenderedArtifact};
use crate::error::CodegenResult;
use crate::filter::{TypeFilter, creatable_types};
use crate::templates::{ArtifactTemplate, EnumConvertersTemplate, PropsTemplate, TypeCreatorTemplate, TypeEventsTemplate, TypePropertiesTemplate, TypesTemplate};

/// Counts describing one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub types: usize,
    pub creatable: usize,
    pub properties: usize,
    pub events: usize,
    pub enums: usize,
}

/// Result of [`GenerationPipeline::execute`]
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub stats: GenerationStats,
    pub written: Vec<PathBuf>,
}

/// Render every artifact for the projected types of `assembly`.
///
/// Artifacts come back in [`ArtifactKind::ALL`](crate::emitter::ArtifactKind::ALL) order.
pub fn render_artifacts(graph: &TypeGraph, assembly: AssemblyId, filter: &TypeFilter) -> CodegenResult<(Vec<RenderedArtifact>, GenerationStats)> {
    let types: Vec<&TypeDescriptor> = filter.select(graph, assembly);
    let creatable = creatable_types(&types);
    let members = CollectedMembers::collect(graph, &types);
    let enums = members.enum_types();

    let stats = GenerationStats {
        types: types.len(),
        creatable: creatable.len(),
        properties: members.properties.len(),
        events: members.events.len(),
        enums: enums.len(),
    };
    info!(types = stats.types, creatable = stats.creatable, properties = stats.properties, events = stats.events, enums = stats.enums, "selected members");

    let templates: [&dyn ArtifactTemplate; 6] = [
        &TypeCreatorTemplate { types: &creatable },
        &TypePropertiesTemplate { properties: &members.properties },
        &EnumConvertersTemplate { enums: &enums },
        &TypeEventsTemplate { events: &members.events },
        &PropsTemplate {
            graph,
            types: &types,
            members: &members,
        },
        &TypesTemplate {
            types: &types,
            creatable: &creatable,
        },
    ];
    let artifacts = templates.iter().map(|template| template.render()).collect::<CodegenResult<Vec<_>>>()?;
    Ok((artifacts, stats))
}

/// One configured generation run
pub struct GenerationPipeline {
    config: GeneratorConfig,
    primary: Option<PathBuf>,
    outputs: OutputRoots,
}

impl GenerationPipeline {
    pub fn new(config: GeneratorConfig, outputs: OutputRoots) -> Self {
        Self { config, primary: None, outputs }
    }

    /// Metadata whose types are projected; the system metadata when unset
    pub fn with_primary(mut self, primary: Option<PathBuf>) -> Self {
        self.primary = primary;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Load the system metadata, the references, then the primary file
    pub fn load(&self) -> CodegenResult<(TypeGraph, AssemblyId)> {
        let _span = info_span!("load").entered();
        let mut context = self
            .config
            .contract_replacements
            .iter()
            .fold(LoadContext::new(), |context, (contract, target)| context.with_contract_replacement(contract, target));

        let system = context.load_from_path(&self.config.system_winmd)?;
        for reference in &self.config.references {
            context.load_from_path(reference)?;
        }
        let primary = match &self.primary {
            Some(path) => context.load_from_path(path)?,
            None => system,
        };
        Ok((context.finish_loading(), primary))
    }

    /// Run the whole pipeline; nothing is written unless every artifact rendered
    pub fn execute(&self) -> CodegenResult<GenerationReport> {
        let (graph, primary) = self.load()?;
        info!(assembly = graph.assembly_name(primary).unwrap_or_default(), "generating bindings");

        let filter = TypeFilter::new(self.config.base_types.clone(), self.config.root_type.clone());
        let (artifacts, stats) = {
            let _span = info_span!("render").entered();
            render_artifacts(&graph, primary, &filter)?
        };

        let _span = info_span!("emit").entered();
        let written = Emitter::new(self.outputs.clone()).write_all(&artifacts)?;
        info!(files = written.len(), native = %self.outputs.native.display(), script = %self.outputs.script.display(), "generation complete");
        Ok(GenerationReport { stats, written })
    }
}
