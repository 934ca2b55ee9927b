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

//! xamlgen command line tool
//!
//! Turns parsed arguments into a generation run: picks the configuration
//! file, works out both output directories and hands over to
//! [`GenerationPipeline`].

pub mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use xamlgen_codegen::{GenerationPipeline, GenerationReport, GeneratorConfig, OutputRoots};

pub use cli::{CliError, GenerationRequest, help_text, parse};

/// Output directories for a request: command line, then config, then
/// locations relative to `exe_dir`
pub fn output_roots(request: &GenerationRequest, config: &GeneratorConfig, exe_dir: &Path) -> OutputRoots {
    OutputRoots::new(
        request.cpp_out.clone().unwrap_or_else(|| config.native_output_dir(exe_dir)),
        request.ts_out.clone().unwrap_or_else(|| config.script_output_dir(exe_dir)),
    )
}

/// Run one generation for `request`
pub fn run(request: &GenerationRequest, exe_dir: &Path) -> Result<GenerationReport> {
    let config = GeneratorConfig::resolve(request.config.as_deref()).context("failed to load configuration")?;
    let outputs = output_roots(request, &config, exe_dir);
    info!(system = %config.system_winmd.display(), native = %outputs.native.display(), script = %outputs.script.display(), "starting generation");

    let report = GenerationPipeline::new(config, outputs).with_primary(request.winmd.clone()).execute()?;
    Ok(report)
}
