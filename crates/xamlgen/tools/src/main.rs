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

//! xamlgen
//!
//! Generates the React Native XAML native and TypeScript bindings from
//! Windows Runtime metadata.

use std::path::Path;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xamlgen_tools::{help_text, parse, run};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xamlgen=info")))
        .with_writer(std::io::stderr)
        .init();

    let request = match parse(std::env::args_os().skip(1)) {
        Ok(request) => request,
        Err(err) => {
            eprint!("{}", help_text());
            return Err(err.into());
        }
    };
    if request.help {
        print!("{}", help_text());
        return Ok(());
    }

    let exe = std::env::current_exe().context("failed to locate the executable")?;
    let exe_dir = exe.parent().unwrap_or(Path::new("."));

    let report = run(&request, exe_dir)?;
    info!(
        types = report.stats.types,
        creatable = report.stats.creatable,
        properties = report.stats.properties,
        events = report.stats.events,
        enums = report.stats.enums,
        files = report.written.len(),
        "bindings generated"
    );
    Ok(())
}
