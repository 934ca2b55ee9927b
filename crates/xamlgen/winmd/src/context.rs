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

//! Load context: loads metadata files and links them into a [`TypeGraph`]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::descriptor::TypeDescriptor;
use crate::error::{MetadataError, MetadataResult};
use crate::module::{ModuleData, ReferenceScope, read_module};
use crate::signature::TypeSig;

/// Upper bound on base-type chain walks; real chains are a handful deep
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// Handle of an assembly loaded into a [`LoadContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssemblyId(usize);

struct LoadedModule {
    path: PathBuf,
    data: ModuleData,
}

/// Collects metadata files before they are linked into a [`TypeGraph`]
#[derive(Default)]
pub struct LoadContext {
    modules: Vec<LoadedModule>,
    /// Contract assembly name -> assembly that physically holds its types
    replacements: HashMap<String, String>,
}

impl LoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check references into `contract` against the types of `target`.
    ///
    /// This only decides what [`ResolutionReport`] counts as substituted or
    /// unresolved. [`TypeGraph`] lookups stay by full name across every loaded
    /// file, so a contract type defined outside `target` is still found.
    pub fn with_contract_replacement(mut self, contract: impl Into<String>, target: impl Into<String>) -> Self {
        self.replacements.insert(contract.into(), target.into());
        self
    }

    /// Load a metadata file from disk; loading the same file twice returns the first handle
    pub fn load_from_path(&mut self, path: &Path) -> MetadataResult<AssemblyId> {
        let canonical = fs::canonicalize(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(index) = self.modules.iter().position(|module| module.path == canonical) {
            debug!(path = %canonical.display(), "metadata file already loaded");
            return Ok(AssemblyId(index));
        }
        let bytes = fs::read(&canonical).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_from_bytes(canonical, &bytes)
    }

    /// Load a metadata image already in memory; `origin` labels it in diagnostics
    pub fn load_from_bytes(&mut self, origin: impl Into<PathBuf>, bytes: &[u8]) -> MetadataResult<AssemblyId> {
        let path = origin.into();
        let data = read_module(bytes).map_err(|source| MetadataError::InFile {
            path: path.clone(),
            source: Box::new(source),
        })?;
        debug!(path = %path.display(), assembly = %data.assembly, version = %data.runtime_version, types = data.types.len(), "loaded metadata");
        self.modules.push(LoadedModule { path, data });
        Ok(AssemblyId(self.modules.len() - 1))
    }

    /// Link every loaded module into a single graph
    pub fn finish_loading(self) -> TypeGraph {
        let mut types = Vec::new();
        let mut assemblies = Vec::with_capacity(self.modules.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut by_assembly: HashMap<String, HashSet<String>> = HashMap::new();

        for module in &self.modules {
            let mut members = Vec::with_capacity(module.data.types.len());
            for descriptor in &module.data.types {
                let full_name = descriptor.full_name();
                by_assembly.entry(module.data.assembly.clone()).or_default().insert(full_name.clone());
                if by_name.contains_key(&full_name) {
                    // Every file carries its own `<Module>` row
                    if descriptor.name != "<Module>" {
                        warn!(name = %full_name, assembly = %module.data.assembly, "type already defined by an earlier file");
                    }
                } else {
                    by_name.insert(full_name, types.len());
                }
                members.push(types.len());
                types.push(descriptor.clone());
            }
            assemblies.push(AssemblyTypes {
                name: module.data.assembly.clone(),
                path: module.path.clone(),
                members,
            });
        }

        let report = self.link_references(&by_name, &by_assembly);
        if !report.unresolved.is_empty() {
            warn!(count = report.unresolved.len(), "type references could not be resolved against loaded metadata");
        }
        info!(files = assemblies.len(), types = types.len(), substituted = report.substituted, "metadata loaded");

        TypeGraph {
            assemblies,
            types,
            by_name,
            report,
        }
    }

    fn link_references(&self, by_name: &HashMap<String, usize>, by_assembly: &HashMap<String, HashSet<String>>) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        let mut unresolved = HashSet::new();

        for module in &self.modules {
            for reference in &module.data.references {
                let full_name = reference.name.full_name();
                let resolved = match &reference.scope {
                    // The CLR base library is never part of WinMD input
                    ReferenceScope::AssemblyRef(assembly) if assembly == "mscorlib" || assembly == "System.Runtime" => continue,
                    ReferenceScope::AssemblyRef(assembly) => match self.replacements.get(assembly) {
                        Some(target) => {
                            let found = by_assembly.get(target).is_some_and(|names| names.contains(&full_name));
                            if found {
                                debug!(name = %full_name, contract = %assembly, target = %target, "substituted contract type");
                                report.substituted += 1;
                            }
                            found
                        }
                        None => by_name.contains_key(&full_name),
                    },
                    _ => by_name.contains_key(&full_name),
                };
                if resolved {
                    report.resolved += 1;
                } else if unresolved.insert(full_name.clone()) {
                    debug!(name = %full_name, assembly = %module.data.assembly, "unresolved type reference");
                }
            }
        }

        let mut unresolved: Vec<String> = unresolved.into_iter().collect();
        unresolved.sort();
        report.unresolved = unresolved;
        report
    }
}

/// Outcome of linking TypeRefs across files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: usize,
    /// References into a contract assembly resolved through its replacement
    pub substituted: usize,
    /// Distinct full names that matched no loaded type, sorted
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone)]
struct AssemblyTypes {
    name: String,
    path: PathBuf,
    members: Vec<usize>,
}

/// All types of a run, linked by full name
#[derive(Debug, Clone)]
pub struct TypeGraph {
    assemblies: Vec<AssemblyTypes>,
    types: Vec<TypeDescriptor>,
    by_name: HashMap<String, usize>,
    report: ResolutionReport,
}

impl TypeGraph {
    /// Types of one assembly in metadata order, `<Module>` first
    pub fn assembly_types(&self, assembly: AssemblyId) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.assemblies
            .get(assembly.0)
            .map(|entry| entry.members.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|index| &self.types[*index])
    }

    pub fn assembly_name(&self, assembly: AssemblyId) -> Option<&str> {
        self.assemblies.get(assembly.0).map(|entry| entry.name.as_str())
    }

    pub fn assembly_path(&self, assembly: AssemblyId) -> Option<&Path> {
        self.assemblies.get(assembly.0).map(|entry| entry.path.as_path())
    }

    /// Look a type up by full name
    pub fn get(&self, full_name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(full_name).map(|index| &self.types[*index])
    }

    /// The definition a signature type refers to, if it was loaded
    pub fn resolve(&self, sig: &TypeSig) -> Option<&TypeDescriptor> {
        sig.named().and_then(|name| self.get(&name.full_name()))
    }

    /// Full names of the base types of `ty`, nearest first.
    ///
    /// Stops at the first base that is not loaded (after yielding its name)
    /// or after [`MAX_ANCESTOR_DEPTH`] steps.
    pub fn ancestors<'g>(&'g self, ty: &TypeDescriptor) -> Ancestors<'g> {
        Ancestors {
            graph: self,
            next: ty.base_name(),
            depth: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }
}

/// Iterator over a type's base chain
pub struct Ancestors<'g> {
    graph: &'g TypeGraph,
    next: Option<String>,
    depth: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.depth >= MAX_ANCESTOR_DEPTH {
            return None;
        }
        let current = self.next.take()?;
        self.depth += 1;
        self.next = self.graph.get(&current).and_then(TypeDescriptor::base_name);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EnumMember, TypeKind};
    use crate::signature::Primitive;
    use crate::testing::{Access, PropertyFixture, WinmdBuilder, generic, named};

    fn system_image() -> Vec<u8> {
        WinmdBuilder::new("Windows")
            .class("Windows.UI.Xaml", "UIElement", |t| t.extends("Windows.UI.Xaml", "DependencyObject"))
            .class("Windows.UI.Xaml", "DependencyObject", |t| t)
            .class("Windows.UI.Xaml.Controls", "Button", |t| {
                t.extends("Windows.UI.Xaml", "UIElement")
                    .default_constructor()
                    .property("IsEnabled", TypeSig::Primitive(Primitive::Bool))
                    .property_with(PropertyFixture::new("Tag", TypeSig::Object).setter(Access::Private))
                    .property_with(PropertyFixture::new("IsEnabledProperty", named("Windows.UI.Xaml", "DependencyProperty")).read_only().static_member())
                    .event("Click", named("Windows.UI.Xaml", "RoutedEventHandler"))
                    .event("Loaded", generic("Windows.Foundation", "TypedEventHandler`2", vec![named("Windows.UI.Xaml.Controls", "Button"), TypeSig::Object]))
            })
            .class("Windows.UI.Xaml.Controls", "Slider", |t| t.extends("Windows.UI.Xaml", "UIElement").constructor(Access::Public, 2))
            .enumeration("Windows.UI.Xaml", "Visibility", &[("Visible", 0), ("Collapsed", 1)])
            .build()
    }

    fn load(images: &[(&str, Vec<u8>)], context: LoadContext) -> (TypeGraph, Vec<AssemblyId>) {
        let mut context = context;
        let ids = images.iter().map(|(name, image)| context.load_from_bytes(*name, image).unwrap()).collect();
        (context.finish_loading(), ids)
    }

    #[test]
    fn test_types_keep_metadata_order_with_module_first() {
        let (graph, ids) = load(&[("Windows.winmd", system_image())], LoadContext::new());
        let names: Vec<String> = graph.assembly_types(ids[0]).map(TypeDescriptor::full_name).collect();
        assert_eq!(
            names,
            vec![
                "<Module>",
                "Windows.UI.Xaml.UIElement",
                "Windows.UI.Xaml.DependencyObject",
                "Windows.UI.Xaml.Controls.Button",
                "Windows.UI.Xaml.Controls.Slider",
                "Windows.UI.Xaml.Visibility",
            ]
        );
        assert_eq!(graph.assembly_name(ids[0]), Some("Windows"));
    }

    #[test]
    fn test_decodes_members() {
        let (graph, _) = load(&[("Windows.winmd", system_image())], LoadContext::new());
        let button = graph.get("Windows.UI.Xaml.Controls.Button").unwrap();
        assert_eq!(button.kind, TypeKind::Class);
        assert!(button.is_public());
        assert!(button.has_default_constructor);
        assert_eq!(button.base_name().as_deref(), Some("Windows.UI.Xaml.UIElement"));

        let is_enabled = &button.properties[0];
        assert_eq!(is_enabled.name, "IsEnabled");
        assert_eq!(is_enabled.declaring_type, "Windows.UI.Xaml.Controls.Button");
        assert_eq!(is_enabled.value_type, TypeSig::Primitive(Primitive::Bool));
        assert!(is_enabled.has_public_getter() && is_enabled.has_public_setter());
        assert!(!is_enabled.is_static());

        let tag = &button.properties[1];
        assert!(tag.has_public_getter());
        assert!(!tag.has_public_setter());

        let dependency_property = &button.properties[2];
        assert!(dependency_property.is_static());
        assert!(dependency_property.setter.is_none());

        assert_eq!(button.events.len(), 2);
        assert_eq!(button.events[0].handler_type.to_string(), "Windows.UI.Xaml.RoutedEventHandler");
        assert!(!button.events[0].is_static());
        assert_eq!(button.events[1].handler_type.to_string(), "Windows.Foundation.TypedEventHandler`2<Windows.UI.Xaml.Controls.Button, Object>");

        let slider = graph.get("Windows.UI.Xaml.Controls.Slider").unwrap();
        assert!(!slider.has_default_constructor);

        let visibility = graph.get("Windows.UI.Xaml.Visibility").unwrap();
        assert_eq!(visibility.kind, TypeKind::Enum);
        assert_eq!(
            visibility.enum_members,
            vec![
                EnumMember {
                    name: "Visible".to_string(),
                    value: 0
                },
                EnumMember {
                    name: "Collapsed".to_string(),
                    value: 1
                },
            ]
        );
    }

    #[test]
    fn test_bare_metadata_loads_like_pe_image() {
        let builder = WinmdBuilder::new("Contoso").class("Contoso", "Widget", |t| t.default_constructor());
        let (from_pe, _) = load(&[("a.winmd", builder.build())], LoadContext::new());
        let (from_blob, _) = load(&[("b.winmd", builder.build_metadata())], LoadContext::new());
        assert_eq!(from_pe.get("Contoso.Widget"), from_blob.get("Contoso.Widget"));
    }

    #[test]
    fn test_ancestor_chain() {
        let (graph, _) = load(&[("Windows.winmd", system_image())], LoadContext::new());
        let button = graph.get("Windows.UI.Xaml.Controls.Button").unwrap();
        let chain: Vec<String> = graph.ancestors(button).collect();
        assert_eq!(chain, vec!["Windows.UI.Xaml.UIElement", "Windows.UI.Xaml.DependencyObject", "System.Object"]);
    }

    #[test]
    fn test_ancestor_walk_is_bounded_on_cycles() {
        let image = WinmdBuilder::new("Broken")
            .class("Broken", "A", |t| t.extends("Broken", "B"))
            .class("Broken", "B", |t| t.extends("Broken", "A"))
            .build();
        let (graph, _) = load(&[("broken.winmd", image)], LoadContext::new());
        let a = graph.get("Broken.A").unwrap();
        assert_eq!(graph.ancestors(a).count(), MAX_ANCESTOR_DEPTH);
    }

    #[test]
    fn test_cross_file_references_resolve_by_name() {
        let app = WinmdBuilder::new("Contoso")
            .references_into("Windows")
            .class("Contoso.Controls", "Gauge", |t| t.extends("Windows.UI.Xaml", "UIElement").default_constructor())
            .build();
        let (graph, ids) = load(&[("Windows.winmd", system_image()), ("Contoso.winmd", app)], LoadContext::new());

        let gauge = graph.assembly_types(ids[1]).nth(1).unwrap();
        let chain: Vec<String> = graph.ancestors(gauge).collect();
        assert_eq!(chain, vec!["Windows.UI.Xaml.UIElement", "Windows.UI.Xaml.DependencyObject", "System.Object"]);
        assert!(!graph.report().unresolved.contains(&"Windows.UI.Xaml.UIElement".to_string()));
    }

    #[test]
    fn test_contract_references_use_replacement_assembly() {
        let app = WinmdBuilder::new("Contoso")
            .references_into("Windows.Foundation.UniversalApiContract")
            .class("Contoso.Controls", "Gauge", |t| t.extends("Windows.UI.Xaml", "UIElement"))
            .build();
        let context = LoadContext::new().with_contract_replacement("Windows.Foundation.UniversalApiContract", "Windows");
        let (graph, _) = load(&[("Windows.winmd", system_image()), ("Contoso.winmd", app)], context);

        assert_eq!(graph.report().substituted, 1);
        assert!(!graph.report().unresolved.contains(&"Windows.UI.Xaml.UIElement".to_string()));
    }

    #[test]
    fn test_contract_replacement_only_affects_report() {
        let app = WinmdBuilder::new("Contoso")
            .references_into("Windows.Foundation.UniversalApiContract")
            .class("Contoso.Controls", "Gauge", |t| t.extends("Windows.UI.Xaml", "UIElement"))
            .build();
        let context = LoadContext::new().with_contract_replacement("Windows.Foundation.UniversalApiContract", "Microsoft.UI");
        let (graph, ids) = load(&[("Windows.winmd", system_image()), ("Contoso.winmd", app)], context);

        assert_eq!(graph.report().substituted, 0);
        assert!(graph.report().unresolved.contains(&"Windows.UI.Xaml.UIElement".to_string()));
        let gauge = graph.assembly_types(ids[1]).nth(1).unwrap();
        let chain: Vec<String> = graph.ancestors(gauge).collect();
        assert_eq!(chain[..2], ["Windows.UI.Xaml.UIElement", "Windows.UI.Xaml.DependencyObject"]);
    }

    #[test]
    fn test_unresolved_references_are_reported() {
        let (graph, _) = load(&[("Windows.winmd", system_image())], LoadContext::new());
        let unresolved = &graph.report().unresolved;
        assert!(unresolved.contains(&"Windows.UI.Xaml.RoutedEventHandler".to_string()));
        assert!(unresolved.contains(&"Windows.UI.Xaml.DependencyProperty".to_string()));
        // Base library references are expected to be missing
        assert!(!unresolved.contains(&"System.Object".to_string()));
        assert!(graph.resolve(&named("Windows.UI.Xaml", "DependencyProperty")).is_none());
        assert!(graph.resolve(&named("Windows.UI.Xaml", "UIElement")).is_some());
    }

    #[test]
    fn test_same_path_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Windows.winmd");
        std::fs::write(&path, system_image()).unwrap();

        let mut context = LoadContext::new();
        let first = context.load_from_path(&path).unwrap();
        let second = context.load_from_path(&dir.path().join(".").join("Windows.winmd")).unwrap();
        assert_eq!(first, second);

        let graph = context.finish_loading();
        assert_eq!(graph.assembly_types(first).count(), 6);
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadContext::new().load_from_path(&dir.path().join("missing.winmd")).unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }

    #[test]
    fn test_garbage_is_reported_with_path() {
        let err = LoadContext::new().load_from_bytes("junk.winmd", b"not metadata at all").unwrap_err();
        match err {
            MetadataError::InFile { path, .. } => assert_eq!(path, PathBuf::from("junk.winmd")),
            other => panic!("unexpected error {other}"),
        }
    }
}
