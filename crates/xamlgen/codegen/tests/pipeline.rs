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

//! End-to-end generation against synthetic metadata

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use xamlgen_codegen::templates::BANNER;
use xamlgen_codegen::{ArtifactKind, CodegenError, GenerationPipeline, GeneratorConfig, OutputRoots};
use xamlgen_winmd::testing::{Access, WinmdBuilder, named, value_type};
use xamlgen_winmd::{Primitive, TypeSig};

const XAML: &str = "Windows.UI.Xaml";

fn system_metadata() -> WinmdBuilder {
    WinmdBuilder::new("Windows")
        .class(XAML, "DependencyObject", |t| t)
        .class(XAML, "UIElement", |t| {
            t.extends(XAML, "DependencyObject")
                .property("Opacity", TypeSig::Primitive(Primitive::F64))
                .property("Visibility", value_type(XAML, "Visibility"))
                .event("Tapped", named(XAML, "RoutedEventHandler"))
        })
        .class(XAML, "FrameworkElement", |t| {
            t.extends(XAML, "UIElement")
                .property("Width", TypeSig::Primitive(Primitive::F64))
                .property("Margin", value_type(XAML, "Thickness"))
        })
        .class("Windows.UI.Xaml.Controls", "Button", |t| {
            t.extends(XAML, "FrameworkElement")
                .default_constructor()
                .property("Content", TypeSig::Object)
                .property("IsEnabled", TypeSig::Primitive(Primitive::Bool))
                .event("Click", named(XAML, "RoutedEventHandler"))
        })
        .class("Windows.UI.Xaml.Controls", "SwapChainPanel", |t| {
            t.extends(XAML, "FrameworkElement")
                .constructor(Access::Public, 1)
                .property("CompositionScaleX", TypeSig::Primitive(Primitive::F32))
        })
        .class("Windows.UI.Xaml.Controls.Primitives", "FlyoutBase", |t| {
            t.extends(XAML, "DependencyObject")
                .property("Placement", value_type("Windows.UI.Xaml.Controls.Primitives", "FlyoutPlacementMode"))
        })
        .class("Windows.UI.Xaml.Controls", "Flyout", |t| t.extends("Windows.UI.Xaml.Controls.Primitives", "FlyoutBase").default_constructor())
        .class("Windows.UI.Xaml.Media", "Brush", |t| t.extends(XAML, "DependencyObject"))
        .enumeration(XAML, "Visibility", &[("Visible", 0), ("Collapsed", 1)])
        .enumeration("Windows.UI.Xaml.Controls.Primitives", "FlyoutPlacementMode", &[("Top", 0), ("Bottom", 1)])
        .structure(XAML, "Thickness")
        .delegate(XAML, "RoutedEventHandler")
}

struct Workspace {
    dir: TempDir,
    config: GeneratorConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let system = dir.path().join("Windows.winmd");
        fs::write(&system, system_metadata().build()).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let config = GeneratorConfig {
            system_winmd: system,
            ..Default::default()
        };
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn outputs(&self) -> OutputRoots {
        OutputRoots::new(self.path("codegen"), self.path("src"))
    }

    fn pipeline(&self) -> GenerationPipeline {
        GenerationPipeline::new(self.config.clone(), self.outputs())
    }

    fn read(&self, kind: ArtifactKind) -> String {
        fs::read_to_string(self.outputs().path_of(kind)).unwrap()
    }

    fn written_files(&self) -> Vec<PathBuf> {
        ArtifactKind::ALL.iter().map(|kind| self.outputs().path_of(*kind)).filter(|path| path.exists()).collect()
    }
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack.find(needle).unwrap_or_else(|| panic!("{needle:?} not found in:\n{haystack}"))
}

#[test]
fn test_generates_all_artifacts() {
    let workspace = Workspace::new();
    let report = workspace.pipeline().execute().unwrap();

    assert_eq!(report.written.len(), 6);
    assert_eq!(report.stats.types, 7);
    assert_eq!(report.stats.creatable, 2);
    assert_eq!(report.stats.events, 2);
    assert_eq!(report.stats.enums, 2);
    for kind in ArtifactKind::ALL {
        assert!(workspace.read(kind).contains(BANNER), "{} has no banner", kind.file_name());
    }
}

#[test]
fn test_type_creator_lists_creatable_types_in_order() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();
    let creator = workspace.read(ArtifactKind::TypeCreator);

    let button = position(&creator, "if (typeName == \"Windows.UI.Xaml.Controls.Button\")");
    let flyout = position(&creator, "if (typeName == \"Windows.UI.Xaml.Controls.Flyout\")");
    assert!(button < flyout);
    assert!(creator.contains("return winrt::Windows::UI::Xaml::Controls::Button();"));
    assert!(creator.contains("RoActivateInstance"));
}

#[test]
fn test_parameterized_constructor_only_skips_activation() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();

    assert!(!workspace.read(ArtifactKind::TypeCreator).contains("SwapChainPanel"));
    assert!(!workspace.read(ArtifactKind::Types).contains("export function SwapChainPanel"));
    let properties = workspace.read(ArtifactKind::TypeProperties);
    assert!(properties.contains("IsType<winrt::Windows::UI::Xaml::Controls::SwapChainPanel>"));
    assert!(workspace.read(ArtifactKind::Props).contains("export interface SwapChainPanelProps extends FrameworkElementProps {"));
}

#[test]
fn test_property_table_sorted_by_name() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();
    let properties = workspace.read(ArtifactKind::TypeProperties);

    let order: Vec<usize> = ["compositionScaleX", "isEnabled", "margin", "opacity", "placement", "visibility", "width"]
        .iter()
        .map(|key| position(&properties, &format!("{{ \"{key}\",")))
        .collect();
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "{properties}");
    assert!(properties.contains("SetPropValue<winrt::Windows::UI::Xaml::Thickness>, ViewManagerPropertyType::Map"));
    assert!(properties.contains("SetPropValue<bool>, ViewManagerPropertyType::Boolean"));
    // Object valued properties have no representation
    assert!(!properties.contains("\"content\""));
}

#[test]
fn test_enum_converters_and_events() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();

    let converters = workspace.read(ArtifactKind::EnumConverters);
    let placement = position(&converters, "ParseEnum<winrt::Windows::UI::Xaml::Controls::Primitives::FlyoutPlacementMode>");
    let visibility = position(&converters, "ParseEnum<winrt::Windows::UI::Xaml::Visibility>");
    assert!(placement < visibility);
    assert!(converters.contains("return winrt::Windows::UI::Xaml::Visibility::Collapsed;"));

    let events = workspace.read(ArtifactKind::TypeEvents);
    assert!(position(&events, "{ \"Tapped\"") < position(&events, "{ \"Click\""));
    assert!(events.contains("o.as<winrt::Windows::UI::Xaml::Controls::Button>().Click("));
}

#[test]
fn test_script_artifacts() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();

    let props = workspace.read(ArtifactKind::Props);
    assert!(props.contains("export interface DependencyObjectProps extends ViewProps {"));
    assert!(props.contains("export interface ButtonProps extends FrameworkElementProps {"));
    assert!(props.contains("export interface FlyoutProps extends FlyoutBaseProps {"));
    assert!(props.contains("  visibility?: 'Visible' | 'Collapsed';"));
    assert!(props.contains("  onClick?: (event: NativeSyntheticEvent<NativeXamlEvent>) => void;"));
    assert!(!props.contains("BrushProps"));

    let types = workspace.read(ArtifactKind::Types);
    assert!(types.contains("export type UIElementProps = Props.UIElementProps;"));
    assert!(types.contains("export function Flyout(props: FlyoutProps) {"));
    assert!(types.contains("type=\"Windows.UI.Xaml.Controls.Button\""));
}

#[test]
fn test_rerun_is_byte_identical() {
    let workspace = Workspace::new();
    workspace.pipeline().execute().unwrap();
    let first: Vec<String> = ArtifactKind::ALL.iter().map(|kind| workspace.read(*kind)).collect();

    workspace.pipeline().execute().unwrap();
    let second: Vec<String> = ArtifactKind::ALL.iter().map(|kind| workspace.read(*kind)).collect();
    assert_eq!(first, second);
}

#[test]
fn test_no_matching_types_still_writes_boilerplate() {
    let mut workspace = Workspace::new();
    workspace.config.base_types = vec!["Contoso.Nothing".to_string()];
    workspace.config.root_type = "Nothing".to_string();
    let report = workspace.pipeline().execute().unwrap();

    assert_eq!(report.stats.types, 0);
    assert_eq!(workspace.written_files().len(), 6);
    let creator = workspace.read(ArtifactKind::TypeCreator);
    assert!(creator.starts_with("#include \"pch.h\"\n"));
    assert!(!creator.contains("if (typeName =="));
    assert!(workspace.read(ArtifactKind::TypeProperties).ends_with("inline const std::vector<PropInfo> xamlPropertyMap{\n};\n"));
}

#[test]
fn test_primary_metadata_with_contract_references() {
    let mut workspace = Workspace::new();
    let app = WinmdBuilder::new("Contoso")
        .references_into("Windows.Foundation.UniversalApiContract")
        .class("Contoso.Controls", "Gauge", |t| {
            t.extends("Windows.UI.Xaml", "FrameworkElement")
                .default_constructor()
                .property("Value", TypeSig::Primitive(Primitive::F64))
        })
        .class("Contoso.Controls", "Helper", |t| t.default_constructor());
    let primary = workspace.path("Contoso.winmd");
    fs::write(&primary, app.build()).unwrap();
    workspace.config.references = vec![workspace.path("Windows.winmd")];

    let report = workspace.pipeline().with_primary(Some(primary)).execute().unwrap();
    assert_eq!(report.stats.types, 1);

    let creator = workspace.read(ArtifactKind::TypeCreator);
    assert!(creator.contains("Contoso.Controls.Gauge"));
    assert!(!creator.contains("Windows.UI.Xaml.Controls.Button"));
    let props = workspace.read(ArtifactKind::Props);
    assert!(props.contains("export interface GaugeProps extends ViewProps {"));
    assert!(props.contains("  value?: number;"));
}

#[test]
fn test_missing_primary_writes_nothing() {
    let workspace = Workspace::new();
    let err = workspace.pipeline().with_primary(Some(workspace.path("missing.winmd"))).execute().unwrap_err();
    assert!(matches!(err, CodegenError::Metadata(_)));
    assert!(workspace.written_files().is_empty());
}

#[test]
fn test_missing_script_directory_writes_nothing() {
    let workspace = Workspace::new();
    fs::remove_dir(workspace.path("src")).unwrap();
    let err = workspace.pipeline().execute().unwrap_err();
    assert!(matches!(err, CodegenError::MissingOutputDirectory(ref path) if *path == workspace.path("src")));
    assert!(workspace.written_files().is_empty());
}
