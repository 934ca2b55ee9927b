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

//! Type selection: which types of the primary metadata get bindings

use std::iter;

use tracing::debug;
use xamlgen_winmd::{AssemblyId, MAX_ANCESTOR_DEPTH, TypeDescriptor, TypeGraph};

/// True if `base` is `ty` itself or one of its ancestors
pub fn derives_from(graph: &TypeGraph, ty: &TypeDescriptor, base: &str) -> bool {
    iter::once(ty.full_name()).chain(graph.ancestors(ty)).take(MAX_ANCESTOR_DEPTH).any(|name| name == base)
}

/// Inheritance based type filter
#[derive(Debug, Clone)]
pub struct TypeFilter {
    base_types: Vec<String>,
    root_type: String,
}

impl TypeFilter {
    pub fn new(base_types: Vec<String>, root_type: impl Into<String>) -> Self {
        Self {
            base_types,
            root_type: root_type.into(),
        }
    }

    /// Whether a single type is projected
    pub fn matches(&self, graph: &TypeGraph, ty: &TypeDescriptor) -> bool {
        if ty.name == self.root_type || ty.full_name() == self.root_type {
            return true;
        }
        self.base_types.iter().any(|base| derives_from(graph, ty, base))
    }

    /// Projected types of `assembly` in metadata order, `<Module>` excluded
    pub fn select<'g>(&self, graph: &'g TypeGraph, assembly: AssemblyId) -> Vec<&'g TypeDescriptor> {
        let selected: Vec<&TypeDescriptor> = graph.assembly_types(assembly).skip(1).filter(|ty| self.matches(graph, ty)).collect();
        debug!(count = selected.len(), "types selected for projection");
        selected
    }
}

/// Types with a public default constructor, ordered by short name then full name
pub fn creatable_types<'g>(types: &[&'g TypeDescriptor]) -> Vec<&'g TypeDescriptor> {
    let mut creatable: Vec<&TypeDescriptor> = types.iter().copied().filter(|ty| ty.has_default_constructor).collect();
    creatable.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.full_name().cmp(&b.full_name())));
    creatable
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use xamlgen_winmd::LoadContext;
    use xamlgen_winmd::testing::{Access, WinmdBuilder};

    fn graph(builder: WinmdBuilder) -> (TypeGraph, AssemblyId) {
        let mut context = LoadContext::new();
        let id = context.load_from_bytes("test.winmd", &builder.build()).unwrap();
        (context.finish_loading(), id)
    }

    fn xaml() -> WinmdBuilder {
        WinmdBuilder::new("Windows")
            .class("Windows.UI.Xaml", "DependencyObject", |t| t)
            .class("Windows.UI.Xaml", "UIElement", |t| t.extends("Windows.UI.Xaml", "DependencyObject"))
            .class("Windows.UI.Xaml", "FrameworkElement", |t| t.extends("Windows.UI.Xaml", "UIElement"))
            .class("Windows.UI.Xaml.Controls", "TextBlock", |t| t.extends("Windows.UI.Xaml", "FrameworkElement").default_constructor())
            .class("Windows.UI.Xaml.Controls", "Button", |t| t.extends("Windows.UI.Xaml", "FrameworkElement").default_constructor())
            .class("Windows.UI.Xaml.Controls.Primitives", "FlyoutBase", |t| t.extends("Windows.UI.Xaml", "DependencyObject"))
            .class("Windows.UI.Xaml.Controls", "Flyout", |t| t.extends("Windows.UI.Xaml.Controls.Primitives", "FlyoutBase").default_constructor())
            .class("Windows.UI.Xaml.Controls", "SwapChainPanel", |t| t.extends("Windows.UI.Xaml", "FrameworkElement").constructor(Access::Public, 1))
            .class("Windows.UI.Xaml.Media", "Brush", |t| t.extends("Windows.UI.Xaml", "DependencyObject").default_constructor())
            .class("Windows.Foundation", "Uri", |t| t.default_constructor())
    }

    fn default_filter() -> TypeFilter {
        TypeFilter::new(vec!["Windows.UI.Xaml.UIElement".to_string(), "Windows.UI.Xaml.Controls.Primitives.FlyoutBase".to_string()], "DependencyObject")
    }

    fn names(types: &[&TypeDescriptor]) -> Vec<String> {
        types.iter().map(|ty| ty.name.clone()).collect()
    }

    #[test]
    fn test_select_keeps_metadata_order() {
        let (graph, id) = graph(xaml());
        let selected = default_filter().select(&graph, id);
        assert_eq!(
            names(&selected),
            vec!["DependencyObject", "UIElement", "FrameworkElement", "TextBlock", "Button", "FlyoutBase", "Flyout", "SwapChainPanel"]
        );
    }

    #[test]
    fn test_root_type_matches_full_name_too() {
        let (graph, id) = graph(xaml());
        let filter = TypeFilter::new(Vec::new(), "Windows.UI.Xaml.DependencyObject");
        assert_eq!(names(&filter.select(&graph, id)), vec!["DependencyObject"]);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let (graph, id) = graph(xaml());
        let filter = TypeFilter::new(vec!["Contoso.Nothing".to_string()], "Nothing");
        assert!(filter.select(&graph, id).is_empty());
    }

    #[test]
    fn test_derives_from_includes_self() {
        let (graph, _) = graph(xaml());
        let button = graph.get("Windows.UI.Xaml.Controls.Button").unwrap();
        assert!(derives_from(&graph, button, "Windows.UI.Xaml.Controls.Button"));
        assert!(derives_from(&graph, button, "Windows.UI.Xaml.UIElement"));
        assert!(derives_from(&graph, button, "System.Object"));
        assert!(!derives_from(&graph, button, "Windows.UI.Xaml.Controls.Primitives.FlyoutBase"));
    }

    #[test]
    fn test_creatable_types_sorted_and_filtered() {
        let (graph, id) = graph(xaml());
        let selected = default_filter().select(&graph, id);
        let creatable = creatable_types(&selected);
        assert_eq!(names(&creatable), vec!["Button", "Flyout", "TextBlock"]);
    }

    #[test]
    fn test_creatable_tiebreak_on_full_name() {
        let (graph, id) = graph(
            WinmdBuilder::new("Windows")
                .class("Windows.UI.Xaml", "UIElement", |t| t)
                .class("Zeta", "Panel", |t| t.extends("Windows.UI.Xaml", "UIElement").default_constructor())
                .class("Alpha", "Panel", |t| t.extends("Windows.UI.Xaml", "UIElement").default_constructor()),
        );
        let selected = TypeFilter::new(vec!["Windows.UI.Xaml.UIElement".to_string()], "").select(&graph, id);
        let creatable: Vec<String> = creatable_types(&selected).iter().map(|ty| ty.full_name()).collect();
        assert_eq!(creatable, vec!["Alpha.Panel", "Zeta.Panel"]);
    }

    proptest! {
        #[test]
        fn selection_is_closed_under_base_types(parents in prop::collection::vec(0usize..8, 1..24)) {
            // Type i extends an earlier type (or the root when the index wraps)
            let mut builder = WinmdBuilder::new("Generated").class("Gen", "Root", |t| t).class("Gen", "Other", |t| t);
            for (i, parent) in parents.iter().enumerate() {
                let base = if *parent > i { "Other".to_string() } else if *parent == 0 { "Root".to_string() } else { format!("T{}", parent - 1) };
                builder = builder.class("Gen", &format!("T{i}"), |t| t.extends("Gen", &base).default_constructor());
            }
            let (graph, id) = graph(builder);
            let filter = TypeFilter::new(vec!["Gen.Root".to_string()], "Nothing");
            let selected = filter.select(&graph, id);

            for ty in graph.assembly_types(id).skip(1) {
                let chain: Vec<String> = iter::once(ty.full_name()).chain(graph.ancestors(ty)).collect();
                let expected = chain.iter().any(|name| name == "Gen.Root");
                prop_assert_eq!(selected.iter().any(|s| s.full_name() == ty.full_name()), expected);
            }

            let creatable = creatable_types(&selected);
            prop_assert!(creatable.windows(2).all(|pair| (&pair[0].name, pair[0].full_name()) <= (&pair[1].name, pair[1].full_name())));
        }
    }
}
