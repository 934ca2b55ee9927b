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

//! Generator configuration
//!
//! Everything here can be set from a TOML file; every key is optional and
//! falls back to the values the React Native XAML package is built with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CodegenError, CodegenResult};

/// Environment variable naming a config file when none is passed explicitly
pub const CONFIG_ENV: &str = "XAMLGEN_CONFIG";

pub const DEFAULT_SYSTEM_WINMD: &str = "C:/Program Files (x86)/Windows Kits/10/UnionMetadata/10.0.19041.0/Windows.winmd";

/// Native output location relative to the directory holding the executable
pub const DEFAULT_NATIVE_OUT: &str = "../../../../../package/windows/ReactNativeXaml/Codegen";

/// Script output location relative to the directory holding the executable
pub const DEFAULT_SCRIPT_OUT: &str = "../../../../../package/src";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Union metadata of the platform; always loaded first
    pub system_winmd: PathBuf,

    /// Extra metadata files loaded after the system metadata
    pub references: Vec<PathBuf>,

    /// Types deriving from any of these full names are projected
    pub base_types: Vec<String>,

    /// Short or full name of a type that is always projected
    pub root_type: String,

    pub native_out: Option<PathBuf>,
    pub script_out: Option<PathBuf>,

    /// Contract assembly -> assembly that holds its types
    pub contract_replacements: BTreeMap<String, String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let contract_replacements = ["Windows.Foundation.FoundationContract", "Windows.Foundation.UniversalApiContract"]
            .into_iter()
            .map(|contract| (contract.to_string(), "Windows".to_string()))
            .collect();
        Self {
            system_winmd: PathBuf::from(DEFAULT_SYSTEM_WINMD),
            references: Vec::new(),
            base_types: vec!["Windows.UI.Xaml.UIElement".to_string(), "Windows.UI.Xaml.Controls.Primitives.FlyoutBase".to_string()],
            root_type: "DependencyObject".to_string(),
            native_out: None,
            script_out: None,
            contract_replacements,
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> CodegenResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CodegenError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| CodegenError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> CodegenResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| CodegenError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit file, else the file named by [`CONFIG_ENV`], else defaults
    pub fn resolve(cli_config: Option<&Path>) -> CodegenResult<Self> {
        if let Some(config_path) = cli_config {
            Self::load_from_file(config_path)
        } else if let Ok(env_config) = std::env::var(CONFIG_ENV) {
            Self::load_from_file(env_config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> CodegenResult<()> {
        if self.base_types.iter().any(|base| base.trim().is_empty()) {
            return Err(CodegenError::InvalidConfig("base type names must not be empty".to_string()));
        }
        if let Some((contract, _)) = self.contract_replacements.iter().find(|(_, target)| target.is_empty()) {
            return Err(CodegenError::InvalidConfig(format!("contract {contract} has an empty replacement assembly")));
        }
        Ok(())
    }

    /// Native output directory: configured, else relative to `exe_dir`
    pub fn native_output_dir(&self, exe_dir: &Path) -> PathBuf {
        self.native_out.clone().unwrap_or_else(|| exe_dir.join(DEFAULT_NATIVE_OUT))
    }

    /// Script output directory: configured, else relative to `exe_dir`
    pub fn script_output_dir(&self, exe_dir: &Path) -> PathBuf {
        self.script_out.clone().unwrap_or_else(|| exe_dir.join(DEFAULT_SCRIPT_OUT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.root_type, "DependencyObject");
        assert_eq!(config.base_types.len(), 2);
        assert_eq!(config.contract_replacements.get("Windows.Foundation.UniversalApiContract").map(String::as_str), Some("Windows"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xamlgen.toml");
        std::fs::write(&path, "root_type = \"Windows.UI.Xaml.DependencyObject\"\nreferences = [\"Microsoft.UI.Xaml.winmd\"]\n").unwrap();

        let config = GeneratorConfig::load_from_file(&path).unwrap();
        assert_eq!(config.root_type, "Windows.UI.Xaml.DependencyObject");
        assert_eq!(config.references, vec![PathBuf::from("Microsoft.UI.Xaml.winmd")]);
        assert_eq!(config.base_types, GeneratorConfig::default().base_types);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xamlgen.toml");
        let config = GeneratorConfig {
            native_out: Some(PathBuf::from("out/native")),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(GeneratorConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xamlgen.toml");
        std::fs::write(&path, "base_types = 3").unwrap();
        assert!(matches!(GeneratorConfig::load_from_file(&path), Err(CodegenError::ConfigParse { .. })));
        assert!(matches!(GeneratorConfig::load_from_file(dir.path().join("absent.toml")), Err(CodegenError::ConfigRead { .. })));
    }

    #[test]
    fn test_rejects_empty_base_type() {
        let config = GeneratorConfig {
            base_types: vec![String::new()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CodegenError::InvalidConfig(_))));
    }

    #[test]
    fn test_output_dirs() {
        let exe_dir = Path::new("/opt/xamlgen/bin");
        let config = GeneratorConfig::default();
        assert_eq!(config.native_output_dir(exe_dir), exe_dir.join(DEFAULT_NATIVE_OUT));

        let config = GeneratorConfig {
            script_out: Some(PathBuf::from("src")),
            ..Default::default()
        };
        assert_eq!(config.script_output_dir(exe_dir), PathBuf::from("src"));
    }
}
