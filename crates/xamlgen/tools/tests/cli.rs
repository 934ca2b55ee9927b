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

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use xamlgen_codegen::GeneratorConfig;
use xamlgen_codegen::config::CONFIG_ENV;
use xamlgen_winmd::testing::WinmdBuilder;

const GENERATED: [&str; 6] = ["cpp/TypeCreator.g.cpp", "cpp/TypeProperties.g.h", "cpp/EnumConverters.g.cpp", "cpp/TypeEvents.g.h", "ts/Props.ts", "ts/Types.tsx"];

fn xamlgen() -> Command {
    let mut cmd = Command::cargo_bin("xamlgen").unwrap();
    cmd.env_remove(CONFIG_ENV);
    cmd
}

/// Temp dir holding fixture metadata, a config pointing at it and an empty `ts` directory
fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let winmd = dir.path().join("Windows.winmd");
    let metadata = WinmdBuilder::new("Windows")
        .class("Windows.UI.Xaml", "DependencyObject", |t| t)
        .class("Windows.UI.Xaml", "UIElement", |t| t.extends("Windows.UI.Xaml", "DependencyObject"))
        .class("Windows.UI.Xaml.Controls", "Button", |t| t.extends("Windows.UI.Xaml", "UIElement").default_constructor());
    fs::write(&winmd, metadata.build()).unwrap();
    fs::create_dir(dir.path().join("ts")).unwrap();

    let config_path = dir.path().join("xamlgen.toml");
    GeneratorConfig {
        system_winmd: winmd,
        ..Default::default()
    }
    .save_to_file(&config_path)
    .unwrap();
    (dir, config_path)
}

fn outputs(dir: &Path) -> [String; 4] {
    [
        "-cppout".to_string(),
        dir.join("cpp").display().to_string(),
        "-tsout".to_string(),
        dir.join("ts").display().to_string(),
    ]
}

fn generated_files(dir: &Path) -> usize {
    GENERATED.iter().filter(|file| dir.join(file).exists()).count()
}

#[test]
fn test_help_lists_options() {
    xamlgen()
        .arg("-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("-winmd").and(predicate::str::contains("-cppout")).and(predicate::str::contains("-tsout")).and(predicate::str::contains("-config")));
}

#[test]
fn test_unknown_option_fails() {
    let (dir, _) = project();
    xamlgen().arg("-bogus").args(outputs(dir.path())).assert().failure().stderr(predicate::str::contains("Unknown option -bogus"));
    assert_eq!(generated_files(dir.path()), 0);
}

#[test]
fn test_missing_value_fails() {
    xamlgen().arg("-cppout").assert().failure().stderr(predicate::str::contains("Option -cppout expects a value"));
}

#[test]
fn test_missing_winmd_writes_nothing() {
    let (dir, config) = project();
    xamlgen()
        .arg("-config")
        .arg(&config)
        .arg("-winmd")
        .arg(dir.path().join("missing.winmd"))
        .args(outputs(dir.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.winmd"));
    assert_eq!(generated_files(dir.path()), 0);
    assert!(!dir.path().join("cpp").exists());
}

#[test]
fn test_generates_bindings() {
    let (dir, config) = project();
    xamlgen().arg("-config").arg(&config).args(outputs(dir.path())).assert().success();

    assert_eq!(generated_files(dir.path()), GENERATED.len());
    let creator = fs::read_to_string(dir.path().join("cpp/TypeCreator.g.cpp")).unwrap();
    assert!(creator.contains("if (typeName == \"Windows.UI.Xaml.Controls.Button\")"));
    let types = fs::read_to_string(dir.path().join("ts/Types.tsx")).unwrap();
    assert!(types.contains("export function Button(props: ButtonProps)"));
}

#[test]
fn test_config_from_environment() {
    let (dir, config) = project();
    xamlgen().env(CONFIG_ENV, &config).args(outputs(dir.path())).assert().success();
    assert_eq!(generated_files(dir.path()), GENERATED.len());
}

#[test]
fn test_missing_script_directory_fails() {
    let (dir, config) = project();
    fs::remove_dir(dir.path().join("ts")).unwrap();
    xamlgen().arg("-config").arg(&config).args(outputs(dir.path())).assert().failure();
    assert_eq!(generated_files(dir.path()), 0);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_metadata_path() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (dir, config) = project();
    let winmd = dir.path().join(OsStr::from_bytes(b"\xff\xfe.winmd"));
    fs::copy(dir.path().join("Windows.winmd"), &winmd).unwrap();

    xamlgen().arg("-config").arg(&config).arg("-winmd").arg(&winmd).args(outputs(dir.path())).assert().success();
    assert_eq!(generated_files(dir.path()), GENERATED.len());
}
