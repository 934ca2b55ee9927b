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

//! Command line parsing
//!
//! Options use a single dash and whole words (`-winmd`, `-cppout`), which is
//! what the package build scripts pass. Each option is one row of
//! [`OPTIONS`]: its flag, how many arguments it consumes including the flag
//! itself, and the setter that records it.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("Unknown option {0}")]
    UnknownOption(String),

    #[error("Option {0} expects a value")]
    MissingValue(String),
}

/// What one invocation asks for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Metadata whose types are projected
    pub winmd: Option<PathBuf>,
    pub cpp_out: Option<PathBuf>,
    pub ts_out: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub help: bool,
}

/// One recognised option
pub struct CliOption {
    pub flag: &'static str,
    /// Arguments consumed, the flag included
    pub arity: usize,
    pub value_name: Option<&'static str>,
    pub description: &'static str,
    apply: fn(&mut GenerationRequest, Option<OsString>),
}

pub const OPTIONS: &[CliOption] = &[
    CliOption {
        flag: "-help",
        arity: 1,
        value_name: None,
        description: "Print the available options and exit",
        apply: |request, _| request.help = true,
    },
    CliOption {
        flag: "-winmd",
        arity: 2,
        value_name: Some("<path>"),
        description: "Metadata file to generate bindings for (defaults to the system metadata)",
        apply: |request, value| request.winmd = value.map(PathBuf::from),
    },
    CliOption {
        flag: "-cppout",
        arity: 2,
        value_name: Some("<dir>"),
        description: "Directory for the generated C++ sources",
        apply: |request, value| request.cpp_out = value.map(PathBuf::from),
    },
    CliOption {
        flag: "-tsout",
        arity: 2,
        value_name: Some("<dir>"),
        description: "Existing directory for the generated TypeScript sources",
        apply: |request, value| request.ts_out = value.map(PathBuf::from),
    },
    CliOption {
        flag: "-config",
        arity: 2,
        value_name: Some("<file>"),
        description: "TOML configuration file",
        apply: |request, value| request.config = value.map(PathBuf::from),
    },
];

/// Parse arguments, program name excluded. A repeated option keeps its last value.
///
/// Values are kept as OS strings, so paths need not be UTF-8.
pub fn parse<I, S>(args: I) -> Result<GenerationRequest, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut request = GenerationRequest::default();

    while let Some(flag) = args.next() {
        let option = OPTIONS
            .iter()
            .find(|option| flag == option.flag)
            .ok_or_else(|| CliError::UnknownOption(flag.to_string_lossy().into_owned()))?;
        let value = match option.arity {
            1 => None,
            _ => Some(args.next().ok_or_else(|| CliError::MissingValue(option.flag.to_string()))?),
        };
        (option.apply)(&mut request, value);
    }

    Ok(request)
}

/// One line per option
pub fn help_text() -> String {
    let lines: String = OPTIONS
        .iter()
        .map(|option| {
            let usage = match option.value_name {
                Some(value) => format!("{} {}", option.flag, value),
                None => option.flag.to_string(),
            };
            format!("  {usage:<18} {}\n", option.description)
        })
        .collect();
    format!("Usage: xamlgen [options]\n\nOptions:\n{lines}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(Vec::<String>::new()).unwrap(), GenerationRequest::default());
    }

    #[test]
    fn test_parse_all_options() {
        let request = parse(["-winmd", "App.winmd", "-cppout", "out/cpp", "-tsout", "out/ts", "-config", "xamlgen.toml"]).unwrap();
        assert_eq!(request.winmd, Some(PathBuf::from("App.winmd")));
        assert_eq!(request.cpp_out, Some(PathBuf::from("out/cpp")));
        assert_eq!(request.ts_out, Some(PathBuf::from("out/ts")));
        assert_eq!(request.config, Some(PathBuf::from("xamlgen.toml")));
        assert!(!request.help);
    }

    #[test]
    fn test_help_consumes_no_value() {
        let request = parse(["-help", "-winmd", "App.winmd"]).unwrap();
        assert!(request.help);
        assert_eq!(request.winmd, Some(PathBuf::from("App.winmd")));
    }

    #[test]
    fn test_last_value_wins() {
        let request = parse(["-winmd", "a.winmd", "-winmd", "b.winmd"]).unwrap();
        assert_eq!(request.winmd, Some(PathBuf::from("b.winmd")));
    }

    #[test]
    fn test_rejects_unknown_and_positional() {
        assert_eq!(parse(["-bogus"]), Err(CliError::UnknownOption("-bogus".to_string())));
        assert_eq!(parse(["--winmd", "a.winmd"]), Err(CliError::UnknownOption("--winmd".to_string())));
        assert_eq!(parse(["App.winmd"]), Err(CliError::UnknownOption("App.winmd".to_string())));
    }

    #[test]
    fn test_missing_value() {
        assert_eq!(parse(["-cppout", "out", "-tsout"]), Err(CliError::MissingValue("-tsout".to_string())));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_values() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = OsStr::from_bytes(b"\xff\xfe.winmd");
        let request = parse([OsStr::new("-winmd"), path, OsStr::new("-tsout"), path]).unwrap();
        assert_eq!(request.winmd.as_deref().map(|p| p.as_os_str()), Some(path));
        assert_eq!(request.ts_out, Some(PathBuf::from(path)));

        let err = parse([OsStr::from_bytes(b"-\xff")]).unwrap_err();
        assert!(matches!(err, CliError::UnknownOption(_)));
    }

    #[test]
    fn test_help_lists_every_option() {
        let help = help_text();
        for option in OPTIONS {
            assert!(help.contains(option.flag), "{} missing from help", option.flag);
        }
        assert_eq!(help.lines().filter(|line| line.trim_start().starts_with('-')).count(), OPTIONS.len());
    }
}
