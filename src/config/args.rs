//! Command-line layer.
//!
//! The canonical surface is `--cluster <string>` and `--index <int>`, plus an
//! optional `--config <path>` settings file. Programs add their own flags as
//! `(name, default, usage)` triples through [`ArgSpec`] and read them back
//! from [`ParsedArgs`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::framework::ConfigError;

const ARG_CLUSTER: &str = "cluster";
const ARG_INDEX: &str = "index";
const ARG_CONFIG: &str = "config";

/// A caller-declared flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSpec {
    String {
        name: String,
        default: String,
        usage: String,
    },
    Int {
        name: String,
        default: i64,
        usage: String,
    },
    Bool {
        name: String,
        default: bool,
        usage: String,
    },
}

impl ArgSpec {
    pub fn string(name: &str, default: &str, usage: &str) -> Self {
        ArgSpec::String {
            name: name.to_string(),
            default: default.to_string(),
            usage: usage.to_string(),
        }
    }

    pub fn int(name: &str, default: i64, usage: &str) -> Self {
        ArgSpec::Int {
            name: name.to_string(),
            default,
            usage: usage.to_string(),
        }
    }

    pub fn bool(name: &str, default: bool, usage: &str) -> Self {
        ArgSpec::Bool {
            name: name.to_string(),
            default,
            usage: usage.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ArgSpec::String { name, .. } | ArgSpec::Int { name, .. } | ArgSpec::Bool { name, .. } => {
                name
            }
        }
    }

    fn to_arg(&self) -> Arg {
        match self {
            ArgSpec::String {
                name,
                default,
                usage,
            } => Arg::new(name.clone())
                .long(name.clone())
                .default_value(default.clone())
                .help(usage.clone()),
            ArgSpec::Int {
                name,
                default,
                usage,
            } => Arg::new(name.clone())
                .long(name.clone())
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64))
                .default_value(default.to_string())
                .help(usage.clone()),
            // `--flag` sets true, `--flag=false` sets false.
            ArgSpec::Bool {
                name,
                default,
                usage,
            } => Arg::new(name.clone())
                .long(name.clone())
                .num_args(0..=1)
                .require_equals(true)
                .action(ArgAction::Set)
                .value_parser(value_parser!(bool))
                .default_value(default.to_string())
                .default_missing_value("true")
                .help(usage.clone()),
        }
    }
}

/// Builds the command line and parses it.
#[derive(Debug, Clone)]
pub struct ArgsParser {
    program: String,
    specs: Vec<ArgSpec>,
}

impl ArgsParser {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            specs: Vec::new(),
        }
    }

    /// Registers a custom flag.
    ///
    /// # Panics
    /// If the name collides with a built-in flag.
    pub fn with_arg(mut self, spec: ArgSpec) -> Self {
        assert!(
            ![ARG_CLUSTER, ARG_INDEX, ARG_CONFIG].contains(&spec.name()),
            "flag `{}` is reserved",
            spec.name()
        );
        self.specs.push(spec);
        self
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.program.clone())
            .about("Service process")
            .arg(
                Arg::new(ARG_CLUSTER)
                    .long(ARG_CLUSTER)
                    .env("APP_CLUSTER")
                    .value_name("CLUSTER")
                    .help("App cluster id"),
            )
            .arg(
                Arg::new(ARG_INDEX)
                    .long(ARG_INDEX)
                    .env("APP_INDEX")
                    .value_name("INDEX")
                    .allow_negative_numbers(true)
                    .value_parser(value_parser!(i64))
                    .help("App instance index"),
            )
            .arg(
                Arg::new(ARG_CONFIG)
                    .long(ARG_CONFIG)
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .help("TOML settings file"),
            );
        for spec in &self.specs {
            cmd = cmd.arg(spec.to_arg());
        }
        cmd
    }

    /// Parses the process arguments.
    pub fn parse(&self) -> Result<ParsedArgs, ConfigError> {
        self.parse_from(std::env::args_os())
    }

    /// Parses an explicit argument list (first item is the program name).
    pub fn parse_from<I, T>(&self, args: I) -> Result<ParsedArgs, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(args)?;
        Ok(ParsedArgs { matches })
    }
}

/// Parsed command line.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    matches: ArgMatches,
}

impl ParsedArgs {
    pub fn cluster(&self) -> Option<&str> {
        self.get::<String>(ARG_CLUSTER).map(String::as_str)
    }

    pub fn index(&self) -> Option<i64> {
        self.get::<i64>(ARG_INDEX).copied()
    }

    pub fn settings_path(&self) -> Option<&Path> {
        self.get::<PathBuf>(ARG_CONFIG).map(PathBuf::as_path)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get::<String>(name).map(String::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get::<i64>(name).copied()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get::<bool>(name).copied()
    }

    fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.matches.try_get_one::<T>(name).ok().flatten()
    }
}
