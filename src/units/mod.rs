//! Provisioning units: the atomic check + apply items the engine converges.
//!
//! A [`Unit`] pairs one idempotency predicate ([`CheckSpec`]) with one
//! side-effecting action ([`ApplySpec`]), plus dependency edges, tags for
//! selection, and a criticality flag. Units are declared in the TOML
//! manifest and deserialized directly into these types; the `kind` field of
//! each check/apply table maps onto an enum variant, so the set of capability
//! adapters is closed at the type level.

pub mod graph;

pub use graph::{ExecutionPlan, UnitGraph};

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// The atomic provisioning item.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Unit {
    /// Unique identifier within the graph.
    pub id: String,
    /// Human-readable description shown in `list` output and logs.
    #[serde(default)]
    pub description: String,
    /// Ids of units that must complete before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Idempotency predicate: when it holds, the unit is already converged
    /// and `apply` is never invoked.
    pub check: CheckSpec,
    /// Action that converges the unit.
    pub apply: ApplySpec,
    /// Whether a failure of this unit aborts the remainder of the run.
    #[serde(default)]
    pub critical: bool,
    /// Free-form labels used by `tag:NAME` selections.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Unit {
    /// Whether this unit carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Read-only probe deciding whether a unit is already converged.
///
/// Probes have no side effects and must tolerate the probed resource being
/// entirely absent (that is "not converged", not an error).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CheckSpec {
    /// The named package is installed according to the system package database.
    PackagePresent {
        /// Package name as known to rpm.
        package: String,
    },
    /// The path exists on the filesystem.
    FileExists {
        /// Absolute or relative path to probe.
        path: PathBuf,
    },
    /// The systemd unit is currently active.
    ServiceActive {
        /// Service name (e.g. `docker` or `docker.service`).
        service: String,
    },
    /// An arbitrary probe command exits zero.
    CommandSucceeds {
        /// Program to run.
        program: String,
        /// Arguments passed to the program.
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CheckSpec {
    /// Short human-readable form for log messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PackagePresent { package } => format!("package '{package}' present"),
            Self::FileExists { path } => format!("file {} exists", path.display()),
            Self::ServiceActive { service } => format!("service '{service}' active"),
            Self::CommandSucceeds { program, args } => {
                format!("command '{}' succeeds", shell_words(program, args))
            }
        }
    }
}

/// Side-effecting action that converges a unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ApplySpec {
    /// Install one or more packages with the system package manager.
    PackageInstall {
        /// Package names, installed in a single transaction.
        packages: Vec<String>,
    },
    /// Run an arbitrary command.
    RunCommand {
        /// Program to run.
        program: String,
        /// Arguments passed to the program.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Enable and start a systemd unit.
    ServiceEnable {
        /// Service name.
        service: String,
    },
    /// Write a file with the given content, creating parent directories.
    FileWrite {
        /// Destination path.
        path: PathBuf,
        /// Full file content.
        content: String,
    },
}

impl ApplySpec {
    /// Short human-readable form for log and dry-run messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PackageInstall { packages } => {
                format!("install packages: {}", packages.join(", "))
            }
            Self::RunCommand { program, args } => {
                format!("run '{}'", shell_words(program, args))
            }
            Self::ServiceEnable { service } => format!("enable service '{service}'"),
            Self::FileWrite { path, .. } => format!("write {}", path.display()),
        }
    }
}

/// Join a program and its arguments for display.
fn shell_words(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

/// The subset of the unit graph a run operates on.
///
/// Parsed from the CLI `--select` argument: `all`, `tag:NAME`, or
/// `id:ID[,ID...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every unit in the graph.
    All,
    /// Units carrying the named tag (plus their transitive dependencies).
    Tag(String),
    /// Explicitly listed unit ids (plus their transitive dependencies).
    Ids(Vec<String>),
}

impl FromStr for Selection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        if let Some(tag) = s.strip_prefix("tag:") {
            if tag.is_empty() {
                return Err(ConfigError::InvalidSelection(s.to_string()));
            }
            return Ok(Self::Tag(tag.to_string()));
        }
        if let Some(ids) = s.strip_prefix("id:") {
            let ids: Vec<String> = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
            if ids.is_empty() {
                return Err(ConfigError::InvalidSelection(s.to_string()));
            }
            return Ok(Self::Ids(ids));
        }
        Err(ConfigError::InvalidSelection(s.to_string()))
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Tag(tag) => write!(f, "tag:{tag}"),
            Self::Ids(ids) => write!(f, "id:{}", ids.join(",")),
        }
    }
}
