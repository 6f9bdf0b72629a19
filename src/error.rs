//! Domain-specific error types for the provisioning engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`GraphError`], [`ProbeError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! EngineError
//! ├── Config(ConfigError) — manifest loading, selection parsing
//! ├── Graph(GraphError)   — duplicate ids, unknown references, cycles
//! ├── Probe(ProbeError)   — a check adapter could not determine state
//! └── Action(ActionError) — an apply adapter failed
//! ```
//!
//! `ConfigError` and `GraphError` are fatal before execution starts: nothing
//! runs when the unit graph is invalid. `ProbeError` and `ActionError` are
//! caught at the convergence-engine boundary and recorded as per-unit
//! outcomes; they never propagate past it.

use thiserror::Error;

/// Top-level error type for the provisioning engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration-related error (manifest loading, selection parsing).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unit graph error (duplicate id, unknown reference, dependency cycle).
    #[error("Unit graph error: {0}")]
    Graph(#[from] GraphError),

    /// A check adapter could not determine the state of a resource.
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// An apply adapter failed to converge a resource.
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors that arise from manifest loading and unit selection.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No manifest file could be located.
    #[error("no unit manifest found; use --manifest or set PROVISION_MANIFEST")]
    ManifestNotFound,

    /// An I/O error occurred while reading the manifest.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest contains a syntax or schema error that prevents parsing.
    #[error("invalid manifest {path}: {message}")]
    Parse {
        /// Path to the file that could not be parsed.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The selection argument does not match any recognised form.
    #[error("invalid selection '{0}': expected all, tag:NAME, or id:ID[,ID...]")]
    InvalidSelection(String),
}

/// Errors that arise from unit graph construction and plan resolution.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Two units share the same id.
    #[error("duplicate unit id '{0}'")]
    DuplicateUnit(String),

    /// A selected or referenced unit id does not exist in the graph.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// A selection resolved to zero units (e.g., a tag nothing carries).
    #[error("selection '{0}' matches no units")]
    EmptySelection(String),
}

/// A check adapter's probing mechanism was unusable.
///
/// This is distinct from "not converged yet": a probe that finds its target
/// resource absent returns `Ok(false)`, not an error. `ProbeError` means the
/// state could not be determined at all.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The external tool the probe relies on is not on PATH.
    #[error("probe tool '{0}' not found on PATH")]
    ToolMissing(String),

    /// The probe command could not be executed.
    #[error("probe failed to execute: {0}")]
    Unavailable(String),
}

/// An apply adapter failed.
///
/// Carries the adapter's raw diagnostic text so the run report can surface
/// it for debugging.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The action process ran but exited non-zero.
    #[error("exited with status {code}: {detail}")]
    ExitStatus {
        /// Process exit code.
        code: i32,
        /// Trimmed stderr (or stdout when stderr is empty).
        detail: String,
    },

    /// The action process could not be launched.
    #[error("failed to launch: {0}")]
    Spawn(String),

    /// A filesystem action failed.
    #[error("{0}")]
    Io(String),
}

impl ActionError {
    /// Process exit code associated with the failure, when one exists.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitStatus { code, .. } => Some(*code),
            Self::Spawn(_) | Self::Io(_) => None,
        }
    }
}
