//! Unit manifest loading and path resolution.
//!
//! The manifest is a single TOML file of `[[unit]]` tables matching the
//! [`Unit`](crate::units::Unit) schema. It is parsed once at startup and
//! turned into the immutable [`UnitGraph`]; every graph invariant violation
//! (duplicate id, dangling reference) is surfaced here, before anything
//! executes.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, GraphError};
use crate::units::{Unit, UnitGraph};

/// Default manifest filename looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "units.toml";

/// Environment variable naming the manifest path.
pub const MANIFEST_ENV: &str = "PROVISION_MANIFEST";

/// Raw deserialization target for the manifest file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default, rename = "unit")]
    units: Vec<Unit>,
}

/// A parsed unit manifest.
#[derive(Debug)]
pub struct Manifest {
    /// All declared units, in file order.
    pub units: Vec<Unit>,
    /// Path the manifest was loaded from.
    pub path: PathBuf,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid TOML or does not match
    /// the unit schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: ManifestFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            units: file.units,
            path: path.to_path_buf(),
        })
    }

    /// Build the immutable unit graph, validating id uniqueness and
    /// dependency references.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateUnit`] or [`GraphError::UnknownUnit`]
    /// for an invalid graph; nothing executes in that case.
    pub fn into_graph(self) -> Result<UnitGraph, GraphError> {
        UnitGraph::from_units(self.units)
    }
}

/// Resolve the manifest path.
///
/// Precedence: the `--manifest` flag, then `$PROVISION_MANIFEST`, then
/// `./units.toml` when it exists.
///
/// # Errors
///
/// Returns [`ConfigError::ManifestNotFound`] when none of the sources
/// yields a path.
pub fn resolve_path(flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(MANIFEST_ENV)
        && !env_path.is_empty()
    {
        return Ok(PathBuf::from(env_path));
    }
    let default = PathBuf::from(DEFAULT_MANIFEST);
    if default.exists() {
        return Ok(default);
    }
    Err(ConfigError::ManifestNotFound)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const VALID_MANIFEST: &str = r#"
        [[unit]]
        id = "dnf-cache"
        description = "Refresh dnf metadata"
        critical = true
        tags = ["base"]
        check = { kind = "file-exists", path = "/var/cache/dnf" }
        apply = { kind = "run-command", program = "sudo", args = ["dnf", "makecache"] }

        [[unit]]
        id = "git"
        depends_on = ["dnf-cache"]
        tags = ["base"]
        check = { kind = "package-present", package = "git" }
        apply = { kind = "package-install", packages = ["git"] }
    "#;

    fn write_manifest(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("units.toml");
        std::fs::write(&path, content).expect("write manifest");
        (tmp, path)
    }

    // -----------------------------------------------------------------------
    // load
    // -----------------------------------------------------------------------

    #[test]
    fn load_parses_units_in_file_order() {
        let (_tmp, path) = write_manifest(VALID_MANIFEST);
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.units.len(), 2);
        assert_eq!(manifest.units[0].id, "dnf-cache");
        assert_eq!(manifest.units[1].id, "git");
        assert_eq!(manifest.path, path);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Manifest::load(Path::new("/nonexistent/units.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_invalid_toml_is_parse_error() {
        let (_tmp, path) = write_manifest("[[unit]\nid = broken");
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_unknown_top_level_key_is_parse_error() {
        let (_tmp, path) = write_manifest("[[units]]\nid = \"a\"\n");
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_empty_file_yields_no_units() {
        let (_tmp, path) = write_manifest("");
        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.units.is_empty());
    }

    // -----------------------------------------------------------------------
    // into_graph
    // -----------------------------------------------------------------------

    #[test]
    fn into_graph_builds_valid_graph() {
        let (_tmp, path) = write_manifest(VALID_MANIFEST);
        let graph = Manifest::load(&path).unwrap().into_graph().unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.get("git").is_some());
    }

    #[test]
    fn into_graph_rejects_duplicate_ids() {
        let (_tmp, path) = write_manifest(
            r#"
            [[unit]]
            id = "dup"
            check = { kind = "file-exists", path = "/a" }
            apply = { kind = "run-command", program = "true" }

            [[unit]]
            id = "dup"
            check = { kind = "file-exists", path = "/b" }
            apply = { kind = "run-command", program = "true" }
            "#,
        );
        let err = Manifest::load(&path).unwrap().into_graph().unwrap_err();
        assert!(matches!(err, GraphError::DuplicateUnit(id) if id == "dup"));
    }

    #[test]
    fn into_graph_rejects_dangling_dependency() {
        let (_tmp, path) = write_manifest(
            r#"
            [[unit]]
            id = "a"
            depends_on = ["ghost"]
            check = { kind = "file-exists", path = "/a" }
            apply = { kind = "run-command", program = "true" }
            "#,
        );
        let err = Manifest::load(&path).unwrap().into_graph().unwrap_err();
        assert!(matches!(err, GraphError::UnknownUnit(id) if id == "ghost"));
    }

    // -----------------------------------------------------------------------
    // resolve_path
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_path_prefers_explicit_flag() {
        let path = resolve_path(Some(Path::new("/etc/provision/units.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/provision/units.toml"));
    }

    #[test]
    fn resolve_path_reads_environment_variable() {
        let _lock = crate::logging::TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // SAFETY: Protected by TEST_ENV_MUTEX; removed before the lock drops.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var(MANIFEST_ENV, "/from/env/units.toml");
        }
        let path = resolve_path(None);
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var(MANIFEST_ENV);
        }
        assert_eq!(path.unwrap(), PathBuf::from("/from/env/units.toml"));
    }

    #[test]
    fn resolve_path_flag_beats_environment() {
        let _lock = crate::logging::TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // SAFETY: Protected by TEST_ENV_MUTEX; removed before the lock drops.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var(MANIFEST_ENV, "/from/env/units.toml");
        }
        let path = resolve_path(Some(Path::new("/flag/units.toml")));
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var(MANIFEST_ENV);
        }
        assert_eq!(path.unwrap(), PathBuf::from("/flag/units.toml"));
    }
}
