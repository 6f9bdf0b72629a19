//! Top-level subcommand orchestration.
pub mod list;
pub mod plan;
pub mod run;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, Manifest};
use crate::logging::Logger;
use crate::units::UnitGraph;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates manifest resolution, parsing, and graph construction so
/// that each command does not have to repeat the boilerplate. Every graph
/// invariant (unique ids, resolvable references) is enforced here; a
/// command that gets a `CommandSetup` holds a valid graph.
#[derive(Debug)]
pub struct CommandSetup {
    /// The validated, immutable unit graph.
    pub graph: UnitGraph,
    /// Path the manifest was loaded from.
    pub manifest_path: std::path::PathBuf,
}

impl CommandSetup {
    /// Resolve the manifest path, parse the manifest, and build the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if no manifest can be located, the file fails to
    /// parse, or the unit graph is invalid (duplicate id, dangling
    /// dependency reference).
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let path = config::resolve_path(global.manifest.as_deref())?;

        log.stage("Loading manifest");
        let manifest = Manifest::load(&path)?;
        log.info(&format!(
            "loaded {} units from {}",
            manifest.units.len(),
            path.display()
        ));

        let graph = manifest.into_graph()?;
        Ok(Self {
            graph,
            manifest_path: path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_manifest(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("units.toml");
        std::fs::write(&path, content).expect("write manifest");
        (tmp, path)
    }

    #[test]
    fn init_loads_manifest_and_builds_graph() {
        let (_tmp, path) = write_manifest(
            r#"
            [[unit]]
            id = "a"
            check = { kind = "file-exists", path = "/a" }
            apply = { kind = "run-command", program = "true" }
            "#,
        );
        let global = GlobalOpts {
            manifest: Some(path.clone()),
        };
        let setup = CommandSetup::init(&global, &Logger::new("test")).unwrap();
        assert_eq!(setup.graph.len(), 1);
        assert_eq!(setup.manifest_path, path);
    }

    #[test]
    fn init_surfaces_graph_errors() {
        let (_tmp, path) = write_manifest(
            r#"
            [[unit]]
            id = "a"
            depends_on = ["ghost"]
            check = { kind = "file-exists", path = "/a" }
            apply = { kind = "run-command", program = "true" }
            "#,
        );
        let global = GlobalOpts {
            manifest: Some(path),
        };
        let err = CommandSetup::init(&global, &Logger::new("test")).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn init_surfaces_missing_manifest() {
        let global = GlobalOpts {
            manifest: Some(PathBuf::from("/nonexistent/units.toml")),
        };
        let err = CommandSetup::init(&global, &Logger::new("test")).unwrap_err();
        assert!(err.to_string().contains("IO error"));
    }
}
