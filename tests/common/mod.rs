// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed manifest fixture so each integration
// test can set up an isolated environment without repeating filesystem
// boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use provision_cli::context::RunContext;
use provision_cli::engine::RetryPolicy;
use provision_cli::exec::SystemExecutor;
use provision_cli::logging::Logger;
use provision_cli::units::UnitGraph;

/// A representative cloud-engineering manifest: a dnf metadata refresh that
/// everything depends on, a container stack, and an infrastructure-as-code
/// stack. Mirrors the shape of a real workstation manifest while keeping
/// checks and applies inert.
pub const FIXTURE_MANIFEST: &str = r#"
[[unit]]
id = "dnf-refresh"
description = "Refresh dnf metadata"
critical = true
tags = ["base"]
check = { kind = "file-exists", path = "/var/cache/dnf" }
apply = { kind = "run-command", program = "sudo", args = ["dnf", "makecache"] }

[[unit]]
id = "baseline-packages"
description = "Core tooling every profile needs"
depends_on = ["dnf-refresh"]
tags = ["base"]
check = { kind = "package-present", package = "git" }
apply = { kind = "package-install", packages = ["git", "jq", "tmux"] }

[[unit]]
id = "docker-repo"
description = "Docker CE repository definition"
depends_on = ["dnf-refresh"]
tags = ["containers"]
check = { kind = "file-exists", path = "/etc/yum.repos.d/docker-ce.repo" }
apply = { kind = "file-write", path = "/etc/yum.repos.d/docker-ce.repo", content = "[docker-ce-stable]\nenabled=1\n" }

[[unit]]
id = "docker-engine"
description = "Docker engine and CLI"
depends_on = ["docker-repo"]
tags = ["containers"]
check = { kind = "package-present", package = "docker-ce" }
apply = { kind = "package-install", packages = ["docker-ce", "docker-ce-cli"] }

[[unit]]
id = "docker-service"
description = "Docker daemon enabled and running"
depends_on = ["docker-engine"]
tags = ["containers"]
check = { kind = "service-active", service = "docker" }
apply = { kind = "service-enable", service = "docker" }

[[unit]]
id = "kubectl"
description = "Kubernetes CLI"
depends_on = ["dnf-refresh"]
tags = ["kubernetes"]
check = { kind = "command-succeeds", program = "kubectl", args = ["version", "--client"] }
apply = { kind = "package-install", packages = ["kubernetes-client"] }

[[unit]]
id = "terraform-repo"
description = "HashiCorp repository definition"
depends_on = ["dnf-refresh"]
tags = ["iac"]
check = { kind = "file-exists", path = "/etc/yum.repos.d/hashicorp.repo" }
apply = { kind = "file-write", path = "/etc/yum.repos.d/hashicorp.repo", content = "[hashicorp]\nenabled=1\n" }

[[unit]]
id = "terraform"
description = "Terraform CLI"
depends_on = ["terraform-repo"]
tags = ["iac"]
check = { kind = "package-present", package = "terraform" }
apply = { kind = "package-install", packages = ["terraform"] }
"#;

/// Write `content` as a `units.toml` inside a fresh temporary directory.
///
/// Returns the directory guard (deleting it on drop) and the manifest path.
pub fn write_manifest(content: &str) -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("units.toml");
    std::fs::write(&path, content).expect("write manifest");
    (tmp, path)
}

/// Load a manifest file and build its unit graph.
pub fn load_graph(path: &Path) -> UnitGraph {
    provision_cli::config::Manifest::load(path)
        .expect("manifest parses")
        .into_graph()
        .expect("graph is valid")
}

/// A sequential real-executor context with retries disabled, suitable for
/// driving the engine against filesystem-backed fixtures.
pub fn system_context() -> RunContext {
    RunContext::new(
        Arc::new(SystemExecutor),
        Arc::new(Logger::new("test")),
        false,
        RetryPolicy::new(0),
        1,
    )
}
