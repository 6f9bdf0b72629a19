//! Package adapter backed by rpm (probe) and dnf (install).

use crate::error::{ActionError, ProbeError};
use crate::exec::Executor;

/// Whether the named package is installed according to the rpm database.
///
/// `rpm -q` exits non-zero for a package that is not installed, which is
/// "not converged", not an error.
///
/// # Errors
///
/// Returns [`ProbeError::ToolMissing`] when rpm itself is not on PATH, or
/// [`ProbeError::Unavailable`] when the query cannot be executed.
pub(super) fn is_installed(package: &str, executor: &dyn Executor) -> Result<bool, ProbeError> {
    if !executor.which("rpm") {
        return Err(ProbeError::ToolMissing("rpm".to_string()));
    }
    match executor.run_unchecked("rpm", &["-q", package]) {
        Ok(result) => Ok(result.success),
        Err(e) => Err(ProbeError::Unavailable(format!("{e:#}"))),
    }
}

/// Install packages in a single dnf transaction.
///
/// All names go into one `sudo dnf install -y` invocation; a single command
/// regardless of how many packages the unit declares.
///
/// # Errors
///
/// Returns [`ActionError`] with dnf's diagnostic output when the
/// transaction fails.
pub(super) fn install(packages: &[String], executor: &dyn Executor) -> Result<(), ActionError> {
    if packages.is_empty() {
        return Ok(());
    }
    let mut args = vec!["dnf", "install", "-y"];
    args.extend(packages.iter().map(String::as_str));
    super::run_action(executor, "sudo", &args)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::adapters::test_helpers::{MockExecutor, RecordingExecutor};

    // -----------------------------------------------------------------------
    // is_installed
    // -----------------------------------------------------------------------

    #[test]
    fn installed_when_rpm_query_succeeds() {
        let executor = MockExecutor::ok("git-2.45.0-1.fc40.x86_64\n");
        assert!(is_installed("git", &executor).unwrap());
    }

    #[test]
    fn missing_when_rpm_query_fails() {
        let executor = MockExecutor::fail();
        assert!(
            !is_installed("git", &executor).unwrap(),
            "non-zero rpm exit means not installed, not a probe error"
        );
    }

    #[test]
    fn probe_error_when_rpm_not_on_path() {
        let executor = MockExecutor::ok("").with_which(false);
        let err = is_installed("git", &executor).unwrap_err();
        assert!(matches!(err, ProbeError::ToolMissing(tool) if tool == "rpm"));
        assert_eq!(executor.call_count(), 0, "no query without the tool");
    }

    // -----------------------------------------------------------------------
    // install
    // -----------------------------------------------------------------------

    #[test]
    fn install_groups_packages_into_single_command() {
        let executor = RecordingExecutor::new();
        install(
            &["git".to_string(), "vim".to_string(), "tmux".to_string()],
            &executor,
        )
        .unwrap();

        let calls = executor.recorded_calls();
        assert_eq!(calls.len(), 1, "one dnf transaction for three packages");
        let (prog, args) = &calls[0];
        assert_eq!(prog, "sudo");
        assert_eq!(args[0], "dnf");
        assert_eq!(args[1], "install");
        assert_eq!(args[2], "-y");
        assert!(args.contains(&"git".to_string()));
        assert!(args.contains(&"vim".to_string()));
        assert!(args.contains(&"tmux".to_string()));
    }

    #[test]
    fn install_empty_list_is_noop() {
        let executor = RecordingExecutor::new();
        install(&[], &executor).unwrap();
        assert!(executor.recorded_calls().is_empty());
    }

    #[test]
    fn install_failure_carries_diagnostic() {
        let executor =
            MockExecutor::with_responses(vec![(false, "Unable to find a match: ghost".into())]);
        let err = install(&["ghost".to_string()], &executor).unwrap_err();
        assert!(err.to_string().contains("Unable to find a match"));
        assert_eq!(err.exit_code(), Some(1));
    }
}
