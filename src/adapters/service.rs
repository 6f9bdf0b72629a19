//! Service adapter backed by systemctl.

use crate::error::{ActionError, ProbeError};
use crate::exec::Executor;

/// Whether the systemd unit is currently active.
///
/// `systemctl is-active` exits non-zero for inactive and unknown units
/// alike; both mean "not converged".
///
/// # Errors
///
/// Returns [`ProbeError::ToolMissing`] when systemctl is not on PATH, or
/// [`ProbeError::Unavailable`] when the query cannot be executed.
pub(super) fn is_active(service: &str, executor: &dyn Executor) -> Result<bool, ProbeError> {
    if !executor.which("systemctl") {
        return Err(ProbeError::ToolMissing("systemctl".to_string()));
    }
    match executor.run_unchecked("systemctl", &["is-active", "--quiet", service]) {
        Ok(result) => Ok(result.success),
        Err(e) => Err(ProbeError::Unavailable(format!("{e:#}"))),
    }
}

/// Enable and start the systemd unit in one step.
///
/// # Errors
///
/// Returns [`ActionError`] with systemctl's diagnostic output on failure.
pub(super) fn enable_now(service: &str, executor: &dyn Executor) -> Result<(), ActionError> {
    super::run_action(executor, "sudo", &["systemctl", "enable", "--now", service])
}
