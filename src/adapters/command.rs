//! Arbitrary-command adapter, for checks and applies with no dedicated kind.

use crate::error::{ActionError, ProbeError};
use crate::exec::Executor;

/// Whether the probe command exits zero.
///
/// # Errors
///
/// Returns [`ProbeError::Unavailable`] when the command cannot be spawned
/// at all (e.g. the program does not exist); a non-zero exit is `Ok(false)`.
pub(super) fn succeeds(
    program: &str,
    args: &[String],
    executor: &dyn Executor,
) -> Result<bool, ProbeError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match executor.run_unchecked(program, &args) {
        Ok(result) => Ok(result.success),
        Err(e) => Err(ProbeError::Unavailable(format!("{e:#}"))),
    }
}

/// Run the action command once.
///
/// # Errors
///
/// Returns [`ActionError`] carrying the command's diagnostic output and
/// exit code on failure.
pub(super) fn run(
    program: &str,
    args: &[String],
    executor: &dyn Executor,
) -> Result<(), ActionError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    super::run_action(executor, program, &args)
}
