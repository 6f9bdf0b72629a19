//! Capability adapters: the closed set of check and apply primitives.
//!
//! Every unit reaches the outside world through exactly one check adapter
//! and one apply adapter. Core engine logic never embeds package-manager or
//! service-manager command syntax; it dispatches here, and the adapters go
//! through the [`Executor`](crate::exec::Executor) abstraction so tests can
//! assert on the exact commands issued.
//!
//! Checks are pure read-only probes: an absent resource is `Ok(false)`, and
//! [`ProbeError`] is reserved for an unusable probing mechanism. Applies are
//! single-shot; retry policy lives in the engine.

pub mod command;
pub mod file;
pub mod package;
pub mod service;

use crate::context::RunContext;
use crate::error::{ActionError, ProbeError};
use crate::exec::Executor;
use crate::units::{ApplySpec, CheckSpec};

/// Evaluate a unit's idempotency predicate.
///
/// # Errors
///
/// Returns [`ProbeError`] only when the probing mechanism itself is
/// unusable; "not converged yet" is `Ok(false)`.
pub fn evaluate_check(check: &CheckSpec, ctx: &RunContext) -> Result<bool, ProbeError> {
    match check {
        CheckSpec::PackagePresent { package } => {
            package::is_installed(package, ctx.executor.as_ref())
        }
        CheckSpec::FileExists { path } => file::exists(path),
        CheckSpec::ServiceActive { service } => {
            service::is_active(service, ctx.executor.as_ref())
        }
        CheckSpec::CommandSucceeds { program, args } => {
            command::succeeds(program, args, ctx.executor.as_ref())
        }
    }
}

/// Run a unit's apply action once.
///
/// # Errors
///
/// Returns [`ActionError`] with the adapter's raw diagnostic text when the
/// action fails. Never retries; the engine owns retry policy.
pub fn run_apply(apply: &ApplySpec, ctx: &RunContext) -> Result<(), ActionError> {
    match apply {
        ApplySpec::PackageInstall { packages } => {
            package::install(packages, ctx.executor.as_ref())
        }
        ApplySpec::RunCommand { program, args } => {
            command::run(program, args, ctx.executor.as_ref())
        }
        ApplySpec::ServiceEnable { service } => {
            service::enable_now(service, ctx.executor.as_ref())
        }
        ApplySpec::FileWrite { path, content } => file::write(path, content),
    }
}

/// Run an action command, converting the outcome into an [`ActionError`]
/// with the process's diagnostic output on failure.
pub(crate) fn run_action(
    executor: &dyn Executor,
    program: &str,
    args: &[&str],
) -> Result<(), ActionError> {
    match executor.run_unchecked(program, args) {
        Ok(result) if result.success => Ok(()),
        Ok(result) => Err(ActionError::ExitStatus {
            code: result.code.unwrap_or(-1),
            detail: result.diagnostic(),
        }),
        Err(e) => Err(ActionError::Spawn(format!("{e:#}"))),
    }
}
