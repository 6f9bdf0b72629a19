//! Convergence engine: drives an execution plan to completion.
//!
//! For each unit, in plan order:
//!
//! 1. Evaluate the check. If it holds, the unit is already converged and is
//!    recorded Skipped; apply is never invoked.
//! 2. Otherwise invoke the apply adapter under the centralised retry policy
//!    (dry-run records WouldApply instead and makes no adapter call).
//! 3. A final failure is recorded per unit. When the unit is critical the
//!    whole run aborts: every later unit is recorded Aborted and no further
//!    adapter calls are made. Non-critical failures never block independent
//!    units, and dependents of a failed unit are still attempted (best-effort
//!    provisioning).
//!
//! Probe failures are recorded as unit failures with the same critical
//! escalation. Cancellation stops new units from starting; in-flight applies
//! run to completion and never-started units are recorded Cancelled.

mod parallel;
pub mod report;
pub mod retry;

pub use report::{RunReport, UnitOutcome, UnitStatus};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

use std::time::{Duration, Instant};

use crate::adapters;
use crate::context::RunContext;
use crate::units::{ExecutionPlan, Unit, UnitGraph};

/// Walks an [`ExecutionPlan`], converging each unit and collecting outcomes
/// into a [`RunReport`].
#[derive(Debug)]
pub struct ConvergenceEngine<'a> {
    graph: &'a UnitGraph,
    ctx: &'a RunContext,
}

impl<'a> ConvergenceEngine<'a> {
    /// Create an engine over a resolved graph and an immutable run context.
    #[must_use]
    pub const fn new(graph: &'a UnitGraph, ctx: &'a RunContext) -> Self {
        Self { graph, ctx }
    }

    /// Drive the plan to completion and return the finalized report.
    ///
    /// Sequential by default; when the context allows more than one worker,
    /// units are grouped into dependency levels and each level runs on a
    /// bounded pool (see [`ExecutionPlan::levels`]).
    #[must_use]
    pub fn run(&self, plan: &ExecutionPlan) -> RunReport {
        let mut report = RunReport::new();
        if self.ctx.concurrency > 1 && plan.len() > 1 {
            parallel::run_levels(self, plan, &mut report);
        } else {
            self.run_sequential(plan, &mut report);
        }
        report.finalize();
        report
    }

    /// Execute the plan one unit at a time, in plan order.
    fn run_sequential(&self, plan: &ExecutionPlan, report: &mut RunReport) {
        for id in plan.ids() {
            let Some(unit) = self.graph.get(id) else {
                continue;
            };
            let outcome = self.attempt(unit, report.is_fatal());
            self.record(unit, outcome, report);
        }
    }

    /// Record an outcome, escalating to a fatal abort when a critical unit
    /// has failed.
    fn record(&self, unit: &Unit, outcome: UnitOutcome, report: &mut RunReport) {
        if outcome.status == UnitStatus::Failed && unit.critical {
            self.ctx.log.error(&format!(
                "critical unit '{}' failed; aborting remaining units",
                unit.id
            ));
            report.set_fatal();
        }
        report.record(outcome);
    }

    /// Produce the outcome for one unit, honouring cancellation and a
    /// pending fatal abort before touching any adapter.
    fn attempt(&self, unit: &Unit, fatal: bool) -> UnitOutcome {
        if self.ctx.is_cancelled() {
            return UnitOutcome::new(
                &unit.id,
                UnitStatus::Cancelled,
                Some("run cancelled".to_string()),
                Duration::ZERO,
            );
        }
        if fatal {
            return UnitOutcome::new(
                &unit.id,
                UnitStatus::Aborted,
                Some("earlier critical unit failed".to_string()),
                Duration::ZERO,
            );
        }
        self.execute(unit)
    }

    /// Check-then-apply for a single unit.
    fn execute(&self, unit: &Unit) -> UnitOutcome {
        let log = self.ctx.log.as_ref();
        let started = Instant::now();
        log.stage(&unit.id);
        if !unit.description.is_empty() {
            log.debug(&unit.description);
        }

        match adapters::evaluate_check(&unit.check, self.ctx) {
            Ok(true) => {
                log.debug(&format!("already converged: {}", unit.check.describe()));
                UnitOutcome::new(&unit.id, UnitStatus::Skipped, None, started.elapsed())
            }
            Ok(false) if self.ctx.dry_run => {
                log.dry_run(&format!("would {}", unit.apply.describe()));
                UnitOutcome::new(
                    &unit.id,
                    UnitStatus::WouldApply,
                    Some(unit.apply.describe()),
                    started.elapsed(),
                )
            }
            Ok(false) => {
                log.info(&format!("applying: {}", unit.apply.describe()));
                let result = retry::run_with_retry(
                    self.ctx.retry,
                    self.ctx.sleeper.as_ref(),
                    log,
                    &unit.id,
                    || adapters::run_apply(&unit.apply, self.ctx),
                );
                match result {
                    Ok(()) => {
                        UnitOutcome::new(&unit.id, UnitStatus::Succeeded, None, started.elapsed())
                    }
                    Err(e) => {
                        log.error(&format!("{}: {e}", unit.id));
                        UnitOutcome::new(
                            &unit.id,
                            UnitStatus::Failed,
                            Some(e.to_string()),
                            started.elapsed(),
                        )
                    }
                }
            }
            Err(probe) => {
                log.error(&format!("{}: {probe}", unit.id));
                UnitOutcome::new(
                    &unit.id,
                    UnitStatus::Failed,
                    Some(probe.to_string()),
                    started.elapsed(),
                )
            }
        }
    }
}
