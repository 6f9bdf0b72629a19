//! Level-parallel execution on a bounded Rayon pool.
//!
//! The plan is grouped into dependency levels; units within a level have no
//! ordering constraints between them and run concurrently, capped at the
//! configured worker count. Levels are strict barriers: a level completes
//! fully (including the critical-failure bookkeeping) before the next one
//! starts, so a critical failure in one level aborts everything after it.

use rayon::prelude::*;

use super::{ConvergenceEngine, RunReport, UnitOutcome};
use crate::units::{ExecutionPlan, Unit};

/// Run the plan level by level on a pool of `ctx.concurrency` workers.
///
/// Falls back to sequential execution when the pool cannot be built.
pub(super) fn run_levels(
    engine: &ConvergenceEngine<'_>,
    plan: &ExecutionPlan,
    report: &mut RunReport,
) {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(engine.ctx.concurrency)
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            engine
                .ctx
                .log
                .warn(&format!("worker pool unavailable ({e}); running sequentially"));
            engine.run_sequential(plan, report);
            return;
        }
    };

    for level in plan.levels(engine.graph) {
        // Fatal state is sampled at the level boundary: siblings already
        // running when a critical unit fails are allowed to finish.
        let fatal = report.is_fatal();
        let units: Vec<&Unit> = level.iter().filter_map(|id| engine.graph.get(id)).collect();

        // par_iter + collect preserves input order, so outcomes are recorded
        // deterministically even though execution interleaves.
        let outcomes: Vec<UnitOutcome> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| engine.attempt(unit, fatal))
                .collect()
        });

        for (unit, outcome) in units.iter().zip(outcomes) {
            engine.record(unit, outcome, report);
        }
    }
}
