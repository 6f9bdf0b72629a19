//! The `run` command: one convergence pass over the selected units.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;

use crate::cli::{GlobalOpts, RunOpts};
use crate::commands::CommandSetup;
use crate::context::RunContext;
use crate::engine::{ConvergenceEngine, RetryPolicy};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::units::Selection;

/// Run the convergence engine over the selected units and print the report.
///
/// Returns the run's exit code: 0 on success, 1 when non-critical units
/// failed, 2 on a fatal abort. Configuration problems (bad selection,
/// invalid manifest, cycles) surface as errors, which the caller maps to
/// exit code 3 before anything executes.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the unit graph is
/// invalid, or the selection does not resolve.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<i32> {
    let setup = CommandSetup::init(global, log)?;
    let selection: Selection = opts.select.parse()?;

    log.stage("Resolving plan");
    let plan = setup.graph.resolve_plan(&selection)?;
    log.info(&format!("{} of {} units selected ({selection})", plan.len(), setup.graph.len()));

    let ctx = RunContext::new(
        Arc::new(SystemExecutor),
        Arc::clone(log) as Arc<dyn Log>,
        opts.dry_run,
        RetryPolicy::new(opts.max_retries),
        opts.concurrency,
    );
    install_interrupt_handler(&ctx, log);

    let engine = ConvergenceEngine::new(&setup.graph, &ctx);
    let report = engine.run(&plan);

    if opts.json {
        println!("{}", report.to_json()?);
    } else {
        log.stage("Summary");
        print!("{}", report.render());
        if let Some(path) = log.log_path() {
            log.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    Ok(report.exit_code().unwrap_or(0))
}

/// Wire SIGINT to the run's cancellation flag.
///
/// The handler only sets the flag: the engine stops launching new units and
/// lets in-flight applies finish, so a partially applied transaction is
/// never abandoned mid-process.
fn install_interrupt_handler(ctx: &RunContext, log: &Logger) {
    let flag = ctx.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        log.warn(&format!("cannot install interrupt handler: {e}"));
    }
}
