//! The `plan` command: print the resolved execution order without running.

use anyhow::Result;

use crate::cli::{GlobalOpts, PlanOpts};
use crate::commands::CommandSetup;
use crate::logging::Logger;
use crate::units::Selection;

/// Resolve and print the execution plan for a selection.
///
/// Touches nothing on the system; this is the cheap way to inspect ordering
/// and verify a manifest before a real run.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the graph is invalid,
/// or the selection does not resolve.
pub fn run(global: &GlobalOpts, opts: &PlanOpts, log: &Logger) -> Result<i32> {
    let setup = CommandSetup::init(global, log)?;
    let selection: Selection = opts.select.parse()?;
    let plan = setup.graph.resolve_plan(&selection)?;

    log.stage(&format!("Execution plan ({selection})"));
    for (position, id) in plan.ids().iter().enumerate() {
        let Some(unit) = setup.graph.get(id) else {
            continue;
        };
        let marker = if unit.critical { " [critical]" } else { "" };
        let detail = if unit.description.is_empty() {
            String::new()
        } else {
            format!("  {}", unit.description)
        };
        log.info(&format!("{:>3}. {id}{marker}{detail}", position + 1));
    }
    log.info(&format!("{} units", plan.len()));

    Ok(0)
}
