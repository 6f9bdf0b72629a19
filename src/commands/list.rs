//! The `list` command: show every unit declared in the manifest.

use anyhow::Result;

use crate::cli::{GlobalOpts, ListOpts};
use crate::commands::CommandSetup;
use crate::logging::Logger;

/// Print every unit with its tags and criticality, in id order.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or the graph is
/// invalid.
pub fn run(global: &GlobalOpts, _opts: &ListOpts, log: &Logger) -> Result<i32> {
    let setup = CommandSetup::init(global, log)?;

    log.stage("Units");
    for unit in setup.graph.units() {
        let critical = if unit.critical { " [critical]" } else { "" };
        let tags = if unit.tags.is_empty() {
            String::new()
        } else {
            format!(" ({})", unit.tags.join(", "))
        };
        let detail = if unit.description.is_empty() {
            String::new()
        } else {
            format!("  {}", unit.description)
        };
        log.info(&format!("{}{critical}{tags}{detail}", unit.id));
    }
    log.info(&format!("{} units", setup.graph.len()));

    Ok(0)
}
