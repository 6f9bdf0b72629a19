//! Run reports: per-unit outcomes and the run-level summary.
//!
//! The report is append-only while the engine runs and is finalized exactly
//! once at run end, when the exit code is computed. Rendering is
//! deterministic: outcomes are grouped by status in a fixed order and listed
//! in plan order within each group.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::logging::terminal_columns;

/// Final status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitStatus {
    /// The unit's apply action ran and succeeded.
    Succeeded,
    /// The unit was already converged; apply was never invoked.
    Skipped,
    /// Dry-run: the unit is not converged and apply would have run.
    WouldApply,
    /// The unit's check or apply failed after all retries.
    Failed,
    /// Never attempted: an earlier critical unit failed.
    Aborted,
    /// Never attempted: the run was cancelled first.
    Cancelled,
}

impl UnitStatus {
    /// Fixed rendering order for grouped summaries.
    const RENDER_ORDER: [Self; 6] = [
        Self::Succeeded,
        Self::Skipped,
        Self::WouldApply,
        Self::Failed,
        Self::Aborted,
        Self::Cancelled,
    ];

    /// Glyph and ANSI colour used in the rendered summary.
    const fn glyph(self) -> (&'static str, &'static str) {
        match self {
            Self::Succeeded => ("✓", "\x1b[32m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::WouldApply => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
            Self::Aborted => ("·", "\x1b[2m"),
            Self::Cancelled => ("-", "\x1b[2m"),
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::WouldApply => "would-apply",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// The result of attempting one unit.
///
/// Created the moment a unit finishes evaluation; immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    /// Id of the unit this outcome belongs to.
    pub unit_id: String,
    /// Final status.
    pub status: UnitStatus,
    /// Detail message: failure diagnostic, dry-run action, abort reason.
    pub message: Option<String>,
    /// When the unit finished evaluation (UTC).
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time the unit took, in milliseconds.
    pub duration_ms: u64,
}

impl UnitOutcome {
    /// Record an outcome stamped with the current time.
    #[must_use]
    pub fn new(
        unit_id: &str,
        status: UnitStatus,
        message: Option<String>,
        duration: std::time::Duration,
    ) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            status,
            message,
            timestamp: Utc::now(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Ordered per-unit outcomes plus run-level metadata.
///
/// Owned exclusively by the convergence engine during a run; append-only
/// until [`finalize`](Self::finalize) computes the exit code.
#[derive(Debug, Serialize)]
pub struct RunReport {
    outcomes: Vec<UnitOutcome>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    fatal: bool,
    exit_code: Option<i32>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Start an empty report stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            fatal: false,
            exit_code: None,
        }
    }

    /// Append one unit's outcome.
    pub fn record(&mut self, outcome: UnitOutcome) {
        self.outcomes.push(outcome);
    }

    /// Mark the run as fatally aborted by a critical failure.
    pub const fn set_fatal(&mut self) {
        self.fatal = true;
    }

    /// Whether a critical unit has failed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// All recorded outcomes in plan order.
    #[must_use]
    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    /// Number of outcomes with the given status.
    #[must_use]
    pub fn count(&self, status: UnitStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Whether any unit failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.count(UnitStatus::Failed) > 0
    }

    /// Close the report and compute the exit code.
    ///
    /// 0 when every outcome is benign, 1 when a non-critical unit failed,
    /// 2 when a critical failure aborted the run. Cancelled outcomes do not
    /// affect the exit code.
    pub fn finalize(&mut self) -> i32 {
        self.finished_at = Some(Utc::now());
        let code = if self.fatal {
            2
        } else if self.has_failures() {
            1
        } else {
            0
        };
        self.exit_code = Some(code);
        code
    }

    /// Exit code computed by [`finalize`](Self::finalize), if it ran.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Deterministic human-readable summary, grouped by status.
    ///
    /// One line per unit (glyph, id, message truncated to the terminal
    /// width) followed by a totals line.
    #[must_use]
    pub fn render(&self) -> String {
        let width = terminal_columns();
        let mut out = String::new();

        for status in UnitStatus::RENDER_ORDER {
            for outcome in self.outcomes.iter().filter(|o| o.status == status) {
                let (glyph, color) = status.glyph();
                let suffix = outcome
                    .message
                    .as_ref()
                    .map_or_else(String::new, |msg| format!(" ({msg})"));
                let line = format!("{glyph} {}{suffix}", outcome.unit_id);
                let line = truncate_chars(&line, width);
                out.push_str(&format!("{color}{line}\x1b[0m\n"));
            }
        }

        let totals: Vec<String> = UnitStatus::RENDER_ORDER
            .iter()
            .map(|s| format!("{} {s}", self.count(*s)))
            .collect();
        out.push_str(&format!(
            "\n{} units: {}\n",
            self.outcomes.len(),
            totals.join(", ")
        ));
        out
    }

    /// Machine-readable form of the full report.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (it cannot for this type in
    /// practice).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Truncate to at most `max` characters, appending `…` when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(id: &str, status: UnitStatus, message: Option<&str>) -> UnitOutcome {
        UnitOutcome::new(id, status, message.map(String::from), Duration::ZERO)
    }

    // -----------------------------------------------------------------------
    // Exit codes
    // -----------------------------------------------------------------------

    #[test]
    fn all_benign_outcomes_exit_zero() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.record(outcome("b", UnitStatus::Skipped, None));
        report.record(outcome("c", UnitStatus::WouldApply, None));
        assert_eq!(report.finalize(), 0);
        assert_eq!(report.exit_code(), Some(0));
    }

    #[test]
    fn noncritical_failure_exits_one() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.record(outcome("b", UnitStatus::Failed, Some("boom")));
        assert_eq!(report.finalize(), 1);
    }

    #[test]
    fn fatal_abort_exits_two() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Failed, Some("boom")));
        report.set_fatal();
        report.record(outcome("b", UnitStatus::Aborted, None));
        assert_eq!(report.finalize(), 2);
    }

    #[test]
    fn cancelled_outcomes_do_not_fail_the_run() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.record(outcome("b", UnitStatus::Cancelled, None));
        assert_eq!(report.finalize(), 0);
    }

    #[test]
    fn empty_report_exits_zero() {
        let mut report = RunReport::new();
        assert_eq!(report.finalize(), 0);
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    #[test]
    fn count_by_status() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.record(outcome("b", UnitStatus::Succeeded, None));
        report.record(outcome("c", UnitStatus::Failed, None));
        assert_eq!(report.count(UnitStatus::Succeeded), 2);
        assert_eq!(report.count(UnitStatus::Failed), 1);
        assert_eq!(report.count(UnitStatus::Cancelled), 0);
        assert!(report.has_failures());
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    #[test]
    fn render_groups_by_status_in_fixed_order() {
        let mut report = RunReport::new();
        report.record(outcome("failed-unit", UnitStatus::Failed, Some("exit 1")));
        report.record(outcome("ok-unit", UnitStatus::Succeeded, None));
        report.finalize();

        let rendered = report.render();
        let ok_pos = rendered.find("ok-unit").unwrap();
        let failed_pos = rendered.find("failed-unit").unwrap();
        assert!(
            ok_pos < failed_pos,
            "succeeded group renders before failed group"
        );
    }

    #[test]
    fn render_includes_messages() {
        let mut report = RunReport::new();
        report.record(outcome(
            "docker-engine",
            UnitStatus::Failed,
            Some("exited with status 1: no network"),
        ));
        report.finalize();
        let rendered = report.render();
        assert!(rendered.contains("docker-engine"));
        assert!(rendered.contains("no network"));
    }

    #[test]
    fn render_totals_line_counts_every_status() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.record(outcome("b", UnitStatus::Skipped, None));
        report.finalize();
        let rendered = report.render();
        assert!(rendered.contains("2 units:"));
        assert!(rendered.contains("1 succeeded"));
        assert!(rendered.contains("1 skipped"));
        assert!(rendered.contains("0 failed"));
    }

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate_chars("short", 80), "short");
    }

    #[test]
    fn truncate_cuts_long_strings_with_ellipsis() {
        let long = "x".repeat(100);
        let cut = truncate_chars(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    #[test]
    fn to_json_emits_outcomes_and_exit_code() {
        let mut report = RunReport::new();
        report.record(outcome("a", UnitStatus::Succeeded, None));
        report.finalize();

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["exit_code"], 0);
        assert_eq!(value["outcomes"][0]["unit_id"], "a");
        assert_eq!(value["outcomes"][0]["status"], "succeeded");
        assert!(value["outcomes"][0]["timestamp"].is_string());
    }

    #[test]
    fn outcome_duration_is_recorded_in_millis() {
        let o = UnitOutcome::new("a", UnitStatus::Succeeded, None, Duration::from_millis(1500));
        assert_eq!(o.duration_ms, 1500);
    }
}
