//! Check outcomes and the rendered run summary.

use std::fmt::Write as _;

const SEPARATOR: &str = "*********";

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    /// Observed value, or the error raised while observing it
    pub actual: String,
    /// Failure description; empty for passing checks
    pub message: String,
}

impl CheckOutcome {
    pub fn pass(name: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            actual: actual.into(),
            message: String::new(),
        }
    }

    pub fn fail(
        name: impl Into<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            actual: actual.into(),
            message: message.into(),
        }
    }
}

/// Ordered outcomes of a scenario run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    outcomes: Vec<CheckOutcome>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: CheckOutcome) {
        if outcome.passed {
            tracing::info!("check passed: {}", outcome.name);
        } else {
            tracing::warn!("check failed: {}: {}", outcome.name, outcome.message);
        }
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Human-readable diagnostics: every failure bracketed by separator
    /// lines, then the summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in self.outcomes.iter().filter(|o| !o.passed) {
            let _ = writeln!(out, "{}", SEPARATOR);
            let _ = writeln!(out, "{}", outcome.actual);
            let _ = writeln!(out, "{}", outcome.message);
            let _ = writeln!(out, "{}", SEPARATOR);
        }
        if self.is_success() {
            out.push_str("All executions done!!\n");
        } else {
            out.push_str("Some test failed, please have a check\n");
            let _ = writeln!(out, "failed count: {}", self.failed_count());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_report_succeeds() {
        let report = TestReport::new();
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.render(), "All executions done!!\n");
    }

    #[test]
    fn test_passing_checks_render_summary_only() {
        let mut report = TestReport::new();
        report.record(CheckOutcome::pass("get_columns", "3"));
        assert_eq!(report.render(), "All executions done!!\n");
        assert_eq!(report.outcome("get_columns").map(|o| o.actual.as_str()), Some("3"));
    }

    #[test]
    fn test_failures_are_bracketed_and_counted() {
        let mut report = TestReport::new();
        report.record(CheckOutcome::pass("get_schema_names", "[]"));
        report.record(CheckOutcome::fail(
            "get_table_names",
            "[\"device1\"]",
            "get_table_names failed!",
        ));
        report.record(CheckOutcome::fail("get_columns", "2", "get_columns failed!"));

        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            report.render(),
            "*********\n[\"device1\"]\nget_table_names failed!\n*********\n\
             *********\n2\nget_columns failed!\n*********\n\
             Some test failed, please have a check\nfailed count: 2\n"
        );
    }
}
