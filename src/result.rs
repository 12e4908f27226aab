//! Verdicts and per-test-case results.

use crate::action::Action;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt;

/// Outcome of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failure,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => f.write_str("Success"),
            Verdict::Failure => f.write_str("Failure"),
        }
    }
}

/// Why a test case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FailureKind {
    /// An action was not enabled in the current model state.
    ConformanceViolation,
    /// A forwarded action missed its deadline.
    Timeout,
    /// The implementation raised an error.
    ImplementationError,
    /// The test case ended in a non-accepting model state.
    NonAccepting,
}

/// Result of one test case. Built once by the driver and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TestResult {
    pub run: usize,
    pub verdict: Verdict,
    /// Empty on success.
    pub reason: String,
    /// Failure classification, `None` on success.
    pub failure: Option<FailureKind>,
    /// Every action taken, up to and including a failing one.
    pub trace: Vec<Action>,
}

impl TestResult {
    pub fn success(run: usize, trace: Vec<Action>) -> Self {
        Self {
            run,
            verdict: Verdict::Success,
            reason: String::new(),
            failure: None,
            trace,
        }
    }

    pub fn failure(
        run: usize,
        kind: FailureKind,
        reason: impl Into<String>,
        trace: Vec<Action>,
    ) -> Self {
        Self {
            run,
            verdict: Verdict::Failure,
            reason: reason.into(),
            failure: Some(kind),
            trace,
        }
    }

    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {}: {}", self.run, self.verdict)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        for action in &self.trace {
            write!(f, "\n  {action}")?;
        }
        Ok(())
    }
}

/// Aggregate counts over one `run` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub runs: usize,
    pub successes: usize,
    pub failures: usize,
    pub failed_runs: Vec<usize>,
}

impl RunSummary {
    pub fn record(&mut self, result: &TestResult) {
        self.runs += 1;
        match result.verdict {
            Verdict::Success => self.successes += 1,
            Verdict::Failure => {
                self.failures += 1;
                self.failed_runs.push(result.run);
            }
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failures == 0
    }
}

/// Wrap `message` in double quotes, escaping embedded quotes, backslashes
/// and control characters so it can sit inside a structured log line.
pub fn quote_reason(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 2);
    out.push('"');
    for c in message.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Unified diff between two traces, one action per line.
pub fn trace_diff(expected: &[Action], actual: &[Action]) -> String {
    let left = render_lines(expected);
    let right = render_lines(actual);
    let diff = TextDiff::from_lines(&left, &right);
    let mut output = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        output.push_str(sign);
        output.push_str(change.value());
        if !change.value().ends_with('\n') {
            output.push('\n');
        }
    }

    output
}

fn render_lines(trace: &[Action]) -> String {
    trace.iter().map(|a| format!("{a}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action;

    #[test]
    fn quote_reason_plain() {
        assert_eq!(quote_reason("refused"), "\"refused\"");
    }

    #[test]
    fn quote_reason_escapes_quotes_and_controls() {
        assert_eq!(quote_reason(r#"bad "id""#), r#""bad \"id\"""#);
        assert_eq!(quote_reason("a\\b"), r#""a\\b""#);
        assert_eq!(quote_reason("a\nb\tc"), r#""a\nb\tc""#);
        assert_eq!(quote_reason("a\x01b"), r#""a\u0001b""#);
    }

    #[test]
    fn trace_diff_marks_divergence() {
        let expected = vec![action!("Test", 1), action!("A"), action!("C")];
        let actual = vec![action!("Test", 1), action!("A"), action!("B")];
        let diff = trace_diff(&expected, &actual);
        assert!(diff.contains(" Test(1)\n"));
        assert!(diff.contains("-C()\n"));
        assert!(diff.contains("+B()\n"));
    }

    #[test]
    fn summary_counts_verdicts() {
        let mut summary = RunSummary::default();
        summary.record(&TestResult::success(0, vec![]));
        summary.record(&TestResult::failure(
            1,
            FailureKind::Timeout,
            "Action timed out",
            vec![action!("Hang")],
        ));
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.failed_runs, vec![1]);
        assert!(!summary.all_passed());
    }

    #[test]
    fn display_lists_trace() {
        let result = TestResult::failure(
            3,
            FailureKind::NonAccepting,
            "test run did not finish in accepting state",
            vec![action!("Create", "c0")],
        );
        assert_eq!(
            result.to_string(),
            "run 3: Failure (test run did not finish in accepting state)\n  Create(\"c0\")"
        );
    }
}
