//! Tests for replaying prerecorded test suites.

#![cfg(feature = "replay")]

use mbt_conform::*;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

/// Accepts A, B and C; answers `Send` with `Reply(value)`.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Action>>,
    reply: i64,
}

impl Implementation for Recorder {
    fn do_action(
        &self,
        action: &Action,
        _cancel: &CancelToken,
    ) -> Result<Option<Action>, ImplementationError> {
        self.calls.lock().push(action.clone());
        switch!(action {
            "A" => Ok(None),
            "B" => Ok(None),
            "C" => Ok(None),
            "Send" => Ok(Some(action!("Reply", self.reply))),
        })
    }

    fn reset(&self) -> Result<(), ImplementationError> {
        Ok(())
    }
}

fn two_case_suite() -> TestSuite {
    TestSuite::new(vec![
        vec![action!("Test", 0), action!("A"), action!("B")],
        vec![action!("Test", 1), action!("A"), action!("C")],
    ])
}

fn replay_config(runs: usize) -> TesterConfig {
    TesterConfig::builder()
        .steps_cnt(10usize)
        .runs_cnt(runs)
        .internal(symbols(["Test"]))
        .build()
        .unwrap()
}

#[test]
fn test_replay_runs_each_case_once() {
    let iut = Arc::new(Recorder::default());
    let strategy = ReplayStrategy::new(two_case_suite());
    let mut tester = Tester::new(strategy, iut.clone(), replay_config(2)).unwrap();

    let mut results = Vec::new();
    let summary = tester
        .run_with(|r| {
            results.push(r.clone());
            true
        })
        .unwrap();

    assert!(summary.all_passed());
    assert_eq!(
        results[0].trace,
        vec![action!("Test", 0), action!("A"), action!("B")]
    );
    assert_eq!(
        results[1].trace,
        vec![action!("Test", 1), action!("A"), action!("C")]
    );
    // Internal markers never reach the implementation.
    assert_eq!(
        *iut.calls.lock(),
        vec![action!("A"), action!("B"), action!("A"), action!("C")]
    );
}

#[test]
fn test_replay_exhausted_suite_runs_empty_cases() {
    let strategy = ReplayStrategy::new(TestSuite::new(vec![vec![action!("A")]]));
    let mut tester = Tester::new(
        strategy,
        Arc::new(Recorder::default()),
        TesterConfig::builder()
            .steps_cnt(5usize)
            .runs_cnt(3usize)
            .build()
            .unwrap(),
    )
    .unwrap();

    let mut traces = Vec::new();
    let summary = tester
        .run_with(|r| {
            traces.push(r.trace.clone());
            true
        })
        .unwrap();

    assert_eq!(summary.successes, 3);
    assert_eq!(traces, vec![vec![action!("A")], vec![], vec![]]);
    assert!(tester.strategy().is_exhausted());
}

#[test]
fn test_replay_detects_diverging_reply() {
    let suite = TestSuite::new(vec![vec![
        action!("Test", 0),
        action!("Send"),
        action!("Reply", 1),
    ]]);
    let config = TesterConfig::builder()
        .steps_cnt(10usize)
        .internal(symbols(["Test"]))
        .observable(symbols(["Reply"]))
        .build()
        .unwrap();
    let iut = Arc::new(Recorder {
        reply: 2,
        ..Default::default()
    });
    let mut tester = Tester::new(ReplayStrategy::new(suite), iut, config).unwrap();

    let result = tester.run_test_case(0);
    assert_eq!(result.failure, Some(FailureKind::ConformanceViolation));
    assert!(
        result
            .reason
            .starts_with("Test case 0 expected Reply(1), observed Reply(2)"),
        "{}",
        result.reason
    );
    assert!(result.reason.contains("+Reply(2)"));
    assert_eq!(result.trace.last(), Some(&action!("Reply", 2)));
}

#[test]
fn test_replay_retries_case_that_was_never_entered() {
    let suite = TestSuite::new(vec![vec![action!("Reply", 1)]]);
    let config = TesterConfig::builder()
        .steps_cnt(3usize)
        .runs_cnt(2usize)
        .observable(symbols(["Reply"]))
        .build()
        .unwrap();
    let mut tester =
        Tester::new(ReplayStrategy::new(suite), Arc::new(Recorder::default()), config).unwrap();

    let summary = tester.run_with(|_| true).unwrap();
    assert_eq!(summary.failures, 2);
    assert_eq!(tester.strategy().current_state().case, 0);
}

// ---------------------------------------------------------------------------
// Loading suites from disk
// ---------------------------------------------------------------------------

#[test]
fn test_parse_suite_json() {
    let suite = TestSuite::from_json_str(
        r#"[[{"name": "Test", "args": [0]}, {"name": "Send", "args": ["a", 2, true]}]]"#,
    )
    .unwrap();
    assert_eq!(
        suite.cases(),
        &[vec![action!("Test", 0), action!("Send", "a", 2, true)]]
    );
    assert_eq!(suite.symbols(), symbols(["Send", "Test"]));
}

#[test]
fn test_load_dir_in_file_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.suite.json"), r#"[[{"name": "B"}]]"#).unwrap();
    fs::write(
        dir.path().join("a.suite.json"),
        r#"[[{"name": "A", "args": [1, "x"]}], [{"name": "A", "args": [2, "y"]}]]"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not a suite").unwrap();

    let suite = TestSuite::load_dir(dir.path()).unwrap();
    assert_eq!(suite.len(), 3);
    assert_eq!(suite.cases()[0], vec![action!("A", 1, "x")]);
    assert_eq!(suite.cases()[1], vec![action!("A", 2, "y")]);
    assert_eq!(suite.cases()[2], vec![action!("B")]);
}

#[test]
fn test_load_dir_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.suite.json"), "[[{").unwrap();

    let err = TestSuite::load_dir(dir.path()).unwrap_err();
    match err {
        Error::Suite(SuiteError::Parse { path, .. }) => {
            assert!(path.ends_with("broken.suite.json"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_load_dir_rejects_empty_and_non_directories() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TestSuite::load_dir(dir.path()),
        Err(Error::Suite(SuiteError::Empty))
    ));

    let file = dir.path().join("single.suite.json");
    fs::write(&file, "[]").unwrap();
    assert!(matches!(
        TestSuite::load_dir(&file),
        Err(Error::Suite(SuiteError::NotADirectory(_)))
    ));
    assert_eq!(TestSuite::load(&file).unwrap(), TestSuite::default());
}
