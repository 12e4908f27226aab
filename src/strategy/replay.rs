//! Replay of fixed, prerecorded test suites.
//!
//! A test suite is a list of test cases, each an ordered list of actions.
//! Selection does not search the model: it offers the next unconsumed action
//! of the current case, and any action (tester or observed) is enabled only
//! if it literally equals that next action.
//!
//! Suite files are JSON arrays of cases:
//!
//! ```json
//! [
//!   [{"name": "Test", "args": [0]}, {"name": "A"}, {"name": "B"}],
//!   [{"name": "Test", "args": [1]}, {"name": "A"}, {"name": "C"}]
//! ]
//! ```

use super::Strategy;
use crate::action::Action;
use crate::error::{Error, SuiteError};
use crate::result::trace_diff;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// An ordered collection of prerecorded test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestSuite {
    cases: Vec<Vec<Action>>,
}

impl TestSuite {
    pub fn new(cases: Vec<Vec<Action>>) -> Self {
        Self { cases }
    }

    pub fn cases(&self) -> &[Vec<Action>] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Every action symbol used anywhere in the suite.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.cases
            .iter()
            .flatten()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Parse a suite from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a suite from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SuiteError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Load and concatenate every `*.suite.json` file in `dir`, in file-name
    /// order.
    pub fn load_dir(dir: &Path) -> Result<Self, Error> {
        if !dir.is_dir() {
            return Err(SuiteError::NotADirectory(dir.to_path_buf()).into());
        }

        let read_error = |e: std::io::Error| SuiteError::DirectoryRead {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if filename.ends_with(".suite.json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut suite = TestSuite::default();
        for path in &paths {
            let part = Self::load(path)?;
            debug!(path = %path.display(), cases = part.len(), "Loaded test suite file");
            suite.cases.extend(part.cases);
        }

        if suite.is_empty() {
            return Err(SuiteError::Empty.into());
        }
        Ok(suite)
    }
}

/// Position of a [`ReplayStrategy`] within its suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayCursor {
    /// Index of the current test case.
    pub case: usize,
    /// Number of actions of the current case already consumed.
    pub position: usize,
}

/// Plays the cases of a [`TestSuite`] one per test run.
///
/// [`Strategy::reset`] moves on to the next case only if the current one was
/// entered (at least one of its actions was taken); otherwise the same case
/// is retried. Once the suite is exhausted no actions are offered and the
/// strategy reports an accepting state.
pub struct ReplayStrategy {
    suite: TestSuite,
    symbols: BTreeSet<String>,
    cursor: ReplayCursor,
    entered: bool,
}

impl ReplayStrategy {
    pub fn new(suite: TestSuite) -> Self {
        let symbols = suite.symbols();
        Self {
            suite,
            symbols,
            cursor: ReplayCursor::default(),
            entered: false,
        }
    }

    /// Add symbols that do not occur in the suite, such as observable
    /// actions that a correct implementation never produces.
    pub fn with_symbols<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Whether every case has been played.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.case >= self.suite.len()
    }

    fn current_case(&self) -> &[Action] {
        self.suite
            .cases
            .get(self.cursor.case)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn next_expected(&self) -> Option<&Action> {
        self.current_case().get(self.cursor.position)
    }
}

impl Strategy for ReplayStrategy {
    type State = ReplayCursor;

    fn action_symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    fn current_state(&self) -> &ReplayCursor {
        &self.cursor
    }

    fn enabled_actions(&self, symbols: &BTreeSet<String>) -> Vec<Action> {
        self.next_expected()
            .filter(|a| symbols.contains(a.name()))
            .cloned()
            .into_iter()
            .collect()
    }

    fn is_enabled(&self, action: &Action) -> Result<(), String> {
        if !self.symbols.contains(action.name()) {
            return Err(format!(
                "Action symbol '{}' is not in the test suite's vocabulary",
                action.name()
            ));
        }

        let case = self.current_case();
        let position = self.cursor.position;
        match case.get(position) {
            Some(expected) if expected == action => Ok(()),
            Some(expected) => {
                let mut observed = case[..position].to_vec();
                observed.push(action.clone());
                Err(format!(
                    "Test case {} expected {expected}, observed {action}\n{}",
                    self.cursor.case,
                    trace_diff(&case[..=position], &observed)
                ))
            }
            None => Err(format!(
                "Test case {} expects no further actions, observed {action}",
                self.cursor.case
            )),
        }
    }

    fn do_action(&mut self, action: &Action) {
        debug_assert!(self.is_enabled(action).is_ok());
        if self.next_expected() == Some(action) {
            self.cursor.position += 1;
            self.entered = true;
        }
    }

    fn select_action(&mut self, symbols: &BTreeSet<String>) -> Option<Action> {
        self.enabled_actions(symbols).pop()
    }

    fn is_accepting(&self) -> bool {
        self.cursor.position >= self.current_case().len()
    }

    fn reset(&mut self) {
        if self.entered {
            self.cursor.case += 1;
        }
        self.cursor.position = 0;
        self.entered = false;

        if self.is_exhausted() {
            warn!(cases = self.suite.len(), "Test suite exhausted");
        } else {
            debug!(case = self.cursor.case, "Replaying test case");
        }
    }
}
