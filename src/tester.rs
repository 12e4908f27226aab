//! The conformance test driver.
//!
//! A [`Tester`] runs test cases against an implementation under test. Each
//! case interleaves three sources of actions:
//!
//! 1. tester actions chosen by the [`Strategy`] and forwarded to the
//!    implementation under a deadline,
//! 2. observable actions posted by the implementation on its own threads,
//! 3. timeouts synthesized when a wait for an observation elapses.
//!
//! Every action is checked against the model before it enters the trace.
//! A pending observation is always validated before the tester selects its
//! next move.

use crate::action::{Action, Value};
use crate::config::{SymbolPartition, TesterConfig};
use crate::error::Error;
use crate::implementation::Implementation;
use crate::invoke::{BoundedInvoker, Invocation};
use crate::queue::ObservationQueue;
use crate::result::{quote_reason, FailureKind, RunSummary, TestResult};
use crate::strategy::Strategy;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-action deadline function over the strategy's current state.
pub type TimeoutFn<St> = Box<dyn Fn(&St, &Action) -> Duration + Send + Sync>;

/// Drives test cases of a [`Strategy`] against an [`Implementation`].
pub struct Tester<S: Strategy, I: Implementation> {
    strategy: S,
    iut: Arc<I>,
    config: TesterConfig,
    partition: SymbolPartition,
    timeout_fn: Option<TimeoutFn<S::State>>,
    observations: ObservationQueue,
    invoker: BoundedInvoker,
    observing: bool,
    cases_run: usize,
}

impl<S: Strategy, I: Implementation> Tester<S, I> {
    /// Validate `config` against the strategy's vocabulary and connect the
    /// implementation's observer, if it has one.
    pub fn new(strategy: S, iut: Arc<I>, config: TesterConfig) -> Result<Self, Error> {
        let config = config.validate()?;
        let partition = config.partition(strategy.action_symbols())?;

        let observations = ObservationQueue::new();
        let observing = iut.supports_observation();
        if observing {
            iut.set_observer(observations.observer());
        }

        debug!(
            tester = ?partition.tester,
            observable = ?partition.observable,
            cleanup = ?partition.cleanup,
            internal = ?partition.internal,
            observing,
            "Tester configured"
        );

        Ok(Self {
            strategy,
            iut,
            config,
            partition,
            timeout_fn: None,
            observations,
            invoker: BoundedInvoker::new(),
            observing,
            cases_run: 0,
        })
    }

    /// Compute each forwarded action's deadline from the model state before
    /// the action and the action itself. Defaults to
    /// [`TesterConfig::default_timeout`].
    pub fn with_timeout_fn(
        mut self,
        timeout_fn: impl Fn(&S::State, &Action) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.timeout_fn = Some(Box::new(timeout_fn));
        self
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    /// Configuration changes take effect on the next [`Tester::run`].
    pub fn config_mut(&mut self) -> &mut TesterConfig {
        &mut self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn implementation(&self) -> &Arc<I> {
        &self.iut
    }

    /// Implementation calls abandoned after their deadline that have not
    /// yet been seen to finish.
    pub fn abandoned_calls(&mut self) -> usize {
        self.invoker.reap()
    }

    /// Run test cases, logging each result.
    pub fn run(&mut self) -> Result<RunSummary, Error> {
        self.run_with(log_result)
    }

    /// Run test cases, passing each result to `on_result`.
    ///
    /// Runs `runs_cnt` cases (unbounded when 0), resetting the strategy and
    /// the implementation between cases. Stops early when `on_result`
    /// returns false, or after a failure unless `continue_on_failure` is set.
    /// A failed implementation reset aborts the run with [`Error::Reset`].
    pub fn run_with<F>(&mut self, mut on_result: F) -> Result<RunSummary, Error>
    where
        F: FnMut(&TestResult) -> bool,
    {
        self.config = self.config.clone().validate()?;
        self.partition = self.config.partition(self.strategy.action_symbols())?;

        info!(
            runs = self.config.runs_cnt,
            steps = self.config.steps_cnt(),
            max_steps = self.config.max_steps_cnt(),
            "Starting conformance run"
        );

        let mut summary = RunSummary::default();
        let mut run = 0;

        while self.config.runs_cnt == 0 || run < self.config.runs_cnt {
            if self.cases_run > 0 {
                if let Err(e) = self.reset(run) {
                    self.invoker.shutdown();
                    self.observations.clear();
                    return Err(e);
                }
            }

            let result = self.run_test_case(run);
            self.cases_run += 1;
            summary.record(&result);

            if !on_result(&result) {
                debug!(run, "Run stopped by result callback");
                break;
            }
            if !result.is_success() && !self.config.continue_on_failure {
                debug!(run, "Run stopped after failure");
                break;
            }
            run += 1;
        }

        self.finish(&summary);
        Ok(summary)
    }

    fn reset(&mut self, run: usize) -> Result<(), Error> {
        self.strategy.reset();
        self.iut
            .reset()
            .map_err(|source| Error::Reset { run, source })?;
        self.observations.clear();
        self.invoker.reap();
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.invoker.shutdown();
        info!(
            runs = summary.runs,
            successes = summary.successes,
            failures = summary.failures,
            "Conformance run finished"
        );
    }

    fn timeout_for(&self, action: &Action) -> Duration {
        match &self.timeout_fn {
            Some(f) => f(self.strategy.current_state(), action),
            None => self.config.default_timeout,
        }
    }

    /// Run a single test case from the strategy's current state.
    pub fn run_test_case(&mut self, run: usize) -> TestResult {
        let steps_cnt = self.config.steps_cnt();
        let max_steps = self.config.max_steps_cnt();
        let wait_symbols = BTreeSet::from([self.config.wait_action.clone()]);

        let mut trace: Vec<Action> = Vec::new();
        let mut pending: Option<Action> = None;
        let mut steps = 0usize;

        debug!(run, "Starting test case");

        loop {
            if let Some(action) = pending.take() {
                if let Err(reason) = self.strategy.is_enabled(&action) {
                    trace.push(action);
                    return TestResult::failure(
                        run,
                        FailureKind::ConformanceViolation,
                        reason,
                        trace,
                    );
                }
                self.strategy.do_action(&action);
                debug!(run, step = trace.len(), action = %action, "Observed action");
                trace.push(action);
                continue;
            }

            if max_steps > 0 && steps >= max_steps {
                debug!(run, steps, "Step ceiling reached");
                break;
            }

            if let Some(action) = self.observations.try_dequeue(Duration::ZERO) {
                steps += 1;
                pending = Some(action);
                continue;
            }

            let budget_spent = steps >= steps_cnt;
            if budget_spent && self.strategy.is_accepting() {
                break;
            }

            let symbols = if budget_spent {
                &self.partition.cleanup
            } else {
                &self.partition.tester
            };

            let Some(action) = self.strategy.select_action(symbols) else {
                if !self.observing {
                    return self.verdict(run, trace, "run stopped in a non-accepting state");
                }

                let wait = match self.strategy.select_action(&wait_symbols) {
                    Some(wait_action) => {
                        let wait = wait_duration(&wait_action);
                        self.strategy.do_action(&wait_action);
                        debug!(run, step = trace.len(), action = %wait_action, "Waiting for observation");
                        trace.push(wait_action);
                        steps += 1;
                        wait
                    }
                    None => Duration::ZERO,
                };

                steps += 1;
                match self.observations.try_dequeue(wait) {
                    Some(observed) => pending = Some(observed),
                    None if self.strategy.is_accepting() => {
                        return TestResult::success(run, trace);
                    }
                    None => {
                        pending = Some(Action::nullary(self.config.timeout_action.clone()));
                    }
                }
                continue;
            };

            steps += 1;
            let internal = self.partition.internal.contains(action.name());
            let deadline = if internal {
                Duration::ZERO
            } else {
                self.timeout_for(&action)
            };

            self.strategy.do_action(&action);
            debug!(run, step = trace.len(), action = %action, internal, "Tester action");
            trace.push(action.clone());

            if internal {
                continue;
            }

            let iut = Arc::clone(&self.iut);
            let forwarded = action.clone();
            let outcome = self
                .invoker
                .invoke(&action, deadline, move |cancel| iut.do_action(&forwarded, cancel));

            match outcome {
                Invocation::Completed(Some(reply)) => {
                    debug!(run, action = %action, reply = %reply, "Implementation replied");
                    pending = Some(reply);
                }
                Invocation::Completed(None) => {}
                Invocation::Failed(e) => {
                    return TestResult::failure(
                        run,
                        FailureKind::ImplementationError,
                        quote_reason(&e.to_string()),
                        trace,
                    );
                }
                Invocation::TimedOut => {
                    return TestResult::failure(run, FailureKind::Timeout, "Action timed out", trace);
                }
            }
        }

        self.verdict(run, trace, "test run did not finish in accepting state")
    }

    fn verdict(&self, run: usize, trace: Vec<Action>, failure_reason: &str) -> TestResult {
        if self.strategy.is_accepting() {
            TestResult::success(run, trace)
        } else {
            TestResult::failure(run, FailureKind::NonAccepting, failure_reason, trace)
        }
    }
}

/// Milliseconds to wait, from the wait action's first argument.
fn wait_duration(wait_action: &Action) -> Duration {
    match wait_action.arg(0).and_then(Value::as_int) {
        Some(millis) if millis >= 0 => Duration::from_millis(millis as u64),
        _ => {
            warn!(
                action = %wait_action,
                "Wait action has no non-negative integer argument, not waiting"
            );
            Duration::ZERO
        }
    }
}

/// Default result sink: logs the verdict, reason and trace and keeps going.
pub fn log_result(result: &TestResult) -> bool {
    let trace = result
        .trace
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    if result.is_success() {
        info!(run = result.run, steps = result.trace.len(), %trace, "Test case passed");
    } else {
        warn!(
            run = result.run,
            reason = %result.reason,
            kind = ?result.failure,
            %trace,
            "Test case failed"
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action;

    #[test]
    fn wait_duration_reads_milliseconds() {
        assert_eq!(wait_duration(&action!("Wait", 250)), Duration::from_millis(250));
        assert_eq!(wait_duration(&action!("Wait", 0)), Duration::ZERO);
    }

    #[test]
    fn malformed_wait_argument_does_not_wait() {
        assert_eq!(wait_duration(&action!("Wait", -5)), Duration::ZERO);
        assert_eq!(wait_duration(&action!("Wait", "soon")), Duration::ZERO);
        assert_eq!(wait_duration(&action!("Wait")), Duration::ZERO);
    }
}
