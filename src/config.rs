//! Run configuration and symbol-partition validation.

use crate::builder::impl_builder;
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

/// Collect action names into a symbol set.
pub fn symbols<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Configuration of a [`Tester`](crate::Tester).
///
/// Fixed for the duration of one `run`; changes made between runs take
/// effect on the next one.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct TesterConfig {
    /// Step budget per test case. After it is spent only cleanup actions are
    /// selected, steering the model toward an accepting state.
    steps_cnt: usize,

    /// Hard step ceiling per test case (0 = none).
    max_steps_cnt: usize,

    /// Number of test cases per run (0 = unbounded).
    pub runs_cnt: usize,

    /// Deadline for a forwarded action when no timeout function is set.
    pub default_timeout: Duration,

    /// Symbol of the action whose integer argument is the number of
    /// milliseconds to wait for an observation (default: "Wait").
    pub wait_action: String,

    /// Symbol of the action synthesized when a wait elapses without an
    /// observation (default: "Timeout").
    pub timeout_action: String,

    /// Actions driven by the implementation.
    pub observable: BTreeSet<String>,

    /// Tester actions allowed once the step budget is spent.
    pub cleanup: BTreeSet<String>,

    /// Tester actions applied to the model only, never forwarded.
    pub internal: BTreeSet<String>,

    /// Keep running test cases after a failing one.
    pub continue_on_failure: bool,

    /// Seed for action selection. Drawn at random (and logged) when unset.
    ///
    /// Only takes effect through [`TesterConfig::rng`]: build the strategy
    /// from `config.rng()`. A strategy given its own RNG (for example via
    /// `RandomStrategy::with_seed`) ignores this field.
    pub seed: Option<u64>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            steps_cnt: 0,
            max_steps_cnt: 0,
            runs_cnt: 1,
            default_timeout: Duration::from_secs(10),
            wait_action: "Wait".into(),
            timeout_action: "Timeout".into(),
            observable: BTreeSet::new(),
            cleanup: BTreeSet::new(),
            internal: BTreeSet::new(),
            continue_on_failure: true,
            seed: None,
        }
    }
}

impl_builder!(TesterConfig, TesterConfigBuilder {
    optional {
        steps_cnt: usize,
        max_steps_cnt: usize,
        runs_cnt: usize,
        default_timeout: Duration,
        wait_action: String,
        timeout_action: String,
        observable: BTreeSet<String>,
        cleanup: BTreeSet<String>,
        internal: BTreeSet<String>,
        continue_on_failure: bool,
    }
    optional_or {
        seed: u64,
    }
});

impl TesterConfig {
    pub fn steps_cnt(&self) -> usize {
        self.steps_cnt
    }

    pub fn max_steps_cnt(&self) -> usize {
        self.max_steps_cnt
    }

    /// Set the step budget. Zero means "same as the ceiling".
    pub fn set_steps_cnt(&mut self, steps: usize) -> Result<(), ConfigError> {
        check_ceiling(steps, self.max_steps_cnt)?;
        self.steps_cnt = if steps == 0 { self.max_steps_cnt } else { steps };
        Ok(())
    }

    /// Set the hard step ceiling. An unset budget follows the ceiling.
    pub fn set_max_steps_cnt(&mut self, max: usize) -> Result<(), ConfigError> {
        check_ceiling(self.steps_cnt, max)?;
        self.max_steps_cnt = max;
        if self.steps_cnt == 0 {
            self.steps_cnt = max;
        }
        Ok(())
    }

    /// Check the step invariant and fill an unset budget from the ceiling.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        check_ceiling(self.steps_cnt, self.max_steps_cnt)?;
        if self.steps_cnt == 0 {
            self.steps_cnt = self.max_steps_cnt;
        }
        Ok(self)
    }

    /// Split `vocabulary` into tester, observable, cleanup and internal sets.
    ///
    /// The wait and timeout symbols belong to the driver and are never in
    /// the tester set.
    pub fn partition(&self, vocabulary: &BTreeSet<String>) -> Result<SymbolPartition, ConfigError> {
        if vocabulary.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }

        if let Some(symbol) = self.observable.iter().find(|s| !vocabulary.contains(*s)) {
            return Err(ConfigError::UnknownSymbol {
                set: "observable",
                symbol: symbol.clone(),
            });
        }

        let tester: BTreeSet<String> = vocabulary
            .iter()
            .filter(|s| !self.observable.contains(*s))
            .filter(|s| **s != self.wait_action && **s != self.timeout_action)
            .cloned()
            .collect();

        for (set, symbols) in [("cleanup", &self.cleanup), ("internal", &self.internal)] {
            for symbol in symbols {
                if !vocabulary.contains(symbol) {
                    return Err(ConfigError::UnknownSymbol {
                        set,
                        symbol: symbol.clone(),
                    });
                }
                if !tester.contains(symbol) {
                    return Err(ConfigError::NotTesterAction {
                        set,
                        symbol: symbol.clone(),
                    });
                }
            }
        }

        Ok(SymbolPartition {
            tester,
            observable: self.observable.clone(),
            cleanup: self.cleanup.clone(),
            internal: self.internal.clone(),
        })
    }

    /// A selection RNG seeded from `seed`, or from a fresh logged seed.
    pub fn rng(&self) -> StdRng {
        let seed = self.seed.unwrap_or_else(|| {
            let seed = rand::rng().random();
            info!(seed, "No seed configured, drawing one");
            seed
        });
        StdRng::seed_from_u64(seed)
    }
}

fn check_ceiling(steps: usize, max: usize) -> Result<(), ConfigError> {
    if max != 0 && max < steps {
        return Err(ConfigError::StepCeiling { steps, max });
    }
    Ok(())
}

/// The action vocabulary split by who drives each symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPartition {
    pub tester: BTreeSet<String>,
    pub observable: BTreeSet<String>,
    pub cleanup: BTreeSet<String>,
    pub internal: BTreeSet<String>,
}
