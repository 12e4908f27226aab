//! Action-selection strategies.
//!
//! A [`Strategy`] owns the current model state and decides which action the
//! tester plays next. The driver validates every action through it before
//! the action enters the trace.
//!
//! - [`RandomStrategy`]: uniform choice among enabled actions
//! - [`CoverageStrategy`]: choice biased toward unseen coverage points
//! - [`ReplayStrategy`]: plays a fixed, prerecorded test suite

pub mod coverage;
pub mod random;
#[cfg(feature = "replay")]
pub mod replay;

pub use coverage::{CoverageStrategy, RewardPolicy};
pub use random::RandomStrategy;
#[cfg(feature = "replay")]
pub use replay::{ReplayCursor, ReplayStrategy, TestSuite};

use crate::action::Action;
use crate::model::ModelProgram;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Holds the current model state and selects and validates actions.
pub trait Strategy {
    /// Snapshot type exposed to per-action timeout functions.
    type State: Debug;

    /// The full tester and observable vocabulary.
    fn action_symbols(&self) -> &BTreeSet<String>;

    fn current_state(&self) -> &Self::State;

    /// Enabled actions whose symbol is in `symbols`.
    fn enabled_actions(&self, symbols: &BTreeSet<String>) -> Vec<Action>;

    /// `Ok` if `action` is enabled now, otherwise a diagnostic naming every
    /// violated enabling condition.
    fn is_enabled(&self, action: &Action) -> Result<(), String>;

    /// Apply an enabled action, replacing the current state.
    fn do_action(&mut self, action: &Action);

    /// Choose an enabled action whose symbol is in `symbols`.
    fn select_action(&mut self, symbols: &BTreeSet<String>) -> Option<Action>;

    fn is_accepting(&self) -> bool;

    /// Return to the initial model state.
    fn reset(&mut self);
}

/// A model program together with its current state.
pub(crate) struct ModelCursor<M: ModelProgram> {
    model: M,
    symbols: BTreeSet<String>,
    state: M::State,
}

impl<M: ModelProgram> ModelCursor<M> {
    pub(crate) fn new(model: M) -> Self {
        let symbols = model.action_symbols();
        let state = model.initial_state();
        Self {
            model,
            symbols,
            state,
        }
    }

    pub(crate) fn model(&self) -> &M {
        &self.model
    }

    pub(crate) fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    pub(crate) fn state(&self) -> &M::State {
        &self.state
    }

    pub(crate) fn enabled_actions(&self, symbols: &BTreeSet<String>) -> Vec<Action> {
        symbols
            .intersection(&self.symbols)
            .flat_map(|symbol| self.model.enabled_actions(&self.state, symbol))
            .collect()
    }

    pub(crate) fn check_enabled(&self, action: &Action) -> Result<(), String> {
        if !self.symbols.contains(action.name()) {
            return Err(format!(
                "Action symbol '{}' is not in the model's vocabulary",
                action.name()
            ));
        }

        if self.model.is_enabled(&self.state, action) {
            return Ok(());
        }

        let violated = self.model.unsatisfied_preconditions(&self.state, action);
        if violated.is_empty() {
            Err(format!("Action {action} is not enabled"))
        } else {
            Err(format!(
                "Action {action} is not enabled: {}",
                violated.join("; ")
            ))
        }
    }

    pub(crate) fn advance(&mut self, action: &Action) {
        debug_assert!(
            self.check_enabled(action).is_ok(),
            "do_action called with disabled action {action}"
        );
        self.state = self.model.target_state(&self.state, action);
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.model.is_accepting(&self.state)
    }

    pub(crate) fn reset(&mut self) {
        self.state = self.model.initial_state();
    }
}
