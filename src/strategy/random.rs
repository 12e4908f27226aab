//! Uniform random selection.

use super::{ModelCursor, Strategy};
use crate::action::Action;
use crate::model::ModelProgram;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;

/// Picks uniformly among the enabled actions of the requested symbols.
pub struct RandomStrategy<M: ModelProgram> {
    cursor: ModelCursor<M>,
    rng: StdRng,
}

impl<M: ModelProgram> RandomStrategy<M> {
    /// Create a strategy drawing from `rng` (see [`TesterConfig::rng`](crate::TesterConfig::rng)).
    pub fn new(model: M, rng: StdRng) -> Self {
        Self {
            cursor: ModelCursor::new(model),
            rng,
        }
    }

    pub fn with_seed(model: M, seed: u64) -> Self {
        Self::new(model, StdRng::seed_from_u64(seed))
    }

    pub fn model(&self) -> &M {
        self.cursor.model()
    }
}

impl<M: ModelProgram> Strategy for RandomStrategy<M> {
    type State = M::State;

    fn action_symbols(&self) -> &BTreeSet<String> {
        self.cursor.symbols()
    }

    fn current_state(&self) -> &M::State {
        self.cursor.state()
    }

    fn enabled_actions(&self, symbols: &BTreeSet<String>) -> Vec<Action> {
        self.cursor.enabled_actions(symbols)
    }

    fn is_enabled(&self, action: &Action) -> Result<(), String> {
        self.cursor.check_enabled(action)
    }

    fn do_action(&mut self, action: &Action) {
        self.cursor.advance(action);
    }

    fn select_action(&mut self, symbols: &BTreeSet<String>) -> Option<Action> {
        let candidates = self.cursor.enabled_actions(symbols);
        candidates.choose(&mut self.rng).cloned()
    }

    fn is_accepting(&self) -> bool {
        self.cursor.is_accepting()
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}
