//! Coverage-reward-guided selection.
//!
//! Every transition produces a bag of coverage points. Taking an action is
//! rewarded by how new its points are relative to everything seen so far in
//! the session:
//!
//! ```text
//! reward = Σ newCount(p) / (newCount(p) + oldCount(p)²)
//! ```
//!
//! where `newCount(p)` is the multiplicity of `p` in the transition's bag and
//! `oldCount(p)` its multiplicity in the accumulated coverage. A point never
//! seen before contributes its full count; the contribution decays
//! quadratically as the point is seen more often.

use super::{ModelCursor, Strategy};
use crate::action::Action;
use crate::model::{CoveragePoint, ModelProgram};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Weight given to a reward of 1.0 by [`RewardPolicy::Probabilistic`].
const WEIGHT_SCALE: f64 = 1000.0;

/// How rewards turn into a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardPolicy {
    /// Pick uniformly among the candidates tied for the highest reward.
    #[default]
    Maximum,
    /// Pick with probability proportional to `max(1, floor(1000 × reward))`.
    Probabilistic,
}

/// Strategy that steers selection toward unseen coverage points.
///
/// Coverage accumulates across test cases: [`Strategy::reset`] restores the
/// initial model state but keeps the coverage bag.
pub struct CoverageStrategy<M: ModelProgram> {
    cursor: ModelCursor<M>,
    rng: StdRng,
    policy: RewardPolicy,
    coverage: HashMap<CoveragePoint, usize>,
}

impl<M: ModelProgram> CoverageStrategy<M> {
    pub fn new(model: M, policy: RewardPolicy, rng: StdRng) -> Self {
        Self {
            cursor: ModelCursor::new(model),
            rng,
            policy,
            coverage: HashMap::new(),
        }
    }

    pub fn with_seed(model: M, policy: RewardPolicy, seed: u64) -> Self {
        Self::new(model, policy, StdRng::seed_from_u64(seed))
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    /// How often `point` has been covered so far.
    pub fn coverage_count(&self, point: &CoveragePoint) -> usize {
        self.coverage.get(point).copied().unwrap_or(0)
    }

    /// Number of distinct coverage points seen so far.
    pub fn distinct_points(&self) -> usize {
        self.coverage.len()
    }

    /// Reward for taking `action` in the current state.
    pub fn reward(&self, action: &Action) -> f64 {
        let points = self
            .cursor
            .model()
            .coverage_points(self.cursor.state(), action);
        bag(&points)
            .into_iter()
            .map(|(point, new)| point_reward(new, self.coverage_count(point)))
            .sum()
    }

    fn select_max(&mut self, candidates: &[Action]) -> Option<Action> {
        let rewards: Vec<f64> = candidates.iter().map(|a| self.reward(a)).collect();
        let best = rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<&Action> = candidates
            .iter()
            .zip(&rewards)
            .filter(|(_, r)| **r == best)
            .map(|(a, _)| a)
            .collect();
        trace!(best, tied = tied.len(), "Maximum-reward candidates");
        tied.choose(&mut self.rng).map(|a| (*a).clone())
    }

    fn select_weighted(&mut self, candidates: &[Action]) -> Option<Action> {
        if candidates.is_empty() {
            return None;
        }
        let weights: Vec<u64> = candidates.iter().map(|a| weight(self.reward(a))).collect();
        let total: u64 = weights.iter().sum();
        let draw = self.rng.random_range(0..total);
        Some(candidates[weighted_index(&weights, draw)].clone())
    }
}

/// Reward contributed by one coverage point seen `new` times in a
/// transition and `old` times before it.
pub fn point_reward(new: usize, old: usize) -> f64 {
    let new = new as f64;
    let old = old as f64;
    new / (new + old * old)
}

/// Integer selection weight for a reward, never below 1.
pub fn weight(reward: f64) -> u64 {
    ((reward * WEIGHT_SCALE).floor() as u64).max(1)
}

/// Index of the first weight whose cumulative sum exceeds `draw`.
///
/// Clamps to the last index when `draw` is not below the total.
pub fn weighted_index(weights: &[u64], draw: u64) -> usize {
    let mut cumulative = 0u64;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if draw < cumulative {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

fn bag(points: &[CoveragePoint]) -> HashMap<&CoveragePoint, usize> {
    let mut counts = HashMap::new();
    for p in points {
        *counts.entry(p).or_insert(0) += 1;
    }
    counts
}

impl<M: ModelProgram> Strategy for CoverageStrategy<M> {
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
        let points = self
            .cursor
            .model()
            .coverage_points(self.cursor.state(), action);
        for p in points {
            *self.coverage.entry(p).or_insert(0) += 1;
        }
        self.cursor.advance(action);
    }

    fn select_action(&mut self, symbols: &BTreeSet<String>) -> Option<Action> {
        let candidates = self.cursor.enabled_actions(symbols);
        match self.policy {
            RewardPolicy::Maximum => self.select_max(&candidates),
            RewardPolicy::Probabilistic => self.select_weighted(&candidates),
        }
    }

    fn is_accepting(&self) -> bool {
        self.cursor.is_accepting()
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}
