//! Capability interface of an executable model program.
//!
//! The model defines legal behavior as an abstract state machine. The
//! engine never inspects model states; it only asks the model to enumerate,
//! check and apply actions through this trait.

use crate::action::{Action, Value};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Abstract marker produced by a transition, used to bias selection toward
/// novel behavior.
pub type CoveragePoint = Value;

/// An executable model program.
///
/// States are values: [`ModelProgram::target_state`] returns a new state and
/// never mutates its input.
///
/// # Example
///
/// ```
/// use mbt_conform::{action, Action, ModelProgram};
/// use std::collections::BTreeSet;
///
/// struct Counter;
///
/// impl ModelProgram for Counter {
///     type State = i64;
///
///     fn action_symbols(&self) -> BTreeSet<String> {
///         ["Inc".to_string()].into()
///     }
///     fn initial_state(&self) -> i64 {
///         0
///     }
///     fn is_enabled(&self, state: &i64, action: &Action) -> bool {
///         action.name() == "Inc" && *state < 3
///     }
///     fn unsatisfied_preconditions(&self, state: &i64, _action: &Action) -> Vec<String> {
///         vec![format!("counter {state} must be below 3")]
///     }
///     fn target_state(&self, state: &i64, _action: &Action) -> i64 {
///         state + 1
///     }
///     fn is_accepting(&self, state: &i64) -> bool {
///         *state == 3
///     }
///     fn enabled_actions(&self, state: &i64, symbol: &str) -> Vec<Action> {
///         if symbol == "Inc" && *state < 3 { vec![action!("Inc")] } else { vec![] }
///     }
/// }
/// ```
pub trait ModelProgram {
    type State: Debug;

    /// Every action symbol the model knows, tester and observable alike.
    fn action_symbols(&self) -> BTreeSet<String>;

    fn initial_state(&self) -> Self::State;

    /// Whether `action` is enabled in `state`.
    fn is_enabled(&self, state: &Self::State, action: &Action) -> bool;

    /// Human-readable descriptions of every enabling condition `action`
    /// violates in `state`. Only consulted after `is_enabled` returned false.
    fn unsatisfied_preconditions(&self, state: &Self::State, action: &Action) -> Vec<String>;

    /// The successor of `state` under `action`, which must be enabled.
    fn target_state(&self, state: &Self::State, action: &Action) -> Self::State;

    fn is_accepting(&self, state: &Self::State) -> bool;

    /// Every enabled action in `state` whose symbol is `symbol`.
    fn enabled_actions(&self, state: &Self::State, symbol: &str) -> Vec<Action>;

    /// Coverage points produced by taking `action` in `state`, with
    /// multiplicity. Defaults to the action itself.
    fn coverage_points(&self, _state: &Self::State, action: &Action) -> Vec<CoveragePoint> {
        vec![Value::from(action.clone())]
    }
}
