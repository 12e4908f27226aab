//! The implementation-under-test side of a conformance run.
//!
//! # Example
//!
//! ```
//! use mbt_conform::{action, switch, Action, CancelToken, Implementation, ImplementationError};
//! use parking_lot::Mutex;
//!
//! #[derive(Default)]
//! struct Door {
//!     open: Mutex<bool>,
//! }
//!
//! impl Implementation for Door {
//!     fn do_action(
//!         &self,
//!         action: &Action,
//!         _cancel: &CancelToken,
//!     ) -> Result<Option<Action>, ImplementationError> {
//!         switch!(action {
//!             "Open" => {
//!                 *self.open.lock() = true;
//!                 Ok(None)
//!             },
//!             "Close" => {
//!                 *self.open.lock() = false;
//!                 Ok(None)
//!             },
//!         })
//!     }
//!
//!     fn reset(&self) -> Result<(), ImplementationError> {
//!         *self.open.lock() = false;
//!         Ok(())
//!     }
//! }
//!
//! let door = Door::default();
//! assert!(door.do_action(&action!("Open"), &CancelToken::new()).is_ok());
//! assert!(door.do_action(&action!("Kick"), &CancelToken::new()).is_err());
//! ```

use crate::action::Action;
use crate::error::ImplementationError;
use crate::invoke::CancelToken;
use crate::queue::Observer;

/// The real system being checked for conformance.
///
/// Calls arrive on short-lived invocation threads, and a call that missed its
/// deadline may still be running when the driver moves on (for example into
/// [`Implementation::reset`]). Implementations therefore take `&self` and
/// guard their own state.
pub trait Implementation: Send + Sync + 'static {
    /// Perform a tester action.
    ///
    /// May return a follow-up action that the implementation produced in
    /// direct response (the finish half of a split action); the driver
    /// validates it against the model before selecting anything else.
    /// Long-running calls should poll `cancel` and give up once it is set.
    fn do_action(
        &self,
        action: &Action,
        cancel: &CancelToken,
    ) -> Result<Option<Action>, ImplementationError>;

    /// Return to the initial condition before the next test case.
    fn reset(&self) -> Result<(), ImplementationError>;

    /// Whether the implementation reports observable actions on its own.
    fn supports_observation(&self) -> bool {
        false
    }

    /// Install the handle used to report observable actions. Called once,
    /// before the first test case, when `supports_observation` is true.
    fn set_observer(&self, _observer: Observer) {}
}

/// Dispatch an action name to the corresponding implementation code.
///
/// Each arm evaluates to `Result<Option<Action>, ImplementationError>`;
/// names without an arm yield [`ImplementationError::UnknownAction`].
///
/// The first argument must be an identifier bound to a `&Action`.
///
/// ```ignore
/// mbt_conform::switch!(action {
///     "Create" => { self.create(action)?; Ok(None) },
///     "Send" => Ok(Some(self.send(action)?)),
/// })
/// ```
#[macro_export]
macro_rules! switch {
    ($action:ident { $($tt:tt)+ }) => {{
        let __mbt_action: &$crate::Action = $action;
        $crate::__switch_arms!(__mbt_action; $($tt)+)
    }};
}

/// Internal TT muncher for switch arms. Not part of public API.
#[macro_export]
#[doc(hidden)]
macro_rules! __switch_arms {
    ($action:ident; $name:literal => $body:expr $(,)?) => {
        match $action.name() {
            $name => $body,
            other => ::std::result::Result::Err(
                $crate::ImplementationError::UnknownAction(other.to_string()),
            ),
        }
    };
    ($action:ident; $name:literal => $body:expr, $($rest:tt)+) => {
        match $action.name() {
            $name => $body,
            _ => $crate::__switch_arms!($action; $($rest)+),
        }
    };
}
