//! mbt-conform: conformance testing of implementations against executable
//! model programs.
//!
//! A model program (an abstract state machine) defines which sequences of
//! actions are legal. A [`Tester`] drives the model and a real
//! implementation under test side by side and reports a failing verdict as
//! soon as the implementation's observable behavior leaves what the model
//! permits.
//!
//! The pieces:
//!
//! 1. [`ModelProgram`]: the model, as a small capability trait.
//! 2. [`Implementation`]: the system under test. Tester actions are
//!    forwarded to it under a per-action deadline; asynchronous
//!    implementations report observable actions through an [`Observer`].
//! 3. [`Strategy`]: owns the model state and chooses the tester's next move
//!    ([`RandomStrategy`], [`CoverageStrategy`], or [`ReplayStrategy`] for
//!    fixed test suites).
//! 4. [`Tester`]: the run loop, producing one [`TestResult`] per test case.
//!
//! # Quick Start
//!
//! ```ignore
//! use mbt_conform::*;
//! use std::sync::Arc;
//!
//! let config = TesterConfig::builder()
//!     .steps_cnt(20usize)
//!     .max_steps_cnt(40usize)
//!     .runs_cnt(10usize)
//!     .observable(symbols(["Receive"]))
//!     .seed(7u64)
//!     .build()?;
//!
//! let strategy = CoverageStrategy::new(ChatModel::default(), RewardPolicy::Maximum, config.rng());
//! let mut tester = Tester::new(strategy, Arc::new(ChatServer::default()), config)?
//!     .with_timeout_fn(|_state, _action| std::time::Duration::from_millis(200));
//!
//! let summary = tester.run()?;
//! assert!(summary.all_passed());
//! ```

mod builder;

pub mod action;
pub mod config;
pub mod error;
pub mod implementation;
pub mod invoke;
pub mod model;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod queue;
pub mod result;
pub mod strategy;
pub mod tester;

// Re-export core types for convenience
pub use action::{Action, Value};
pub use config::{symbols, SymbolPartition, TesterConfig, TesterConfigBuilder};
pub use error::{ConfigError, ConformResult, Error, ImplementationError};
#[cfg(feature = "replay")]
pub use error::SuiteError;
pub use implementation::Implementation;
pub use invoke::{BoundedInvoker, CancelToken, Invocation};
pub use model::{CoveragePoint, ModelProgram};
#[cfg(feature = "parallel")]
pub use parallel::run_parallel;
pub use queue::{ObservationQueue, Observer, TimedQueue};
pub use result::{FailureKind, RunSummary, TestResult, Verdict};
pub use strategy::{CoverageStrategy, RandomStrategy, RewardPolicy, Strategy};
#[cfg(feature = "replay")]
pub use strategy::{ReplayCursor, ReplayStrategy, TestSuite};
pub use tester::{log_result, Tester, TimeoutFn};
