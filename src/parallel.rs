//! Independent conformance sessions on the rayon thread pool.
//!
//! Each session owns its own tester, strategy, selection RNG and
//! implementation instance, so sessions share no mutable state.

use crate::error::Error;
use crate::implementation::Implementation;
use crate::result::RunSummary;
use crate::strategy::Strategy;
use crate::tester::Tester;
use rayon::prelude::*;
use tracing::info;

/// Build `sessions` testers with `factory` (given the session index) and
/// run them concurrently.
///
/// Returns one summary per session, in session order, or the first error.
/// Give each session its own seed (for example `base_seed + index`) to keep
/// runs reproducible.
pub fn run_parallel<S, I, F>(sessions: usize, factory: F) -> Result<Vec<RunSummary>, Error>
where
    S: Strategy,
    I: Implementation,
    F: Fn(usize) -> Result<Tester<S, I>, Error> + Sync,
{
    info!(sessions, "Starting parallel conformance sessions");

    let summaries = (0..sessions)
        .into_par_iter()
        .map(|session| {
            let mut tester = factory(session)?;
            tester.run()
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let failures: usize = summaries.iter().map(|s| s.failures).sum();
    info!(sessions, failures, "Parallel conformance sessions finished");
    Ok(summaries)
}
