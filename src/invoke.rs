//! Deadline-bounded calls into the implementation under test.
//!
//! Each call runs on its own thread. The caller waits on a channel for at
//! most the deadline and then gives up on the call. An abandoned thread
//! keeps running until the implementation returns: the driver cannot
//! forcibly stop it. Its [`CancelToken`] is cancelled so cooperative
//! implementations can bail out early, and its result is discarded.
//!
//! Known risk: an implementation that ignores cancellation and never
//! returns leaks one thread per timed-out call, and any side effects it
//! produces after the deadline are unobserved by the driver.

use crate::action::Action;
use crate::error::ImplementationError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Cooperative cancellation signal handed to every bounded call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Outcome of a bounded call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a bounded call outcome should be inspected"]
pub enum Invocation<T> {
    /// The call returned within its deadline.
    Completed(T),
    /// The call raised an error (or panicked) within its deadline.
    Failed(ImplementationError),
    /// The deadline elapsed first. The call may still be running.
    TimedOut,
}

struct Abandoned {
    action: Action,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Runs calls on dedicated threads and tracks the ones it had to abandon.
#[derive(Default)]
pub struct BoundedInvoker {
    abandoned: Vec<Abandoned>,
}

impl BoundedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `call` for `action`, waiting at most `deadline` for it to finish.
    ///
    /// The calling thread never blocks longer than `deadline`. A panic inside
    /// `call` is reported as [`ImplementationError::Panicked`].
    pub fn invoke<T, F>(&mut self, action: &Action, deadline: Duration, call: F) -> Invocation<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, ImplementationError> + Send + 'static,
    {
        self.reap();

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let (tx, rx) = mpsc::sync_channel(1);

        let spawned = thread::Builder::new()
            .name(thread_name(action))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&token)))
                    .unwrap_or_else(|payload| {
                        Err(ImplementationError::Panicked(panic_message(payload.as_ref())))
                    });
                // The receiver is gone if the driver already gave up.
                let _ = tx.send(outcome);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => return Invocation::Failed(ImplementationError::Spawn(e.to_string())),
        };

        match rx.recv_timeout(deadline) {
            Ok(Ok(value)) => Invocation::Completed(value),
            Ok(Err(e)) => Invocation::Failed(e),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(
                    action = %action,
                    deadline_ms = deadline.as_millis() as u64,
                    outstanding = self.abandoned.len() + 1,
                    "Abandoning implementation call after deadline"
                );
                self.abandoned.push(Abandoned {
                    action: action.clone(),
                    cancel,
                    handle,
                });
                Invocation::TimedOut
            }
            // The worker always sends before exiting unless it was torn down
            // without unwinding.
            Err(RecvTimeoutError::Disconnected) => Invocation::Failed(
                ImplementationError::Panicked("invocation thread exited without a result".into()),
            ),
        }
    }

    /// Join abandoned calls that have since finished. Returns how many are
    /// still running.
    pub fn reap(&mut self) -> usize {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.abandoned)
            .into_iter()
            .partition(|a| a.handle.is_finished());

        for a in finished {
            debug!(action = %a.action, "Abandoned implementation call finished");
            let _ = a.handle.join();
        }

        self.abandoned = running;
        self.abandoned.len()
    }

    /// Number of abandoned calls not yet known to have finished.
    pub fn outstanding(&self) -> usize {
        self.abandoned.len()
    }

    /// Cancel every abandoned call and stop tracking them.
    ///
    /// Calls that ignore cancellation are detached and keep running.
    pub fn shutdown(&mut self) {
        for a in &self.abandoned {
            a.cancel.cancel();
        }
        let still_running = self.reap();
        if still_running > 0 {
            warn!(
                still_running,
                "Detaching implementation calls that did not stop after cancellation"
            );
            self.abandoned.clear();
        }
    }
}

impl Drop for BoundedInvoker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Thread names may not contain NUL bytes; action names may.
fn thread_name(action: &Action) -> String {
    format!("iut-{}", action.name().replace('\0', ""))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action;
    use std::time::Instant;

    #[test]
    fn action_name_with_nul_byte_is_invoked() {
        let mut invoker = BoundedInvoker::new();
        let outcome = invoker.invoke(&Action::nullary("Send\0x"), Duration::from_secs(5), |_| {
            Ok(thread::current().name().map(str::to_string))
        });
        assert_eq!(outcome, Invocation::Completed(Some("iut-Sendx".to_string())));
    }

    #[test]
    fn completed_call_returns_value() {
        let mut invoker = BoundedInvoker::new();
        let outcome = invoker.invoke(&action!("Ping"), Duration::from_secs(5), |_| Ok(42));
        assert_eq!(outcome, Invocation::Completed(42));
        assert_eq!(invoker.outstanding(), 0);
    }

    #[test]
    fn error_is_reported_verbatim() {
        let mut invoker = BoundedInvoker::new();
        let outcome: Invocation<()> = invoker.invoke(&action!("Ping"), Duration::from_secs(5), |_| {
            Err(ImplementationError::failed("Ping", "refused"))
        });
        assert_eq!(
            outcome,
            Invocation::Failed(ImplementationError::failed("Ping", "refused"))
        );
    }

    #[test]
    fn panic_becomes_implementation_error() {
        let mut invoker = BoundedInvoker::new();
        let outcome: Invocation<()> =
            invoker.invoke(&action!("Ping"), Duration::from_secs(5), |_| panic!("boom"));
        assert_eq!(
            outcome,
            Invocation::Failed(ImplementationError::Panicked("boom".into()))
        );
    }

    #[test]
    fn slow_call_times_out_without_blocking_caller() {
        let mut invoker = BoundedInvoker::new();
        let start = Instant::now();
        let outcome: Invocation<()> =
            invoker.invoke(&action!("Hang"), Duration::from_millis(50), |cancel| {
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            });
        assert_eq!(outcome, Invocation::TimedOut);
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert_eq!(invoker.outstanding(), 1);

        // The cancelled call notices the token and exits.
        let deadline = Instant::now() + Duration::from_secs(5);
        while invoker.reap() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(invoker.outstanding(), 0);
    }

    #[test]
    fn shutdown_detaches_uncooperative_calls() {
        let mut invoker = BoundedInvoker::new();
        let outcome: Invocation<()> =
            invoker.invoke(&action!("Hang"), Duration::from_millis(10), |_| {
                thread::sleep(Duration::from_secs(2));
                Ok(())
            });
        assert_eq!(outcome, Invocation::TimedOut);
        invoker.shutdown();
        assert_eq!(invoker.outstanding(), 0);
    }
}
