//! Example: coverage-guided conformance testing of an asynchronous chat server.
//!
//! Clients send messages through the server; the server delivers each one
//! later on its own thread and reports the delivery as an observable
//! `Receive` action. The model allows at most two messages in flight and
//! any in-flight message may be delivered next.
//!
//! Run with: cargo run --example chat_session

use mbt_conform::*;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CLIENTS: [&str; 2] = ["alice", "bob"];
const TEXTS: [&str; 2] = ["hi", "bye"];
const MAX_IN_FLIGHT: usize = 2;

type Message = (String, String, String);

fn message(action: &Action) -> Message {
    let part = |i| {
        action
            .arg(i)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (part(0), part(1), part(2))
}

#[derive(Debug, Clone, Default)]
struct ChatState {
    in_flight: Vec<Message>,
}

struct ChatModel;

impl ModelProgram for ChatModel {
    type State = ChatState;

    fn action_symbols(&self) -> BTreeSet<String> {
        symbols(["Send", "Receive", "Wait", "Timeout"])
    }

    fn initial_state(&self) -> ChatState {
        ChatState::default()
    }

    fn is_enabled(&self, state: &ChatState, action: &Action) -> bool {
        self.unsatisfied_preconditions(state, action).is_empty()
    }

    fn unsatisfied_preconditions(&self, state: &ChatState, action: &Action) -> Vec<String> {
        let mut violated = Vec::new();
        match action.name() {
            "Send" => {
                let (from, _, to) = message(action);
                if from == to {
                    violated.push("sender and recipient must differ".to_string());
                }
                if state.in_flight.len() >= MAX_IN_FLIGHT {
                    violated.push(format!("at most {MAX_IN_FLIGHT} messages in flight"));
                }
            }
            "Receive" => {
                let (from, text, to) = message(action);
                if !state.in_flight.contains(&message(action)) {
                    violated.push(format!("{text:?} from {from} to {to} must be in flight"));
                }
            }
            "Wait" if state.in_flight.is_empty() => {
                violated.push("a message must be in flight".to_string());
            }
            "Timeout" if !state.in_flight.is_empty() => {
                violated.push("in-flight messages must be delivered".to_string());
            }
            _ => {}
        }
        violated
    }

    fn target_state(&self, state: &ChatState, action: &Action) -> ChatState {
        let mut next = state.clone();
        match action.name() {
            "Send" => next.in_flight.push(message(action)),
            "Receive" => {
                let delivered = message(action);
                if let Some(i) = next.in_flight.iter().position(|m| *m == delivered) {
                    next.in_flight.remove(i);
                }
            }
            _ => {}
        }
        next
    }

    fn is_accepting(&self, state: &ChatState) -> bool {
        state.in_flight.is_empty()
    }

    fn enabled_actions(&self, state: &ChatState, symbol: &str) -> Vec<Action> {
        match symbol {
            "Send" if state.in_flight.len() < MAX_IN_FLIGHT => {
                let mut sends = Vec::new();
                for from in CLIENTS {
                    for to in CLIENTS.iter().filter(|to| **to != from) {
                        for text in TEXTS {
                            sends.push(action!("Send", from, text, *to));
                        }
                    }
                }
                sends
            }
            "Wait" if !state.in_flight.is_empty() => vec![action!("Wait", 50)],
            _ => vec![],
        }
    }
}

/// In-process chat server that delivers messages after a short delay.
#[derive(Default)]
struct ChatServer {
    observer: Mutex<Option<Observer>>,
    sent: Mutex<usize>,
}

impl Implementation for ChatServer {
    fn do_action(
        &self,
        action: &Action,
        _cancel: &CancelToken,
    ) -> Result<Option<Action>, ImplementationError> {
        switch!(action {
            "Send" => {
                let (from, text, to) = message(action);
                let observer = self
                    .observer
                    .lock()
                    .clone()
                    .ok_or_else(|| ImplementationError::failed("Send", "server not connected"))?;
                *self.sent.lock() += 1;
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5));
                    observer.observe(action!("Receive", from, text, to));
                });
                Ok(None)
            },
        })
    }

    fn reset(&self) -> Result<(), ImplementationError> {
        Ok(())
    }

    fn supports_observation(&self) -> bool {
        true
    }

    fn set_observer(&self, observer: Observer) {
        *self.observer.lock() = Some(observer);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TesterConfig::builder()
        .steps_cnt(12usize)
        .max_steps_cnt(24usize)
        .runs_cnt(20usize)
        .observable(symbols(["Receive", "Timeout"]))
        .seed(42u64)
        .build()?;

    let strategy = CoverageStrategy::new(ChatModel, RewardPolicy::Probabilistic, config.rng());
    let server = Arc::new(ChatServer::default());
    let mut tester = Tester::new(strategy, server.clone(), config)?
        .with_timeout_fn(|_state, _action| Duration::from_millis(200));

    println!("Running {} conformance test cases...", tester.config().runs_cnt);
    let summary = tester.run_with(|result| {
        println!("{result}");
        true
    })?;

    println!(
        "{} passed, {} failed, {} distinct transitions covered, {} messages sent",
        summary.successes,
        summary.failures,
        tester.strategy().distinct_points(),
        *server.sent.lock()
    );

    if summary.all_passed() {
        println!("All runs completed successfully!");
        Ok(())
    } else {
        Err(format!("failing runs: {:?}", summary.failed_runs).into())
    }
}
