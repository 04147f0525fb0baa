//! Shared mock infrastructure for unit tests.
//!
//! Hand-written port doubles with `Mutex`/`RefCell` call logs so each test
//! file doesn't have to re-define the same boilerplate.

#![allow(clippy::expect_used, dead_code)]

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use consul_up_cli::application::ports::{
    CommandOperator, OperatorConnector, ProgressReporter, VersionResolver,
};
use consul_up_cli::domain::error::OperatorError;
use consul_up_cli::domain::target::Target;

// ── Operator ─────────────────────────────────────────────────────────────────

/// Everything a [`MockOperator`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(String),
    Upload { destination: String, mode: u32 },
    Close,
}

/// Records calls; fails the command whose text contains `fail_command`.
#[derive(Clone, Default)]
pub struct MockOperator {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_command: Option<&'static str>,
}

impl MockOperator {
    /// An operator whose command containing `needle` exits non-zero.
    pub fn failing(needle: &'static str) -> Self {
        Self {
            fail_command: Some(needle),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Execute(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { destination, .. } => Some(destination),
                _ => None,
            })
            .collect()
    }
}

impl CommandOperator for MockOperator {
    async fn execute(&self, command: &str) -> Result<String> {
        self.calls.lock().expect("lock").push(Call::Execute(command.to_string()));
        if let Some(needle) = self.fail_command
            && command.contains(needle)
        {
            return Err(OperatorError::Command {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                output: "routine exploded".to_string(),
            }
            .into());
        }
        Ok(String::new())
    }

    async fn upload(&self, _content: &[u8], destination: &str, mode: u32) -> Result<()> {
        self.calls.lock().expect("lock").push(Call::Upload {
            destination: destination.to_string(),
            mode,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.calls.lock().expect("lock").push(Call::Close);
        Ok(())
    }
}

/// Hands out clones of one [`MockOperator`] and counts connections.
#[derive(Default)]
pub struct MockConnector {
    pub operator: MockOperator,
    pub connects: Mutex<usize>,
}

impl MockConnector {
    pub fn with_operator(operator: MockOperator) -> Self {
        Self {
            operator,
            connects: Mutex::new(0),
        }
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().expect("lock")
    }
}

impl OperatorConnector for MockConnector {
    type Operator = MockOperator;

    async fn connect(&self, _target: &Target) -> Result<MockOperator> {
        *self.connects.lock().expect("lock") += 1;
        Ok(self.operator.clone())
    }
}

// ── Versions ─────────────────────────────────────────────────────────────────

/// Returns a fixed version, or fails when `None`.
pub struct FixedVersion(pub Option<&'static str>);

impl VersionResolver for FixedVersion {
    fn latest_version(&self, product: &str) -> Result<String> {
        match self.0 {
            Some(v) => Ok(v.to_string()),
            None => anyhow::bail!("checkpoint unreachable for {product}"),
        }
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

/// Collects every message.
#[derive(Default)]
pub struct CollectingReporter {
    pub messages: RefCell<Vec<String>>,
}

impl ProgressReporter for CollectingReporter {
    fn step(&self, message: &str) {
        self.messages.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("ok: {message}"));
    }

    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(format!("warn: {message}"));
    }
}
