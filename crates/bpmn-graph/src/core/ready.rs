//! One-shot readiness gate
//!
//! Imports must not run before the owning collaborator reports that its
//! resources are available. The collaborator signals the gate once; waiters
//! block on a condition variable until then.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

use super::error::{ModelError, Result};

#[derive(Debug, Default)]
struct GateState {
    ready: Mutex<bool>,
    signal: Condvar,
}

/// A latch that opens once and stays open
///
/// Clones share the same state, so one handle can be given to the signaling
/// collaborator and another kept by the waiter.
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    state: Arc<GateState>,
}

impl ReadinessGate {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate that is already open
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.open();
        gate
    }

    /// Open the gate and wake every waiter
    pub fn open(&self) {
        if let Ok(mut ready) = self.state.ready.lock() {
            if !*ready {
                *ready = true;
                debug!("Readiness gate opened");
            }
        }
        self.state.signal.notify_all();
    }

    /// Whether the gate has been opened
    pub fn is_open(&self) -> bool {
        self.state.ready.lock().map(|ready| *ready).unwrap_or(false)
    }

    /// Block until the gate opens, or until `timeout` elapses
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let ready = self
            .state
            .ready
            .lock()
            .map_err(|_| ModelError::store("readiness gate lock poisoned"))?;
        if *ready {
            return Ok(());
        }
        trace!(?timeout, "Waiting for readiness gate");
        match timeout {
            None => {
                let _ready = self
                    .state
                    .signal
                    .wait_while(ready, |ready| !*ready)
                    .map_err(|_| ModelError::store("readiness gate lock poisoned"))?;
                Ok(())
            }
            Some(timeout) => {
                let (_ready, result) = self
                    .state
                    .signal
                    .wait_timeout_while(ready, timeout, |ready| !*ready)
                    .map_err(|_| ModelError::store("readiness gate lock poisoned"))?;
                if result.timed_out() {
                    Err(ModelError::Timeout {
                        what: "readiness gate".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}
