//! Failover state machine for a single logical call.
//!
//! State transitions:
//! - `Attempting` → `Succeeded`:  a well-formed HTTP response arrived
//! - `Attempting` → `Attempting`: pool closed, rebind the same node (free)
//! - `Attempting` → `FailedOver`: retries exhausted, budget left, next node
//! - `Attempting` → `Exhausted`:  retries exhausted, budget spent
//! - `FailedOver` → `Attempting`: the next attempt starts

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Failover tuning shared by all calls of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Consecutive pool-closed rebinds tolerated on one node before the node
    /// is treated as exhausted.
    pub max_pool_rebinds: u32,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_pool_rebinds: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverState {
    Attempting,
    Succeeded,
    FailedOver,
    Exhausted,
}

impl std::fmt::Display for FailoverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attempting => write!(f, "attempting"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedOver => write!(f, "failed-over"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// What the client must do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverAction {
    /// Rebind the current node and try again.
    RebindSame,
    /// Advance to the next node, bind it and try again.
    FailOver,
    /// Stop; the call yields an empty outcome.
    GiveUp,
}

/// Per-call failover bookkeeping.
#[derive(Debug, Clone)]
pub struct FailoverController {
    state: FailoverState,
    failovers_used: usize,
    failover_limit: usize,
    pool_rebinds: u32,
    max_pool_rebinds: u32,
}

impl FailoverController {
    /// `failover_limit` is the node count, or 0 when failover is disabled.
    pub fn new(failover_limit: usize, config: &FailoverConfig) -> Self {
        Self {
            state: FailoverState::Attempting,
            failovers_used: 0,
            failover_limit,
            pool_rebinds: 0,
            max_pool_rebinds: config.max_pool_rebinds,
        }
    }

    pub fn state(&self) -> FailoverState {
        self.state
    }

    pub fn failovers_used(&self) -> usize {
        self.failovers_used
    }

    pub fn failover_limit(&self) -> usize {
        self.failover_limit
    }

    /// Mark the start of the next attempt.
    pub fn begin_attempt(&mut self) {
        if self.state == FailoverState::FailedOver {
            self.state = FailoverState::Attempting;
        }
    }

    /// A well-formed response arrived.
    pub fn on_response(&mut self) {
        self.state = FailoverState::Succeeded;
    }

    /// Decide how to react to a failed attempt.
    pub fn on_failure(&mut self, error: &TransportError) -> FailoverAction {
        if error.is_pool_closed() && self.pool_rebinds < self.max_pool_rebinds {
            self.pool_rebinds += 1;
            self.state = FailoverState::Attempting;
            return FailoverAction::RebindSame;
        }
        self.pool_rebinds = 0;
        if self.failovers_used < self.failover_limit {
            self.failovers_used += 1;
            self.state = FailoverState::FailedOver;
            FailoverAction::FailOver
        } else {
            self.state = FailoverState::Exhausted;
            FailoverAction::GiveUp
        }
    }
}
