//! `RpcClient` — one logical connection that survives node failures.

use crate::connection::NodeConnection;
use crate::error::ClientError;
use crate::failover::{FailoverAction, FailoverConfig, FailoverController};
use crate::request::RpcCall;
use crate::response::{decode_response, RpcOutcome};
use crate::rotator::{NodeEndpoint, NodeRotator};

/// Running counters for a client instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub calls: u64,
    /// Rebinds to a different node.
    pub failovers: u64,
    /// Rebinds to the same node after the pool was found closed.
    pub pool_rebinds: u64,
    /// Calls that gave up with every allowed node exhausted.
    pub exhausted: u64,
    pub remote_errors: u64,
}

/// JSON-RPC client bound to one node at a time, rotating on failure.
///
/// Calls are serialised by `&mut self`; share a client across tasks only
/// behind an external lock.
pub struct RpcClient<C: NodeConnection> {
    rotator: NodeRotator,
    connection: C,
    failover: FailoverConfig,
    stats: ClientStats,
}

impl<C: NodeConnection> RpcClient<C> {
    /// Bind `connection` to the first node of `rotator`.
    pub fn new(rotator: NodeRotator, connection: C) -> Result<Self, ClientError> {
        Self::with_failover(rotator, connection, FailoverConfig::default())
    }

    pub fn with_failover(
        rotator: NodeRotator,
        mut connection: C,
        failover: FailoverConfig,
    ) -> Result<Self, ClientError> {
        connection.bind(rotator.current())?;
        Ok(Self {
            rotator,
            connection,
            failover,
            stats: ClientStats::default(),
        })
    }

    pub fn current_node(&self) -> &NodeEndpoint {
        self.rotator.current()
    }

    pub fn nodes(&self) -> &[NodeEndpoint] {
        self.rotator.nodes()
    }

    pub fn failover_limit(&self) -> usize {
        self.rotator.failover_limit()
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Rebind to the current node.
    pub fn reconnect(&mut self) -> Result<(), ClientError> {
        self.connection.bind(self.rotator.current())
    }

    /// Advance to the next node and bind it.
    pub fn next_node(&mut self) -> Result<&NodeEndpoint, ClientError> {
        let node = self.rotator.advance().clone();
        self.connection.bind(&node)?;
        Ok(self.rotator.current())
    }

    /// Perform one logical call.
    ///
    /// Transport failures never surface here: they are retried, failed over
    /// and finally reported as [`RpcOutcome::Empty`].
    pub async fn call(&mut self, call: RpcCall) -> RpcOutcome {
        self.stats.calls += 1;
        let body = match call.to_request().to_bytes() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(procedure = call.procedure(), error = %e, "failed to encode request");
                return RpcOutcome::Empty;
            }
        };

        let limit = if call.failover_enabled() {
            self.rotator.failover_limit()
        } else {
            0
        };
        let mut controller = FailoverController::new(limit, &self.failover);

        let response = loop {
            controller.begin_attempt();
            let error = match self.connection.send(body.clone()).await {
                Ok(resp) => {
                    controller.on_response();
                    break resp;
                }
                Err(e) => e,
            };

            match controller.on_failure(&error) {
                FailoverAction::RebindSame => {
                    tracing::warn!(
                        node = %self.rotator.current(),
                        "connection pool is closed, reconnecting"
                    );
                    self.stats.pool_rebinds += 1;
                    self.rebind_logged();
                }
                FailoverAction::FailOver => {
                    tracing::warn!(
                        node = %self.rotator.current(),
                        error = %error,
                        failover = controller.failovers_used(),
                        limit = controller.failover_limit(),
                        "failing over to next node"
                    );
                    self.stats.failovers += 1;
                    self.rotator.advance();
                    self.rebind_logged();
                }
                FailoverAction::GiveUp => {
                    tracing::error!(
                        procedure = call.procedure(),
                        node = %self.rotator.current(),
                        error = %error,
                        failovers = controller.failovers_used(),
                        "giving up on call"
                    );
                    self.stats.exhausted += 1;
                    return RpcOutcome::Empty;
                }
            }
        };

        let outcome = decode_response(&response.body);
        if outcome.remote_error().is_some() {
            self.stats.remote_errors += 1;
        }
        outcome
    }

    /// Bind the rotator's current node. A failed bind leaves the connection
    /// unbound, so the next send reports a closed pool.
    fn rebind_logged(&mut self) {
        if let Err(e) = self.connection.bind(self.rotator.current()) {
            tracing::error!(node = %self.rotator.current(), error = %e, "failed to bind node");
        }
    }
}

impl<C: NodeConnection> Drop for RpcClient<C> {
    fn drop(&mut self) {
        self.connection.release();
    }
}
