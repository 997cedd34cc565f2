//! Transport and construction error types.

use thiserror::Error;

/// Failures a [`NodeConnection`](crate::connection::NodeConnection) can report
/// for a single `send`.
///
/// None of these ever reach the caller of [`RpcClient::call`]; they only
/// drive the failover state machine.
///
/// [`RpcClient::call`]: crate::client::RpcClient::call
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The pooled handle is gone (released, or never successfully bound).
    /// Recoverable by rebinding to the same node.
    #[error("connection pool is closed")]
    PoolClosed,

    /// The retry policy gave up on this node.
    #[error("retries exhausted for {node}: {reason}")]
    RetriesExhausted { node: String, reason: String },

    /// The total request timeout elapsed.
    #[error("request to {node} timed out after {ms}ms")]
    Timeout { node: String, ms: u64 },
}

impl TransportError {
    /// Returns `true` if the error can be recovered by rebinding the same node.
    pub fn is_pool_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }

    /// Returns `true` if the error should move the client to a different node.
    pub fn requires_failover(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::Timeout { .. })
    }
}

/// Errors raised while constructing a client or binding a node.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A client needs at least one node to talk to.
    #[error("at least one node endpoint is required")]
    NoNodes,

    /// A node URL could not be parsed.
    #[error("invalid node url `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The transport handle could not be built (TLS, headers, ...).
    #[error("failed to build transport: {0}")]
    Build(String),
}
