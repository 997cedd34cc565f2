//! The `NodeConnection` trait — one pooled transport handle bound to one node.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ClientError, TransportError};
use crate::rotator::NodeEndpoint;

/// A raw HTTP response that made it through the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Owner of the single live transport handle of a client.
///
/// Implementations hold at most one handle at a time. `bind` must release the
/// previous handle before creating the new one, and `release` must be safe to
/// call any number of times.
///
/// Methods take `&mut self`: a connection serves one request at a time and
/// needs no internal locking.
#[async_trait]
pub trait NodeConnection: Send {
    /// Drop the current handle (if any) and create a fresh one for `node`.
    fn bind(&mut self, node: &NodeEndpoint) -> Result<(), ClientError>;

    /// Drop the current handle. Idempotent.
    fn release(&mut self);

    /// The node the live handle points at, if one is bound.
    fn bound_node(&self) -> Option<&NodeEndpoint>;

    /// POST `body` to the bound node's root path.
    async fn send(&mut self, body: Bytes) -> Result<RawResponse, TransportError>;
}
