//! The `BlockSource` trait: what the streamer needs from a node.

use std::time::Duration;

use async_trait::async_trait;

use crate::block::Block;
use crate::error::StreamError;

/// Read access to a chain, one call at a time.
///
/// Implemented by [`SteemdClient`](crate::steemd::SteemdClient); tests use
/// scripted in-memory sources.
#[async_trait]
pub trait BlockSource: Send {
    /// Current tip: the last irreversible block when `irreversible` is set,
    /// the head block otherwise. `None` if the node could not be read.
    async fn chain_tip(&mut self, irreversible: bool) -> Option<u64>;

    /// Fetch one block. `Ok(None)` if the node does not have it (yet).
    async fn block(&mut self, number: u64) -> Result<Option<Block>, StreamError>;

    /// Expected time between two blocks.
    fn block_interval(&self) -> Duration;
}

#[async_trait]
impl<T: BlockSource + ?Sized> BlockSource for &mut T {
    async fn chain_tip(&mut self, irreversible: bool) -> Option<u64> {
        (**self).chain_tip(irreversible).await
    }

    async fn block(&mut self, number: u64) -> Result<Option<Block>, StreamError> {
        (**self).block(number).await
    }

    fn block_interval(&self) -> Duration {
        (**self).block_interval()
    }
}
