//! Error types for block fetching and streaming.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The chain tip stopped advancing. Terminal for the stream; restart it,
    /// usually against another node.
    #[error("node appears hung: no new block after block {block_number} in {polls} polls")]
    HungNode { block_number: u64, polls: u32 },

    #[error("invalid block id `{0}`")]
    InvalidBlockId(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),
}

impl StreamError {
    /// Returns `true` if the node stopped producing blocks.
    pub fn is_hung_node(&self) -> bool {
        matches!(self, Self::HungNode { .. })
    }
}
