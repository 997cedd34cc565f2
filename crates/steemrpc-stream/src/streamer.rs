//! The block streamer: follows the chain tip and yields every block once.
//!
//! Each polling iteration:
//!   - reads the tip (head or last irreversible block)
//!   - counts polls without progress, giving up on a hung node
//!   - clamps the catch-up window when `max_blocks_catchup` is set
//!   - fetches and yields `(previous, tip]` in ascending order
//!   - sleeps for what remains of the block interval

use std::time::Duration;

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::block::Block;
use crate::cursor::StreamCursor;
use crate::error::StreamError;
use crate::source::BlockSource;

/// Configuration for a [`BlockStreamer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Follow the last irreversible block instead of the head block.
    pub irreversible: bool,
    /// Polling interval override. Defaults to the source's block interval.
    pub interval_ms: Option<u64>,
    /// Skip ahead so that at most this many blocks are behind the tip.
    pub max_blocks_catchup: Option<u64>,
    /// Polls without progress tolerated before failing with `HungNode`.
    pub hung_node_threshold: u32,
    /// First block to yield. Defaults to the block after the tip at start.
    pub start_block: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            irreversible: true,
            interval_ms: None,
            max_blocks_catchup: None,
            hung_node_threshold: 9,
            start_block: None,
        }
    }
}

impl StreamConfig {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_ms.map(Duration::from_millis)
    }
}

/// Lazy, infinite block stream over a [`BlockSource`].
///
/// Not restartable: after an error it yields nothing more.
pub struct BlockStreamer<S: BlockSource> {
    source: S,
    config: StreamConfig,
    cursor: StreamCursor,
    started: bool,
    finished: bool,
    /// Last block of the window being yielded.
    window_end: Option<u64>,
    /// Start of the current polling iteration.
    iteration_start: Option<Instant>,
}

impl<S: BlockSource> BlockStreamer<S> {
    pub fn new(source: S, config: StreamConfig) -> Self {
        let interval = config.interval().unwrap_or_else(|| source.block_interval());
        Self {
            source,
            config,
            cursor: StreamCursor::new(0, interval),
            started: false,
            finished: false,
            window_end: None,
            iteration_start: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Position of the stream. Meaningful once the first block was requested.
    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Wait for and return the next block. `None` once the stream has failed.
    pub async fn next_block(&mut self) -> Option<Result<Block, StreamError>> {
        if self.finished {
            return None;
        }
        match self.advance().await {
            Ok(block) => Some(Ok(block)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Block, StreamError>> {
        stream::unfold(self, |mut streamer| async move {
            let item = streamer.next_block().await?;
            Some((item, streamer))
        })
    }

    async fn advance(&mut self) -> Result<Block, StreamError> {
        if !self.started {
            self.start().await?;
            self.started = true;
        }
        loop {
            if let Some(block) = self.next_in_window().await? {
                return Ok(block);
            }
            self.pace().await;
            self.poll_tip().await?;
        }
    }

    /// Position the cursor before the first block to yield.
    async fn start(&mut self) -> Result<(), StreamError> {
        if let Some(start) = self.config.start_block {
            self.cursor = StreamCursor::new(start.saturating_sub(1), self.cursor.interval);
            tracing::info!(start_block = start, "starting block stream");
            return Ok(());
        }

        // The cursor starts at zero; an unreadable tip counts as a hung poll.
        loop {
            let tip = self.source.chain_tip(self.config.irreversible).await;
            if let Some(tip) = self.cursor.observe_tip(tip) {
                self.cursor.previous_block_number = tip;
                tracing::info!(tip, irreversible = self.config.irreversible, "starting block stream at tip");
                return Ok(());
            }
            self.check_hung()?;
            tokio::time::sleep(self.cursor.sleep_time(Duration::ZERO)).await;
        }
    }

    /// One tip reading. Opens a new window if the tip is ahead of the cursor.
    async fn poll_tip(&mut self) -> Result<(), StreamError> {
        self.iteration_start = Some(Instant::now());
        let tip = self.source.chain_tip(self.config.irreversible).await;
        let window = self.cursor.observe_tip(tip);

        if self.cursor.same_block_count > 0 {
            tracing::debug!(
                tip = ?tip,
                previous = self.cursor.previous_block_number,
                polls = self.cursor.same_block_count,
                "chain tip did not advance"
            );
            self.check_hung()?;
        }
        let Some(tip) = window else {
            return Ok(());
        };

        if let Some(max) = self.config.max_blocks_catchup {
            let before = self.cursor.previous_block_number;
            self.cursor.clamp_catchup(tip, max);
            if self.cursor.previous_block_number > before {
                tracing::warn!(
                    skipped = self.cursor.previous_block_number - before,
                    tip,
                    "stream fell behind, skipping blocks"
                );
            }
        }
        self.window_end = Some(tip);
        Ok(())
    }

    fn check_hung(&self) -> Result<(), StreamError> {
        if self.cursor.is_hung(self.config.hung_node_threshold) {
            tracing::error!(
                block = self.cursor.previous_block_number,
                polls = self.cursor.same_block_count,
                "node is hung"
            );
            return Err(StreamError::HungNode {
                block_number: self.cursor.previous_block_number,
                polls: self.cursor.same_block_count,
            });
        }
        Ok(())
    }

    /// Next block of the open window, if any. Closes the window when it is
    /// exhausted or the node cannot serve the next block.
    async fn next_in_window(&mut self) -> Result<Option<Block>, StreamError> {
        while let Some(end) = self.window_end {
            let number = self.cursor.next_block();
            if number > end {
                self.window_end = None;
                break;
            }

            let Some(block) = self.source.block(number).await? else {
                tracing::debug!(block = number, "block not available yet");
                self.window_end = None;
                break;
            };

            let height = block.number()?;
            if height != number {
                tracing::warn!(requested = number, received = height, "node returned a different block");
                self.window_end = None;
                break;
            }

            self.cursor.advance(height);
            tracing::debug!(block = height, "yielding block");
            return Ok(Some(block));
        }
        Ok(None)
    }

    /// Sleep out the rest of the current iteration.
    async fn pace(&mut self) {
        if let Some(start) = self.iteration_start.take() {
            tokio::time::sleep(self.cursor.sleep_time(start.elapsed())).await;
        }
    }
}
