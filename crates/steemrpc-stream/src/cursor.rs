//! Stream cursor — the only state carried between polling iterations.

use std::time::Duration;

/// Shortest pause between two polls, so a slow iteration never busy-loops.
pub const MIN_POLL_SLEEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    /// Last block handed to the consumer. Never decreases.
    pub previous_block_number: u64,
    /// Highest tip reading so far.
    pub last_tip: u64,
    /// Consecutive polls in which the tip reading did not increase.
    pub same_block_count: u32,
    /// Target duration of one polling iteration.
    pub interval: Duration,
}

impl StreamCursor {
    pub fn new(previous_block_number: u64, interval: Duration) -> Self {
        Self {
            previous_block_number,
            last_tip: previous_block_number,
            same_block_count: 0,
            interval,
        }
    }

    /// Record a tip reading and return it if there are blocks to fetch.
    ///
    /// Only a reading above every earlier one counts as progress. An equal,
    /// lower or missing reading counts a no-progress poll, even while the
    /// cursor still lags behind the tip.
    pub fn observe_tip(&mut self, tip: Option<u64>) -> Option<u64> {
        match tip {
            Some(tip) if tip > self.last_tip => {
                self.last_tip = tip;
                self.same_block_count = 0;
            }
            _ => self.same_block_count += 1,
        }
        tip.filter(|&tip| tip > self.previous_block_number)
    }

    pub fn is_hung(&self, threshold: u32) -> bool {
        self.same_block_count > threshold
    }

    /// Skip ahead so that at most `max_blocks` blocks up to `tip` remain.
    pub fn clamp_catchup(&mut self, tip: u64, max_blocks: u64) {
        self.previous_block_number = self
            .previous_block_number
            .max(tip.saturating_sub(max_blocks));
    }

    pub fn advance(&mut self, block_number: u64) {
        self.previous_block_number = self.previous_block_number.max(block_number);
    }

    pub fn next_block(&self) -> u64 {
        self.previous_block_number + 1
    }

    /// Remaining part of the interval after `elapsed`, never below
    /// [`MIN_POLL_SLEEP`].
    pub fn sleep_time(&self, elapsed: Duration) -> Duration {
        self.interval.saturating_sub(elapsed).max(MIN_POLL_SLEEP)
    }
}
