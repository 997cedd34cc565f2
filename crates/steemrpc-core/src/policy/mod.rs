//! Policy engine — the retry rules applied beneath failover.
//!
//! ```text
//! RpcClient → [FailoverController] → NodeConnection → [RetryPolicy] → node
//! ```

pub mod retry;

pub use retry::{RetryAttempts, RetryCause, RetryPolicy, DEFAULT_STATUS_FORCELIST};
