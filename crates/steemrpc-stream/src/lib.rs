//! steemrpc-stream — block access and tip following for steemrpc.
//!
//! # Key types
//! - [`SteemdClient`] — typed `database_api` / `follow_api` helpers over an `RpcClient`
//! - [`BlockStreamer`] — lazy, infinite stream of blocks with hung-node detection
//! - [`BlockSource`] — what the streamer reads from; implemented by `SteemdClient`
//! - [`Block`] / [`block_id_to_number`] — blocks and their heights
//!
//! # Usage
//! ```rust,no_run
//! use futures::StreamExt;
//! use steemrpc_stream::{SteemdClient, StreamConfig};
//!
//! # async fn run(rpc: steemrpc_core::RpcClient<impl steemrpc_core::NodeConnection>) {
//! let mut steemd = SteemdClient::init(rpc).await;
//! let blocks = steemd.stream_blocks(StreamConfig::default()).into_stream();
//! futures::pin_mut!(blocks);
//! while let Some(block) = blocks.next().await {
//!     match block {
//!         Ok(block) => println!("{}", block.block_id),
//!         Err(e) => {
//!             eprintln!("stream ended: {e}");
//!             break;
//!         }
//!     }
//! }
//! # }
//! ```

pub mod block;
pub mod cursor;
pub mod error;
pub mod source;
pub mod steemd;
pub mod streamer;

pub use block::{block_id_to_number, Block};
pub use cursor::{StreamCursor, MIN_POLL_SLEEP};
pub use error::StreamError;
pub use source::BlockSource;
pub use steemd::{SteemdClient, DEFAULT_BLOCK_INTERVAL};
pub use streamer::{BlockStreamer, StreamConfig};
