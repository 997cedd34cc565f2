//! steemrpc-http — HTTPS transport for steemrpc.
//!
//! # Usage
//! ```rust,no_run
//! use steemrpc_core::RpcCall;
//! use steemrpc_http::{connect, HttpConnectionConfig};
//!
//! # async fn run() -> Result<(), steemrpc_core::ClientError> {
//! let mut client = connect(
//!     ["https://api.steemit.com", "https://api.example.com"],
//!     HttpConnectionConfig::default(),
//! )?;
//! let props = client
//!     .call(RpcCall::new("get_dynamic_global_properties").api("database_api"))
//!     .await;
//! println!("{:?}", props.get("head_block_number"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;

pub use config::HttpConnectionConfig;
pub use connection::HttpConnection;

use steemrpc_core::{ClientError, FailoverConfig, NodeRotator, RpcClient};

/// An [`RpcClient`] talking HTTPS.
pub type HttpRpcClient = RpcClient<HttpConnection>;

/// Build a client over `nodes` and bind it to the first one.
pub fn connect<I, S>(nodes: I, config: HttpConnectionConfig) -> Result<HttpRpcClient, ClientError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    connect_with_failover(nodes, config, FailoverConfig::default())
}

pub fn connect_with_failover<I, S>(
    nodes: I,
    config: HttpConnectionConfig,
    failover: FailoverConfig,
) -> Result<HttpRpcClient, ClientError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rotator = NodeRotator::from_urls(nodes)?;
    let connection = HttpConnection::new(config)?;
    RpcClient::with_failover(rotator, connection, failover)
}
