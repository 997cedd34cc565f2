//! steemrpc-core — node rotation, retry policy and failover for steemrpc.
//!
//! # Overview
//!
//! ```text
//! RpcClient::call
//!   ├── RpcCall → RpcRequest        (direct / namespaced envelope)
//!   ├── FailoverController          (pool-closed rebind, node failover)
//!   │     └── NodeRotator           (fixed cyclic node list)
//!   ├── NodeConnection::send        (one pooled handle, RetryPolicy beneath)
//!   └── decode_response → RpcOutcome
//! ```
//!
//! The HTTP implementation of [`NodeConnection`] lives in `steemrpc-http`.

pub mod client;
pub mod connection;
pub mod error;
pub mod failover;
pub mod policy;
pub mod request;
pub mod response;
pub mod rotator;

pub use client::{ClientStats, RpcClient};
pub use connection::{NodeConnection, RawResponse};
pub use error::{ClientError, TransportError};
pub use failover::{FailoverAction, FailoverConfig, FailoverController, FailoverState};
pub use policy::{RetryCause, RetryPolicy};
pub use request::{build_request, stringify, RpcCall, RpcRequest};
pub use response::{decode_response, RemoteError, RpcOutcome};
pub use rotator::{NodeEndpoint, NodeRotator};
