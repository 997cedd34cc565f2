//! The optional JSON client configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use steemrpc_core::FailoverConfig;
use steemrpc_http::HttpConnectionConfig;

use crate::logging::LogConfig;

/// Everything needed to build a client. Every section is optional.
///
/// ```json
/// {
///   "nodes": ["https://api.steemit.com"],
///   "http": { "request_timeout_ms": 10000, "retry": { "status": 5 } },
///   "failover": { "max_pool_rebinds": 3 },
///   "log": { "level": "info", "json": true }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub nodes: Vec<String>,
    pub http: HttpConnectionConfig,
    pub failover: FailoverConfig,
    pub log: LogConfig,
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Nodes given on the command line replace the configured ones.
    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        if !nodes.is_empty() {
            self.nodes = nodes;
        }
        self
    }
}
