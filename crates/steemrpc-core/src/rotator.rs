//! Fixed, cyclic set of candidate nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;

/// A node's JSON-RPC endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeEndpoint(Url);

impl NodeEndpoint {
    /// Parse and validate a node URL.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        Url::parse(url)
            .map(Self)
            .map_err(|source| ClientError::InvalidEndpoint {
                url: url.to_string(),
                source,
            })
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host part of the URL, for log lines.
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Round-robin cursor over a fixed list of nodes.
///
/// The list never changes after construction. The cursor is a plain index, so
/// the node currently in use is always `nodes()[position()]`.
#[derive(Debug, Clone)]
pub struct NodeRotator {
    nodes: Vec<NodeEndpoint>,
    cursor: usize,
}

impl NodeRotator {
    /// Build a rotator positioned on the first node.
    pub fn new(nodes: Vec<NodeEndpoint>) -> Result<Self, ClientError> {
        if nodes.is_empty() {
            return Err(ClientError::NoNodes);
        }
        Ok(Self { nodes, cursor: 0 })
    }

    /// Parse a list of URLs and build a rotator over them.
    pub fn from_urls<I, S>(urls: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = urls
            .into_iter()
            .map(|u| NodeEndpoint::parse(u.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(nodes)
    }

    pub fn current(&self) -> &NodeEndpoint {
        &self.nodes[self.cursor]
    }

    /// Move to the next node, wrapping after the last one.
    pub fn advance(&mut self) -> &NodeEndpoint {
        self.cursor = (self.cursor + 1) % self.nodes.len();
        &self.nodes[self.cursor]
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// One failover per known node.
    pub fn failover_limit(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[NodeEndpoint] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a rotator cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
