//! Configuration for `HttpConnection`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use steemrpc_core::policy::RetryPolicy;

/// Headers sent with every request, before `extra_headers` are applied.
pub const DEFAULT_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("Content-Type", "application/json"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConnectionConfig {
    /// Idle connections kept per node. Calls are serialised, so a handful
    /// is plenty.
    pub pool_size: usize,
    /// Total time allowed for one HTTP exchange, in milliseconds.
    pub request_timeout_ms: u64,
    /// TCP keep-alive interval, in milliseconds.
    pub tcp_keepalive_ms: u64,
    pub retry: RetryPolicy,
    /// PEM bundle that replaces the built-in root certificates.
    pub ca_bundle: Option<PathBuf>,
    /// Added to (or overriding) [`DEFAULT_HEADERS`].
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for HttpConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            request_timeout_ms: 5_000,
            tcp_keepalive_ms: 60_000,
            retry: RetryPolicy::default(),
            ca_bundle: None,
            extra_headers: BTreeMap::new(),
        }
    }
}

impl HttpConnectionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_millis(self.tcp_keepalive_ms)
    }

    /// Default headers merged with `extra_headers`; later entries win.
    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers: BTreeMap<String, String> = DEFAULT_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in &self.extra_headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(k));
            headers.insert(k.clone(), v.clone());
        }
        headers
    }
}
