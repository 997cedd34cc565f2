//! Transport-level retry policy with exponential backoff.
//!
//! This runs *beneath* failover: a connection keeps retrying the same node
//! until one of the per-cause budgets below is spent, and only then reports
//! [`TransportError::RetriesExhausted`](crate::error::TransportError) so the
//! client can move on to the next node.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status codes the node software is known to return transiently.
pub const DEFAULT_STATUS_FORCELIST: [u16; 13] = [
    408, 444, 499, 500, 502, 503, 504, 520, 521, 522, 523, 524, 527,
];

/// Idempotent methods retried by default. `POST` is added on top because
/// every JSON-RPC call is a `POST`.
pub const DEFAULT_ALLOWED_METHODS: [&str; 6] = ["HEAD", "GET", "PUT", "DELETE", "OPTIONS", "TRACE"];

/// Statuses for which a `Retry-After` header is honoured.
pub const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Declarative retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Overall cap across every cause; `None` = only the per-cause caps apply.
    pub total: Option<u32>,
    /// Connection-establishment errors.
    pub connect: u32,
    /// Errors after the request was sent (reset, truncated body, ...).
    pub read: u32,
    /// Redirects followed before giving up.
    pub redirect: u32,
    /// Responses whose status is in `status_forcelist`.
    pub status: u32,
    pub allowed_methods: BTreeSet<String>,
    pub status_forcelist: BTreeSet<u16>,
    /// Seconds; the n-th consecutive error sleeps `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
    pub backoff_max_ms: u64,
    pub respect_retry_after: bool,
    pub raise_on_redirect: bool,
    pub raise_on_status: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let mut allowed_methods: BTreeSet<String> =
            DEFAULT_ALLOWED_METHODS.iter().map(|m| m.to_string()).collect();
        allowed_methods.insert("POST".into());
        Self {
            total: Some(10),
            connect: 5,
            read: 0,
            redirect: 5,
            status: 3,
            allowed_methods,
            status_forcelist: DEFAULT_STATUS_FORCELIST.into_iter().collect(),
            backoff_factor: 0.1,
            backoff_max_ms: 120_000,
            respect_retry_after: true,
            raise_on_redirect: true,
            raise_on_status: true,
        }
    }
}

impl RetryPolicy {
    /// Force the settings every RPC call depends on, whatever the caller
    /// supplied: `POST` must be retried and exhausted retries must surface as
    /// errors rather than as the last bad response.
    pub fn normalized(mut self) -> Self {
        self.allowed_methods = self
            .allowed_methods
            .into_iter()
            .map(|m| m.to_ascii_uppercase())
            .collect();
        self.allowed_methods.insert("POST".into());
        self.raise_on_redirect = true;
        self.raise_on_status = true;
        self
    }

    pub fn is_retryable_method(&self, method: &str) -> bool {
        self.allowed_methods.contains(&method.to_ascii_uppercase())
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Delay before the next attempt after `consecutive_errors` failures in a row.
    ///
    /// The first failure is retried immediately.
    pub fn backoff_delay(&self, consecutive_errors: u32) -> Duration {
        if consecutive_errors <= 1 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi((consecutive_errors - 1) as i32);
        let cap = Duration::from_millis(self.backoff_max_ms);
        if !secs.is_finite() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs).min(cap)
    }

    /// Start tracking the retries of one request.
    pub fn attempts(&self) -> RetryAttempts<'_> {
        RetryAttempts {
            policy: self,
            total: 0,
            connect: 0,
            read: 0,
            status: 0,
            consecutive: 0,
        }
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCause {
    Connect,
    Read,
    Status(u16),
}

/// Per-request retry counters.
#[derive(Debug)]
pub struct RetryAttempts<'a> {
    policy: &'a RetryPolicy,
    total: u32,
    connect: u32,
    read: u32,
    status: u32,
    consecutive: u32,
}

impl RetryAttempts<'_> {
    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before retrying, or `None` once the budget
    /// for this cause (or the overall budget) is spent.
    pub fn record(&mut self, cause: RetryCause) -> Option<Duration> {
        self.total += 1;
        self.consecutive += 1;
        let (used, limit) = match cause {
            RetryCause::Connect => {
                self.connect += 1;
                (self.connect, self.policy.connect)
            }
            RetryCause::Read => {
                self.read += 1;
                (self.read, self.policy.read)
            }
            RetryCause::Status(_) => {
                self.status += 1;
                (self.status, self.policy.status)
            }
        };
        if used > limit {
            return None;
        }
        if let Some(total) = self.policy.total {
            if self.total > total {
                return None;
            }
        }
        Some(self.policy.backoff_delay(self.consecutive))
    }

    /// Number of failed attempts recorded so far.
    pub fn failures(&self) -> u32 {
        self.total
    }
}
