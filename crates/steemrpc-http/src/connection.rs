//! HTTPS node connection backed by `reqwest`.
//!
//! Features:
//! - One pooled `reqwest::Client` per bound node, rebuilt on every rebind
//! - Connect / status / redirect retries with exponential backoff
//! - `Retry-After` support for throttling statuses
//! - Custom CA bundle and extra headers

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use steemrpc_core::connection::{NodeConnection, RawResponse};
use steemrpc_core::error::{ClientError, TransportError};
use steemrpc_core::policy::retry::RETRY_AFTER_STATUSES;
use steemrpc_core::policy::{RetryCause, RetryPolicy};
use steemrpc_core::rotator::NodeEndpoint;

use crate::config::HttpConnectionConfig;

struct Binding {
    node: NodeEndpoint,
    http: reqwest::Client,
}

/// A failed attempt that the retry policy may absorb.
struct Failure {
    cause: RetryCause,
    reason: String,
    retry_after: Option<Duration>,
}

/// Owns the single live `reqwest::Client` of an `RpcClient`.
pub struct HttpConnection {
    config: HttpConnectionConfig,
    headers: HeaderMap,
    roots: Vec<reqwest::Certificate>,
    binding: Option<Binding>,
}

impl HttpConnection {
    /// Validate headers and load the CA bundle. No node is bound yet.
    pub fn new(mut config: HttpConnectionConfig) -> Result<Self, ClientError> {
        config.retry = config.retry.normalized();

        let mut headers = HeaderMap::new();
        for (name, value) in config.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Build(format!("invalid header name `{name}`: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ClientError::Build(format!("invalid value for `{name}`: {e}")))?;
            headers.insert(name, value);
        }

        let roots = match &config.ca_bundle {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    ClientError::Build(format!("cannot read CA bundle {}: {e}", path.display()))
                })?;
                reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                    ClientError::Build(format!("invalid CA bundle {}: {e}", path.display()))
                })?
            }
            None => Vec::new(),
        };

        Ok(Self {
            config,
            headers,
            roots,
            binding: None,
        })
    }

    pub fn config(&self) -> &HttpConnectionConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    fn build_client(&self) -> Result<reqwest::Client, ClientError> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(self.config.pool_size)
            .timeout(self.config.request_timeout())
            .tcp_keepalive(self.config.tcp_keepalive())
            .default_headers(self.headers.clone())
            .redirect(reqwest::redirect::Policy::limited(
                self.config.retry.redirect as usize,
            ))
            .use_rustls_tls();
        if !self.roots.is_empty() {
            builder = builder.tls_built_in_root_certs(false);
            for cert in &self.roots {
                builder = builder.add_root_certificate(cert.clone());
            }
        }
        builder.build().map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            ClientError::Build(e.to_string())
        })
    }

    fn classify(error: &reqwest::Error) -> RetryCause {
        if error.is_connect() {
            RetryCause::Connect
        } else {
            RetryCause::Read
        }
    }
}

/// Seconds form of `Retry-After`; HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pause before the next attempt. A throttling node's `Retry-After` wins
/// over the backoff but is capped at `backoff_max_ms`.
fn retry_delay(policy: &RetryPolicy, failure: &Failure, backoff: Duration) -> Duration {
    match (failure.cause, failure.retry_after) {
        (RetryCause::Status(code), Some(after))
            if policy.respect_retry_after && RETRY_AFTER_STATUSES.contains(&code) =>
        {
            after
                .max(backoff)
                .min(Duration::from_millis(policy.backoff_max_ms))
        }
        _ => backoff,
    }
}

/// Root path of the node URL.
fn root_url(node: &NodeEndpoint) -> reqwest::Url {
    let mut url = node.url().clone();
    url.set_path("/");
    url.set_query(None);
    url
}

async fn send_once(
    binding: &Binding,
    policy: &RetryPolicy,
    body: Bytes,
    timeout_ms: u64,
) -> Result<Result<RawResponse, Failure>, TransportError> {
    let timed_out = || TransportError::Timeout {
        node: binding.node.to_string(),
        ms: timeout_ms,
    };
    let exhausted = |reason: String| TransportError::RetriesExhausted {
        node: binding.node.to_string(),
        reason,
    };

    let resp = match binding.http.post(root_url(&binding.node)).body(body).send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => return Err(timed_out()),
        Err(e) if e.is_redirect() => return Err(exhausted(format!("too many redirects: {e}"))),
        Err(e) => {
            return Ok(Err(Failure {
                cause: HttpConnection::classify(&e),
                reason: e.to_string(),
                retry_after: None,
            }))
        }
    };

    let status = resp.status().as_u16();
    if policy.is_retryable_status(status) {
        return Ok(Err(Failure {
            cause: RetryCause::Status(status),
            reason: format!("HTTP {status}"),
            retry_after: retry_after(resp.headers()),
        }));
    }

    match resp.bytes().await {
        Ok(body) => Ok(Ok(RawResponse::new(status, body))),
        Err(e) if e.is_timeout() => Err(timed_out()),
        Err(e) => Ok(Err(Failure {
            cause: RetryCause::Read,
            reason: format!("failed to read response body: {e}"),
            retry_after: None,
        })),
    }
}

#[async_trait]
impl NodeConnection for HttpConnection {
    fn bind(&mut self, node: &NodeEndpoint) -> Result<(), ClientError> {
        self.release();
        let http = self.build_client()?;
        self.binding = Some(Binding {
            node: node.clone(),
            http,
        });
        tracing::info!(node = %node, host = node.host(), "current node changed");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(binding) = self.binding.take() {
            tracing::debug!(node = %binding.node, "released connection pool");
        }
    }

    fn bound_node(&self) -> Option<&NodeEndpoint> {
        self.binding.as_ref().map(|b| &b.node)
    }

    async fn send(&mut self, body: Bytes) -> Result<RawResponse, TransportError> {
        let binding = self.binding.as_ref().ok_or(TransportError::PoolClosed)?;
        let policy = &self.config.retry;
        let mut attempts = policy.attempts();

        loop {
            let failure =
                match send_once(binding, policy, body.clone(), self.config.request_timeout_ms)
                    .await?
                {
                    Ok(resp) => return Ok(resp),
                    Err(failure) => failure,
                };

            match attempts.record(failure.cause) {
                Some(backoff) => {
                    let delay = retry_delay(policy, &failure, backoff);
                    tracing::warn!(
                        node = %binding.node,
                        attempt = attempts.failures(),
                        delay_ms = delay.as_millis() as u64,
                        reason = %failure.reason,
                        "retrying request"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                None => {
                    tracing::error!(
                        node = %binding.node,
                        attempts = attempts.failures(),
                        reason = %failure.reason,
                        "max retries exceeded"
                    );
                    return Err(TransportError::RetriesExhausted {
                        node: binding.node.to_string(),
                        reason: failure.reason,
                    });
                }
            }
        }
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(url: &str) -> NodeEndpoint {
        NodeEndpoint::parse(url).unwrap()
    }

    #[tokio::test]
    async fn send_without_binding_reports_closed_pool() {
        let mut conn = HttpConnection::new(HttpConnectionConfig::default()).unwrap();
        let err = conn.send(Bytes::from_static(b"{}")).await.unwrap_err();
        assert!(err.is_pool_closed());
    }

    #[test]
    fn bind_and_release_are_idempotent() {
        let mut conn = HttpConnection::new(HttpConnectionConfig::default()).unwrap();
        conn.release();
        conn.bind(&node("https://a.example")).unwrap();
        conn.bind(&node("https://b.example")).unwrap();
        assert_eq!(conn.bound_node().unwrap().host(), "b.example");
        conn.release();
        conn.release();
        assert!(conn.bound_node().is_none());
    }

    #[test]
    fn user_policy_is_normalized() {
        let mut config = HttpConnectionConfig::default();
        config.retry.allowed_methods.clear();
        config.retry.raise_on_status = false;
        let conn = HttpConnection::new(config).unwrap();
        assert!(conn.retry_policy().is_retryable_method("POST"));
        assert!(conn.retry_policy().raise_on_status);
    }

    #[test]
    fn invalid_header_rejected() {
        let mut config = HttpConnectionConfig::default();
        config.extra_headers.insert("bad header".into(), "x".into());
        assert!(matches!(
            HttpConnection::new(config),
            Err(ClientError::Build(_))
        ));
    }

    #[test]
    fn missing_ca_bundle_rejected() {
        let config = HttpConnectionConfig {
            ca_bundle: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        };
        assert!(matches!(
            HttpConnection::new(config),
            Err(ClientError::Build(_))
        ));
    }

    #[test]
    fn root_url_drops_path_and_query() {
        let url = root_url(&node("https://api.example.com/rpc?x=1"));
        assert_eq!(url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    fn throttled(after_secs: u64) -> Failure {
        Failure {
            cause: RetryCause::Status(503),
            retry_after: Some(Duration::from_secs(after_secs)),
            reason: "503 Service Unavailable".into(),
        }
    }

    #[test]
    fn retry_after_is_capped_at_backoff_max() {
        let policy = RetryPolicy::default();
        let backoff = Duration::from_millis(200);

        assert_eq!(retry_delay(&policy, &throttled(5), backoff), Duration::from_secs(5));
        assert_eq!(
            retry_delay(&policy, &throttled(86_400), backoff),
            Duration::from_millis(policy.backoff_max_ms)
        );
        assert_eq!(retry_delay(&policy, &throttled(0), backoff), backoff);
    }

    #[test]
    fn retry_after_ignored_when_disabled() {
        let policy = RetryPolicy {
            respect_retry_after: false,
            ..Default::default()
        };
        let backoff = Duration::from_millis(200);
        assert_eq!(retry_delay(&policy, &throttled(60), backoff), backoff);
    }
}
