//! JSON-RPC 2.0 request envelope.
//!
//! Steem nodes accept two shapes:
//!
//! ```text
//! direct:      {"method": "get_config", "params": [...]}
//! namespaced:  {"method": "call", "params": ["database_api", "get_block", [...]]}
//! ```
//!
//! The namespaced shape is chosen whenever an API name or keyword arguments
//! are given.

use std::fmt::Display;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON-RPC 2.0 request as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Echoed back by the node. Calls are serial, so `0` is fine by default.
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    /// Compact UTF-8 encoding (no whitespace, non-ASCII left unescaped).
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Build the request envelope for `procedure`.
///
/// * keyword arguments present → `method="call"`, `params=[api, procedure, {kwargs}]`
///   (`api` is `null` when absent)
/// * only `api` present → `method="call"`, `params=[api, procedure, [args]]`
/// * neither → `method=procedure`, `params=[args]`
pub fn build_request(
    procedure: &str,
    args: &[Value],
    kwargs: &Map<String, Value>,
    api: Option<&str>,
    id: u64,
) -> RpcRequest {
    let api_value = || api.map_or(Value::Null, |a| Value::String(a.to_string()));
    let (method, params) = if !kwargs.is_empty() {
        (
            "call".to_string(),
            Value::Array(vec![
                api_value(),
                Value::String(procedure.to_string()),
                Value::Object(kwargs.clone()),
            ]),
        )
    } else if api.is_some() {
        (
            "call".to_string(),
            Value::Array(vec![
                api_value(),
                Value::String(procedure.to_string()),
                Value::Array(args.to_vec()),
            ]),
        )
    } else {
        (procedure.to_string(), Value::Array(args.to_vec()))
    };
    RpcRequest {
        jsonrpc: "2.0".into(),
        id,
        method,
        params,
    }
}

/// Fallback encoding for values JSON has no native form for (`u128`,
/// decimals, ...): their `Display` output as a string.
pub fn stringify(value: impl Display) -> Value {
    Value::String(value.to_string())
}

/// One logical call: procedure, arguments and per-call options.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    procedure: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    api: Option<String>,
    id: u64,
    enable_failover: bool,
}

impl RpcCall {
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            api: None,
            id: 0,
            enable_failover: true,
        }
    }

    /// Route the call through the multiplexed `call` method of `api`.
    pub fn api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Give up on the first exhausted node instead of rotating.
    pub fn without_failover(mut self) -> Self {
        self.enable_failover = false;
        self
    }

    pub fn failover(mut self, enabled: bool) -> Self {
        self.enable_failover = enabled;
        self
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn failover_enabled(&self) -> bool {
        self.enable_failover
    }

    pub fn to_request(&self) -> RpcRequest {
        build_request(
            &self.procedure,
            &self.args,
            &self.kwargs,
            self.api.as_deref(),
            self.id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_shape_without_api() {
        let req = RpcCall::new("get_config").to_request();
        assert_eq!(req.method, "get_config");
        assert_eq!(req.params, json!([]));
        assert_eq!(req.id, 0);
    }

    #[test]
    fn namespaced_shape_with_api() {
        let req = RpcCall::new("get_block")
            .api("database_api")
            .arg(1000)
            .to_request();
        assert_eq!(req.method, "call");
        assert_eq!(req.params, json!(["database_api", "get_block", [1000]]));
    }

    #[test]
    fn kwargs_take_precedence_over_args() {
        let req = RpcCall::new("find_accounts")
            .api("database_api")
            .arg("ignored")
            .kwarg("accounts", json!(["alice"]))
            .to_request();
        assert_eq!(req.method, "call");
        assert_eq!(
            req.params,
            json!(["database_api", "find_accounts", {"accounts": ["alice"]}])
        );
    }

    #[test]
    fn kwargs_without_api_use_null_namespace() {
        let req = RpcCall::new("get_block").kwarg("block_num", 5).to_request();
        assert_eq!(req.params, json!([null, "get_block", {"block_num": 5}]));
    }

    #[test]
    fn wire_encoding_is_compact() {
        let bytes = RpcCall::new("get_accounts")
            .api("database_api")
            .arg(json!(["żaba"]))
            .id(7)
            .to_request()
            .to_bytes()
            .unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":7,"method":"call","params":["database_api","get_accounts",[["żaba"]]]}"#
        );
    }

    #[test]
    fn stringify_large_integers() {
        let req = RpcCall::new("get_block")
            .arg(stringify(u128::MAX))
            .to_request();
        assert_eq!(req.params, json!([u128::MAX.to_string()]));
    }

    #[test]
    fn build_request_is_deterministic() {
        let call = RpcCall::new("get_block").api("database_api").arg(1);
        assert_eq!(call.to_request(), call.to_request());
        assert!(call.failover_enabled());
        assert!(!call.without_failover().failover_enabled());
    }
}
