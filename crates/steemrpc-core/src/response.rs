//! JSON-RPC response decoding.
//!
//! Decoding never fails. Malformed payloads and node-reported errors are
//! logged and folded into an [`RpcOutcome`], which keeps "the node said
//! `null`", "the node reported an error" and "there was nothing usable"
//! apart.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNKNOWN_RPC_ERROR: &str = "Unknown RPC error occurred.";

/// The `error` member of a response, read leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: Option<i64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RemoteError {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(obj) => Self {
                code: obj.get("code").and_then(Value::as_i64),
                message: obj
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_RPC_ERROR)
                    .to_string(),
                data: obj.get("data").cloned(),
            },
            Value::String(s) => Self {
                code: None,
                message: s.clone(),
                data: None,
            },
            other => Self {
                code: None,
                message: UNKNOWN_RPC_ERROR.to_string(),
                data: Some(other.clone()),
            },
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "RPC error {code}: {}", self.message),
            None => write!(f, "RPC error: {}", self.message),
        }
    }
}

/// Result of one logical RPC call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// The node answered with a `result` (which may be JSON `null`).
    Ok(Value),
    /// The node answered with an `error`. `result` is kept if the node sent
    /// both.
    RemoteError {
        error: RemoteError,
        result: Option<Value>,
    },
    /// No usable answer: undecodable payload, no `result`/`error` member, or
    /// every node exhausted.
    Empty,
}

impl RpcOutcome {
    /// Collapse to the plain "value or nothing" view.
    ///
    /// A remote error yields whatever `result` accompanied it, usually `None`.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Ok(v) => Some(v),
            Self::RemoteError { result, .. } => result,
            Self::Empty => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Ok(v) => Some(v),
            Self::RemoteError { result, .. } => result.as_ref(),
            Self::Empty => None,
        }
    }

    /// Field lookup on an object result; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value().and_then(|v| v.get(key))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Self::RemoteError { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Deserialize the value into `T`. A missing value or JSON `null`
    /// gives `Ok(None)`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Option<T>, serde_json::Error> {
        match self.into_value() {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v).map(Some),
        }
    }
}

/// Decode a raw response body.
pub fn decode_response(body: &[u8]) -> RpcOutcome {
    let decoded: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, bytes = body.len(), "unable to decode response");
            return RpcOutcome::Empty;
        }
    };

    let Value::Object(mut obj) = decoded else {
        tracing::error!("invalid response received: not a JSON object");
        return RpcOutcome::Empty;
    };

    if let Some(raw_error) = obj.get("error") {
        let error = RemoteError::from_value(raw_error);
        tracing::error!(code = ?error.code, message = %error.message, "node returned an RPC error");
        return RpcOutcome::RemoteError {
            error,
            result: obj.remove("result"),
        };
    }

    match obj.remove("result") {
        Some(result) => RpcOutcome::Ok(result),
        None => RpcOutcome::Empty,
    }
}
