//! Blocks as returned by `database_api.get_block`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StreamError;

/// A signed block. Only `block_id` is interpreted; everything else is kept
/// as the node sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Block {
    pub block_id: String,
    /// Every other member of the block object.
    pub fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Block {
    type Error = StreamError;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, StreamError> {
        match fields.remove("block_id") {
            Some(Value::String(block_id)) => Ok(Self { block_id, fields }),
            Some(other) => Err(StreamError::MalformedBlock(format!(
                "block_id is not a string: {other}"
            ))),
            None => Err(StreamError::MalformedBlock("missing field `block_id`".into())),
        }
    }
}

impl From<Block> for Map<String, Value> {
    fn from(block: Block) -> Self {
        let mut fields = block.fields;
        fields.insert("block_id".into(), Value::String(block.block_id));
        fields
    }
}

impl Block {
    pub fn from_value(value: Value) -> Result<Self, StreamError> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            other => Err(StreamError::MalformedBlock(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Height encoded in the block id.
    pub fn number(&self) -> Result<u64, StreamError> {
        block_id_to_number(&self.block_id)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn previous(&self) -> Option<&str> {
        self.get("previous").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get("timestamp").and_then(Value::as_str)
    }

    pub fn witness(&self) -> Option<&str> {
        self.get("witness").and_then(Value::as_str)
    }

    pub fn transactions(&self) -> &[Value] {
        self.get("transactions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Block height from a block id: the first 8 hex digits, big-endian.
pub fn block_id_to_number(block_id: &str) -> Result<u64, StreamError> {
    let prefix = block_id
        .get(..8)
        .filter(|p| p.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| StreamError::InvalidBlockId(block_id.to_string()))?;
    u32::from_str_radix(prefix, 16)
        .map(u64::from)
        .map_err(|_| StreamError::InvalidBlockId(block_id.to_string()))
}
