//! Typed helpers over the `database_api` and `follow_api` namespaces.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde_json::Value;

use steemrpc_core::{NodeConnection, RpcCall, RpcClient, RpcOutcome};

use crate::block::Block;
use crate::error::StreamError;
use crate::source::BlockSource;
use crate::streamer::{BlockStreamer, StreamConfig};

const DATABASE_API: &str = "database_api";
const FOLLOW_API: &str = "follow_api";

/// Used when the node does not report `STEEM_BLOCK_INTERVAL`.
pub const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_secs(3);

/// An [`RpcClient`] plus the chain's block interval.
pub struct SteemdClient<C: NodeConnection> {
    rpc: RpcClient<C>,
    block_interval: Duration,
}

impl<C: NodeConnection> SteemdClient<C> {
    /// Wrap `rpc`, reading the block interval from `get_config` once.
    pub async fn init(rpc: RpcClient<C>) -> Self {
        let mut client = Self::with_block_interval(rpc, DEFAULT_BLOCK_INTERVAL);
        let config = client.config().await;
        match config.get("STEEM_BLOCK_INTERVAL").and_then(Value::as_u64) {
            Some(secs) if secs > 0 => client.block_interval = Duration::from_secs(secs),
            _ => tracing::warn!(
                default_secs = DEFAULT_BLOCK_INTERVAL.as_secs(),
                "node did not report STEEM_BLOCK_INTERVAL, using default"
            ),
        }
        client
    }

    pub fn with_block_interval(rpc: RpcClient<C>, block_interval: Duration) -> Self {
        Self {
            rpc,
            block_interval,
        }
    }

    pub fn block_interval(&self) -> Duration {
        self.block_interval
    }

    pub fn rpc(&self) -> &RpcClient<C> {
        &self.rpc
    }

    pub fn rpc_mut(&mut self) -> &mut RpcClient<C> {
        &mut self.rpc
    }

    pub fn into_inner(self) -> RpcClient<C> {
        self.rpc
    }

    pub async fn call(&mut self, call: RpcCall) -> RpcOutcome {
        self.rpc.call(call).await
    }

    async fn database(&mut self, call: RpcCall) -> RpcOutcome {
        self.rpc.call(call.api(DATABASE_API)).await
    }

    // ─── Chain state ──────────────────────────────────────────────────────

    pub async fn dynamic_global_properties(&mut self) -> RpcOutcome {
        self.database(RpcCall::new("get_dynamic_global_properties")).await
    }

    pub async fn chain_properties(&mut self) -> RpcOutcome {
        self.database(RpcCall::new("get_chain_properties")).await
    }

    pub async fn config(&mut self) -> RpcOutcome {
        self.database(RpcCall::new("get_config")).await
    }

    pub async fn head_block_number(&mut self) -> Option<u64> {
        self.dynamic_global_properties()
            .await
            .get("head_block_number")
            .and_then(Value::as_u64)
    }

    pub async fn last_irreversible_block_number(&mut self) -> Option<u64> {
        self.dynamic_global_properties()
            .await
            .get("last_irreversible_block_num")
            .and_then(Value::as_u64)
    }

    // ─── Blocks ───────────────────────────────────────────────────────────

    /// Fetch block `number`, or the head block when `None`.
    pub async fn get_block(&mut self, number: Option<u64>) -> Result<Option<Block>, StreamError> {
        let number = match number {
            Some(n) => n,
            None => match self.head_block_number().await {
                Some(head) => head,
                None => return Ok(None),
            },
        };
        match self
            .database(RpcCall::new("get_block").arg(number))
            .await
            .into_value()
        {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Block::from_value(value).map(Some),
        }
    }

    /// Blocks `start..=end` in order, one call per block. `end` defaults to
    /// the head block, read when the stream is first polled.
    pub fn blocks(
        &mut self,
        start: u64,
        end: Option<u64>,
    ) -> impl Stream<Item = Result<Option<Block>, StreamError>> + '_ {
        stream::unfold((self, start, end), |(client, next, end)| async move {
            let end = match end {
                Some(end) => end,
                None => client.head_block_number().await?,
            };
            if next > end {
                return None;
            }
            let block = client.get_block(Some(next)).await;
            Some((block, (client, next + 1, Some(end))))
        })
    }

    /// Follow the chain tip. See [`BlockStreamer`].
    pub fn stream_blocks(&mut self, config: StreamConfig) -> BlockStreamer<&mut Self> {
        BlockStreamer::new(self, config)
    }

    // ─── Accounts ─────────────────────────────────────────────────────────

    pub async fn get_accounts<I, S>(&mut self, accounts: I) -> RpcOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<Value> = accounts.into_iter().map(|a| Value::String(a.into())).collect();
        self.database(RpcCall::new("get_accounts").arg(names)).await
    }

    /// The account object, or `None` if it does not exist.
    pub async fn get_account(&mut self, account: &str) -> Option<Value> {
        first_or_none(self.get_accounts([account]).await)
    }

    pub async fn get_account_reputation(&mut self, account: &str) -> Option<i64> {
        let call = RpcCall::new("get_account_reputations")
            .api(FOLLOW_API)
            .arg(account)
            .arg(1);
        let entry = first_or_none(self.rpc.call(call).await)?;
        parse_reputation(entry.get("reputation")?)
    }

    pub async fn get_account_reputations<I, S>(&mut self, accounts: I) -> Vec<Option<i64>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut reputations = Vec::new();
        for account in accounts {
            reputations.push(self.get_account_reputation(account.as_ref()).await);
        }
        reputations
    }

    // ─── Witnesses ────────────────────────────────────────────────────────

    pub async fn get_witnesses_by_id<I>(&mut self, ids: I) -> RpcOutcome
    where
        I: IntoIterator<Item = u64>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Value::from).collect();
        self.database(RpcCall::new("get_witnesses").arg(ids)).await
    }

    /// One `get_witness_by_account` call per account, in order.
    pub async fn get_witnesses_by_account<I, S>(&mut self, accounts: I) -> Vec<Option<Value>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut witnesses = Vec::new();
        for account in accounts {
            let call = RpcCall::new("get_witness_by_account").arg(account.as_ref());
            witnesses.push(self.database(call).await.into_value());
        }
        witnesses
    }
}

#[async_trait]
impl<C: NodeConnection> BlockSource for SteemdClient<C> {
    async fn chain_tip(&mut self, irreversible: bool) -> Option<u64> {
        if irreversible {
            self.last_irreversible_block_number().await
        } else {
            self.head_block_number().await
        }
    }

    async fn block(&mut self, number: u64) -> Result<Option<Block>, StreamError> {
        self.get_block(Some(number)).await
    }

    fn block_interval(&self) -> Duration {
        self.block_interval
    }
}

fn first_or_none(outcome: RpcOutcome) -> Option<Value> {
    match outcome.into_value()? {
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    }
}

/// Reputations arrive as integers or as decimal strings.
fn parse_reputation(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use bytes::Bytes;
    use futures::StreamExt;
    use serde_json::json;
    use steemrpc_core::{ClientError, NodeEndpoint, NodeRotator, RawResponse, TransportError};

    /// Answers namespaced calls from a table keyed by procedure name.
    /// `get_block` is answered from `blocks` instead.
    #[derive(Default)]
    struct FakeNode {
        bound: Option<NodeEndpoint>,
        results: HashMap<&'static str, Value>,
        blocks: HashMap<u64, Value>,
        calls: Vec<(String, Value)>,
    }

    #[async_trait]
    impl NodeConnection for FakeNode {
        fn bind(&mut self, node: &NodeEndpoint) -> Result<(), ClientError> {
            self.bound = Some(node.clone());
            Ok(())
        }

        fn release(&mut self) {
            self.bound = None;
        }

        fn bound_node(&self) -> Option<&NodeEndpoint> {
            self.bound.as_ref()
        }

        async fn send(&mut self, body: Bytes) -> Result<RawResponse, TransportError> {
            let request: Value = serde_json::from_slice(&body).unwrap();
            let procedure = request["params"][1].as_str().unwrap().to_string();
            let args = request["params"][2].clone();
            self.calls.push((procedure.clone(), args.clone()));

            let result = if procedure == "get_block" {
                let number = args[0].as_u64().unwrap();
                self.blocks.get(&number).cloned().unwrap_or(Value::Null)
            } else {
                self.results.get(procedure.as_str()).cloned().unwrap_or(Value::Null)
            };
            let reply = json!({"jsonrpc": "2.0", "id": 0, "result": result});
            Ok(RawResponse::new(200, reply.to_string()))
        }
    }

    fn block_json(number: u64) -> Value {
        json!({
            "block_id": format!("{number:08x}00112233445566778899aabbccddeeff00112233"),
            "previous": format!("{:08x}00112233445566778899aabbccddeeff00112233", number - 1),
            "witness": "alice",
            "transactions": []
        })
    }

    fn client(node: FakeNode) -> SteemdClient<FakeNode> {
        let rotator = NodeRotator::from_urls(["https://a.example"]).unwrap();
        let rpc = RpcClient::new(rotator, node).unwrap();
        SteemdClient::with_block_interval(rpc, DEFAULT_BLOCK_INTERVAL)
    }

    fn calls(client: &SteemdClient<FakeNode>) -> Vec<String> {
        client.rpc().connection().calls.iter().map(|(p, _)| p.clone()).collect()
    }

    #[tokio::test]
    async fn init_reads_block_interval_from_config() {
        let mut node = FakeNode::default();
        node.results.insert("get_config", json!({"STEEM_BLOCK_INTERVAL": 6}));
        let rotator = NodeRotator::from_urls(["https://a.example"]).unwrap();
        let client = SteemdClient::init(RpcClient::new(rotator, node).unwrap()).await;
        assert_eq!(client.block_interval(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn init_falls_back_to_default_interval() {
        let rotator = NodeRotator::from_urls(["https://a.example"]).unwrap();
        let client = SteemdClient::init(RpcClient::new(rotator, FakeNode::default()).unwrap()).await;
        assert_eq!(client.block_interval(), DEFAULT_BLOCK_INTERVAL);
    }

    #[tokio::test]
    async fn chain_tip_follows_irreversible_flag() {
        let mut node = FakeNode::default();
        node.results.insert(
            "get_dynamic_global_properties",
            json!({"head_block_number": 120, "last_irreversible_block_num": 100}),
        );
        let mut client = client(node);
        assert_eq!(client.chain_tip(true).await, Some(100));
        assert_eq!(client.chain_tip(false).await, Some(120));
    }

    #[tokio::test]
    async fn get_block_defaults_to_head() {
        let mut node = FakeNode::default();
        node.results
            .insert("get_dynamic_global_properties", json!({"head_block_number": 7}));
        node.blocks.insert(7, block_json(7));
        let mut client = client(node);

        let block = client.get_block(None).await.unwrap().unwrap();
        assert_eq!(block.number().unwrap(), 7);
        assert_eq!(calls(&client), ["get_dynamic_global_properties", "get_block"]);
    }

    #[tokio::test]
    async fn missing_block_is_none() {
        let mut client = client(FakeNode::default());
        assert_eq!(client.get_block(Some(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn blocks_range_in_order() {
        let mut node = FakeNode::default();
        for n in 10..=12 {
            node.blocks.insert(n, block_json(n));
        }
        let mut client = client(node);

        let numbers: Vec<u64> = client
            .blocks(10, Some(12))
            .map(|b| b.unwrap().unwrap().number().unwrap())
            .collect()
            .await;
        assert_eq!(numbers, [10, 11, 12]);
    }

    #[tokio::test]
    async fn blocks_range_ends_at_head() {
        let mut node = FakeNode::default();
        node.results
            .insert("get_dynamic_global_properties", json!({"head_block_number": 3}));
        for n in 1..=3 {
            node.blocks.insert(n, block_json(n));
        }
        let mut client = client(node);

        let count = client.blocks(2, None).count().await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn account_helpers() {
        let mut node = FakeNode::default();
        node.results
            .insert("get_accounts", json!([{"name": "alice", "balance": "1.000 STEEM"}]));
        node.results.insert(
            "get_account_reputations",
            json!([{"account": "alice", "reputation": "1234567890"}]),
        );
        let mut client = client(node);

        let account = client.get_account("alice").await.unwrap();
        assert_eq!(account["name"], "alice");
        assert_eq!(client.get_account_reputation("alice").await, Some(1_234_567_890));
        assert_eq!(
            client.get_account_reputations(["alice", "bob"]).await,
            [Some(1_234_567_890), Some(1_234_567_890)]
        );

        let sent = &client.rpc().connection().calls;
        assert_eq!(sent[0].1, json!([["alice"]]));
        assert_eq!(sent[1].1, json!(["alice", 1]));
    }

    #[tokio::test]
    async fn unknown_account_is_none() {
        let mut node = FakeNode::default();
        node.results.insert("get_accounts", json!([]));
        node.results.insert("get_account_reputations", json!([{"account": "x"}]));
        let mut client = client(node);
        assert_eq!(client.get_account("nobody").await, None);
        assert_eq!(client.get_account_reputation("nobody").await, None);
    }

    #[tokio::test]
    async fn witness_helpers() {
        let mut node = FakeNode::default();
        node.results
            .insert("get_witnesses", json!([{"id": 1, "owner": "alice"}]));
        node.results
            .insert("get_witness_by_account", json!({"owner": "alice"}));
        let mut client = client(node);

        let by_id = client.get_witnesses_by_id([1]).await;
        assert_eq!(by_id.value().unwrap()[0]["owner"], "alice");

        let by_account = client.get_witnesses_by_account(["alice", "bob"]).await;
        assert_eq!(by_account.len(), 2);
        assert_eq!(
            calls(&client),
            ["get_witnesses", "get_witness_by_account", "get_witness_by_account"]
        );
    }

    #[test]
    fn reputation_parsing() {
        assert_eq!(parse_reputation(&json!(42)), Some(42));
        assert_eq!(parse_reputation(&json!("-7")), Some(-7));
        assert_eq!(parse_reputation(&json!("n/a")), None);
        assert_eq!(parse_reputation(&json!(null)), None);
    }
}
