//! steemrpc CLI — talk to Steem full nodes with failover.
//!
//! # Commands
//! ```text
//! steemrpc --node <url>... call   <procedure> [--api <ns>] [--arg <json>]... [--kwarg <k=json>]...
//! steemrpc --node <url>... head   [--irreversible]
//! steemrpc --node <url>... block  [<number>]
//! steemrpc --node <url>... stream [--head] [--start <n>] [--max-catchup <n>] [--limit <n>]
//! steemrpc --node <url>... nodes
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::Value;

use steemrpc_core::{RpcCall, RpcOutcome};
use steemrpc_http::{connect_with_failover, HttpRpcClient};
use steemrpc_stream::{SteemdClient, StreamConfig, DEFAULT_BLOCK_INTERVAL};

mod config;
mod logging;

use config::ClientConfig;

#[derive(Parser)]
#[command(
    name = "steemrpc",
    about = "Resilient JSON-RPC client for Steem full nodes",
    long_about = "
steemrpc: call Steem full nodes over HTTPS, failing over to the next node
when one stops answering.

Nodes are tried in the order given. A JSON config file (--config) can set
nodes, HTTP and retry options, failover and logging; --node flags replace
the configured node list.
",
    version
)]
struct Cli {
    /// Full-node URL. Repeat to give failover order.
    #[arg(short, long = "node", global = true)]
    nodes: Vec<String>,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace | debug | info | warn | error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a procedure and print the result as JSON
    Call {
        /// Procedure name, e.g. get_dynamic_global_properties
        procedure: String,
        /// API namespace, e.g. database_api
        #[arg(long)]
        api: Option<String>,
        /// Positional argument as JSON (bare words are taken as strings)
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Keyword argument as key=JSON
        #[arg(long = "kwarg")]
        kwargs: Vec<String>,
        /// Only try the current node
        #[arg(long)]
        no_failover: bool,
    },

    /// Print the head (or last irreversible) block number
    Head {
        #[arg(long)]
        irreversible: bool,
    },

    /// Print a block as JSON (default: the head block)
    Block {
        number: Option<u64>,
    },

    /// Follow the chain and print blocks as they arrive
    Stream {
        /// Follow the head block instead of the last irreversible block
        #[arg(long)]
        head: bool,
        /// First block to print (default: the next new block)
        #[arg(long)]
        start: Option<u64>,
        /// Never fall more than this many blocks behind the tip
        #[arg(long)]
        max_catchup: Option<u64>,
        /// Polls without a new block before giving up on the node
        #[arg(long, default_value_t = 9)]
        hung_threshold: u32,
        /// Polling interval (default: the chain's block interval)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many blocks
        #[arg(long)]
        limit: Option<usize>,
        /// Print whole blocks as JSON lines instead of a summary
        #[arg(long)]
        full: bool,
    },

    /// List the configured nodes in failover order
    Nodes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_nodes(cli.nodes);
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    config.log.json |= cli.json_logs;
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Call {
            procedure,
            api,
            args,
            kwargs,
            no_failover,
        } => {
            let call = build_call(procedure, api, &args, &kwargs, no_failover)?;
            cmd_call(&config, call).await
        }

        Commands::Head { irreversible } => cmd_head(&config, irreversible).await,

        Commands::Block { number } => cmd_block(&config, number).await,

        Commands::Stream {
            head,
            start,
            max_catchup,
            hung_threshold,
            interval_ms,
            limit,
            full,
        } => {
            let stream = StreamConfig {
                irreversible: !head,
                interval_ms,
                max_blocks_catchup: max_catchup,
                hung_node_threshold: hung_threshold,
                start_block: start,
            };
            cmd_stream(&config, stream, limit, full).await
        }

        Commands::Nodes => cmd_nodes(&config),
    }
}

fn client(config: &ClientConfig) -> Result<HttpRpcClient> {
    if config.nodes.is_empty() {
        bail!("no nodes configured; pass --node <url> or set `nodes` in the config file");
    }
    connect_with_failover(&config.nodes, config.http.clone(), config.failover.clone())
        .context("failed to build client")
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_call(config: &ClientConfig, call: RpcCall) -> Result<()> {
    let mut client = client(config)?;
    match client.call(call).await {
        RpcOutcome::Ok(value) => print_json(&value),
        RpcOutcome::RemoteError { error, .. } => {
            bail!("node returned an error: {error}")
        }
        RpcOutcome::Empty => bail!("no usable response from any node"),
    }
}

async fn cmd_head(config: &ClientConfig, irreversible: bool) -> Result<()> {
    let mut steemd = SteemdClient::with_block_interval(client(config)?, DEFAULT_BLOCK_INTERVAL);
    let number = if irreversible {
        steemd.last_irreversible_block_number().await
    } else {
        steemd.head_block_number().await
    };
    let number = number.ok_or_else(|| anyhow!("could not read the chain tip"))?;
    println!("{number}");
    Ok(())
}

async fn cmd_block(config: &ClientConfig, number: Option<u64>) -> Result<()> {
    let mut steemd = SteemdClient::with_block_interval(client(config)?, DEFAULT_BLOCK_INTERVAL);
    match steemd.get_block(number).await? {
        Some(block) => print_json(&serde_json::to_value(&block)?),
        None => match number {
            Some(n) => bail!("block {n} not found"),
            None => bail!("could not read the head block"),
        },
    }
}

async fn cmd_stream(
    config: &ClientConfig,
    stream: StreamConfig,
    limit: Option<usize>,
    full: bool,
) -> Result<()> {
    let rpc = client(config)?;
    let mut steemd = match stream.interval() {
        Some(interval) => SteemdClient::with_block_interval(rpc, interval),
        None => SteemdClient::init(rpc).await,
    };

    let blocks = steemd
        .stream_blocks(stream)
        .into_stream()
        .take(limit.unwrap_or(usize::MAX));
    futures::pin_mut!(blocks);

    while let Some(block) = blocks.next().await {
        let block = block.context("block stream stopped")?;
        if full {
            println!("{}", serde_json::to_string(&block)?);
        } else {
            println!(
                "{:>10}  {}  {}  {} txs",
                block.number()?,
                block.block_id,
                block.witness().unwrap_or("-"),
                block.transactions().len()
            );
        }
    }
    Ok(())
}

fn cmd_nodes(config: &ClientConfig) -> Result<()> {
    let client = client(config)?;
    for (i, node) in client.nodes().iter().enumerate() {
        let marker = if node == client.current_node() { "*" } else { " " };
        println!("{marker} {i:>2}  {node}");
    }
    println!("failover limit: {}", client.failover_limit());
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn build_call(
    procedure: String,
    api: Option<String>,
    args: &[String],
    kwargs: &[String],
    no_failover: bool,
) -> Result<RpcCall> {
    let mut call = RpcCall::new(procedure).failover(!no_failover);
    if let Some(api) = api {
        call = call.api(api);
    }
    for arg in args {
        call = call.arg(parse_value(arg));
    }
    for kwarg in kwargs {
        let (key, value) = kwarg
            .split_once('=')
            .ok_or_else(|| anyhow!("keyword argument `{kwarg}` is not key=value"))?;
        call = call.kwarg(key, parse_value(value));
    }
    Ok(call)
}

/// JSON if it parses, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
