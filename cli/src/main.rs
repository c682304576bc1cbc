//! mempoolfeed CLI — watch a mempool push API from the terminal.
//!
//! Usage:
//! ```bash
//! # Stream fee updates, blocks and activity on an address
//! mempoolfeed watch --url wss://mempool.space/api/v1/ws --address bc1q...
//!
//! # Track a transaction and the next projected block, JSON output
//! mempoolfeed watch --tx <txid> --mempool-block 0 --json
//!
//! # Decode a single captured frame
//! mempoolfeed decode '{"fees":{"fastestFee":5}}'
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mempoolfeed_core::{decode_frame, InboundEvent, Subscription};
use mempoolfeed_ws::{ClientConfig, MempoolClient};

mod logging;

#[derive(Parser)]
#[command(
    name = "mempoolfeed",
    about = "Real-time mempool event client",
    version
)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print events until Ctrl-C
    Watch {
        /// Push API WebSocket URL
        #[arg(long, default_value = "wss://mempool.space/api/v1/ws")]
        url: String,
        /// Address to track (repeatable)
        #[arg(long)]
        address: Vec<String>,
        /// Transaction id to track (repeatable)
        #[arg(long)]
        tx: Vec<String>,
        /// Projected mempool block index to track (repeatable)
        #[arg(long)]
        mempool_block: Vec<u32>,
        /// Client config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Decode one frame and print the derived events
    Decode {
        /// Frame text; read from --file when omitted
        frame: Option<String>,
        /// File holding the frame
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Watch {
            url,
            address,
            tx,
            mempool_block,
            config,
            json,
        } => {
            let config = match config {
                Some(path) => ClientConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ClientConfig::default(),
            };
            let subscriptions = address
                .into_iter()
                .map(Subscription::Address)
                .chain(tx.into_iter().map(Subscription::Transaction))
                .chain(mempool_block.into_iter().map(Subscription::MempoolBlock))
                .collect::<Vec<_>>();
            cmd_watch(url, config, subscriptions, json).await
        }
        Commands::Decode { frame, file } => {
            let text = match (frame, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => anyhow::bail!("pass a frame or --file"),
            };
            cmd_decode(&text)
        }
    }
}

async fn cmd_watch(
    url: String,
    config: ClientConfig,
    subscriptions: Vec<Subscription>,
    json: bool,
) -> Result<()> {
    let client = MempoolClient::new(url, config);
    client.subscribe(subscriptions)?;
    let mut status = client.subscribe_status();
    let mut events = client.connect().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event, json)?,
                None => break,
            },
            Some(state) = status.recv() => {
                tracing::info!(state = %state, "connection status");
            }
            _ = tokio::signal::ctrl_c() => {
                client.disconnect().await?;
                break;
            }
        }
    }
    Ok(())
}

fn cmd_decode(text: &str) -> Result<()> {
    let frame = decode_frame(text.trim()).context("decoding frame")?;
    for event in frame.forwardable() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn print_event(event: &InboundEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        InboundEvent::FeeUpdate(fee) => println!("fee       fastest {fee} sat/vB"),
        InboundEvent::Block(block) => println!(
            "block     #{} {} fee range {:?}",
            block.height, block.id, block.fee_range
        ),
        InboundEvent::NewTx(tx) => {
            println!("new tx    {} {:.2} sat/vB", tx.txid, tx.fee_rate())
        }
        InboundEvent::TxRemoved(tx) => println!("removed   {}", tx.txid),
        InboundEvent::TxConfirmed(txid) => println!("confirmed {txid}"),
        InboundEvent::MempoolTx(tx) => println!(
            "mempool   {} {:.2} sat/vB flags {:#x}",
            tx.txid, tx.fee_rate, tx.flags
        ),
    }
    Ok(())
}
