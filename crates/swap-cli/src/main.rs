//! swap-cli
//!
//! Thin demo CLI client for the swap orchestrator. Talks to a running
//! swap-node over JSON-RPC.
//!
//! Usage:
//!   swap-cli create   --user-address <addr> --beneficiary <addr> --source-chain <c> \
//!                      --source-token <t> --source-amount <u128> --target-chain <c> \
//!                      --target-token <t> --expected-amount <u128> --slippage <f64> \
//!                      --expiration <unix_ts> [--rpc <url>]
//!   swap-cli get      --id <uuid> [--rpc <url>]
//!   swap-cli list     [--user-address <addr>] [--status <STATUS>] [--limit <n>] [--offset <n>] [--rpc <url>]
//!   swap-cli cancel   --id <uuid> --user-address <addr> [--rpc <url>]
//!   swap-cli events   --id <uuid> [--rpc <url>]
//!   swap-cli watch    --id <uuid> [--interval <secs>] [--rpc <url>]

use anyhow::Context;
use clap::{Parser, Subcommand};

mod rpc_client;
use rpc_client::SwapRpcClient;

#[derive(Parser, Debug)]
#[command(
    name = "swap-cli",
    version,
    about = "Demo CLI client for the cross-chain swap orchestrator"
)]
struct Args {
    /// Orchestrator RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8645")]
    rpc: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a new swap draft.
    Create {
        #[arg(long)]
        user_address: String,
        #[arg(long)]
        beneficiary: String,
        #[arg(long)]
        source_chain: String,
        #[arg(long)]
        source_token: String,
        #[arg(long)]
        source_amount: String,
        #[arg(long)]
        target_chain: String,
        #[arg(long)]
        target_token: String,
        #[arg(long)]
        expected_amount: String,
        #[arg(long, default_value_t = 0.01)]
        slippage: f64,
        #[arg(long)]
        expiration: i64,
    },

    /// Fetch a single swap by id.
    Get {
        #[arg(long)]
        id: String,
    },

    /// List swaps, optionally filtered.
    List {
        #[arg(long)]
        user_address: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Cancel a PENDING swap. Must be called by the originating user.
    Cancel {
        #[arg(long)]
        id: String,
        #[arg(long)]
        user_address: String,
    },

    /// Print a swap's full event history.
    Events {
        #[arg(long)]
        id: String,
    },

    /// Poll a swap's event history until it reaches a terminal state.
    /// A thin client has no WebSocket support, so this polls
    /// `swap_getEvents` rather than using the live `swap_subscribeEvents`
    /// subscription a full RPC client would use.
    Watch {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 3)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,swap_cli=info")
        .init();

    let args = Args::parse();
    let client = SwapRpcClient::new(&args.rpc);

    match args.command {
        Command::Create {
            user_address,
            beneficiary,
            source_chain,
            source_token,
            source_amount,
            target_chain,
            target_token,
            expected_amount,
            slippage,
            expiration,
        } => {
            let draft = serde_json::json!({
                "user_address": user_address,
                "beneficiary": beneficiary,
                "source_chain": source_chain,
                "source_token": source_token,
                "source_amount": source_amount,
                "target_chain": target_chain,
                "target_token": target_token,
                "expected_amount": expected_amount,
                "slippage_tolerance": slippage,
                "expiration_time": expiration,
            });
            let swap = client.create(draft).await.context("creating swap")?;
            print_json(&swap);
            Ok(())
        }

        Command::Get { id } => {
            let swap = client.get(&id).await.context("fetching swap")?;
            print_json(&swap);
            Ok(())
        }

        Command::List { user_address, status, limit, offset } => {
            let swaps = client
                .list(user_address.as_deref(), status.as_deref(), limit, offset)
                .await
                .context("listing swaps")?;
            print_json(&swaps);
            Ok(())
        }

        Command::Cancel { id, user_address } => {
            let swap = client.cancel(&id, &user_address).await.context("cancelling swap")?;
            print_json(&swap);
            Ok(())
        }

        Command::Events { id } => {
            let events = client.get_events(&id).await.context("fetching events")?;
            print_json(&events);
            Ok(())
        }

        Command::Watch { id, interval } => {
            let terminal = [
                "USER_CLAIMED",
                "POOL_CLAIMED",
                "EXPIRED",
                "REFUNDED",
                "CANCELLED",
                "ERROR",
            ];
            loop {
                let swap = client.get(&id).await.context("polling swap")?;
                let status = swap["status"].as_str().unwrap_or("UNKNOWN").to_string();
                println!("{}: {}", id, status);
                if terminal.contains(&status.as_str()) {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
            }
            Ok(())
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}
