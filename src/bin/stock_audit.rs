//! Operator-facing reconciliation tool for the stock ledger.
//!
//! `verify` replays the movement log and diffs it against live balances
//! without writing anything; `rebuild` is the explicit correction step and
//! refuses to run without `--confirm`.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use tavola_stock::{
    config, events,
    services::{movements::TimeRange, stock::BalanceView},
    AppState,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "stock-audit",
    about = "Reconciliation tooling for the Tavola stock ledger",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the movement log and diff it against live balances
    Verify(VerifyArgs),
    /// Rebuild the balance store from a full replay (replaces live balances)
    Rebuild(RebuildArgs),
    /// Show the live balance for an item
    Balance(BalanceArgs),
}

#[derive(Args)]
struct VerifyArgs {
    #[arg(long, help = "Only replay movements recorded at or after this RFC 3339 timestamp")]
    from: Option<DateTime<Utc>>,
    #[arg(long, help = "Only replay movements recorded at or before this RFC 3339 timestamp")]
    to: Option<DateTime<Utc>>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Render the report as pretty JSON"
    )]
    json: bool,
}

#[derive(Args)]
struct RebuildArgs {
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Required acknowledgement that live balances will be replaced"
    )]
    confirm: bool,
}

#[derive(Args)]
struct BalanceArgs {
    #[arg(long, help = "Item id")]
    item: Uuid,
    #[arg(long, help = "Restrict to one warehouse")]
    warehouse: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let (event_sender, event_rx) = events::event_channel(256);
    let _event_task = events::spawn_event_logger(event_rx);

    let state = AppState::new(cfg, event_sender)
        .await
        .context("initializing stock services")?;

    match cli.command {
        Commands::Verify(args) => {
            let range = if args.from.is_some() || args.to.is_some() {
                Some(TimeRange {
                    from: args.from,
                    to: args.to,
                })
            } else {
                None
            };

            let report = state.services.recompute.recompute(range).await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "replayed {} movements up to seq {}: {} balances matched, {} diverged",
                    report.movements_replayed,
                    report.ceiling_seq,
                    report.matched,
                    report.mismatched.len()
                );
                for mismatch in &report.mismatched {
                    println!(
                        "  item {} warehouse {}: live {} recomputed {}",
                        mismatch.item_id,
                        mismatch.warehouse_id,
                        mismatch.live_quantity,
                        mismatch.recomputed_quantity
                    );
                }
            }

            if !report.is_clean() {
                // Non-zero exit so audit scripts can alert on divergence.
                std::process::exit(1);
            }
        }
        Commands::Rebuild(args) => {
            if !args.confirm {
                bail!("rebuild replaces every live balance; re-run with --confirm");
            }
            let entries = state.services.recompute.rebuild().await?;
            println!("balance store rebuilt: {} entries", entries);
        }
        Commands::Balance(args) => {
            let view = state
                .services
                .stock
                .get_balance(args.item, args.warehouse)
                .await?;
            match view {
                BalanceView::Single(quantity) => println!("{}", quantity),
                BalanceView::PerWarehouse(map) => {
                    let mut rows: Vec<_> = map.into_iter().collect();
                    rows.sort_by_key(|(warehouse_id, _)| *warehouse_id);
                    for (warehouse_id, quantity) in rows {
                        println!("{} {}", warehouse_id, quantity);
                    }
                }
            }
        }
    }

    Ok(())
}
