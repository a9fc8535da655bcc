use atex::blocks::subscribe_to_new_blocks;
use atex::config::Config;
use atex::resolver::LabelCache;
use atex::route::{self, resolve_target, RouteParams};
use atex::rpc::{format_u256_decimals, shorten_hex, RpcClient, TransactionSummary};
use atex::{AddressView, ChainClient};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Page through an address's transactions on an Otterscan-enabled node
#[derive(Debug, Parser)]
#[command(name = "atex", version)]
struct Cli {
    /// Address (any casing) or ENS name
    address_or_name: String,

    /// first, prev, next or last
    direction: Option<String>,

    /// Cursor transaction hash for prev/next
    #[arg(long)]
    hash: Option<String>,

    /// RPC endpoint, overrides the configured one
    #[arg(long)]
    rpc: Option<String>,

    /// Store --rpc in the config file
    #[arg(long, requires = "rpc")]
    save_rpc: bool,

    /// Transactions per page
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    page_size: Option<u64>,

    /// Keep running and reload the first page on every new block
    #[arg(long)]
    follow: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    if let Some(url) = &cli.rpc {
        if cli.save_rpc {
            config.set_rpc(url.clone())?;
        }
    }
    let rpc_url = cli
        .rpc
        .clone()
        .or_else(|| config.rpc_url.clone())
        .context("No RPC configured. Use 'atex --rpc <url> --save-rpc <address>' first.")?;
    let page_size = cli
        .page_size
        .map(|n| n as usize)
        .unwrap_or(config.page_size);

    let client = Arc::new(RpcClient::new(&rpc_url)?);

    let route = RouteParams::parse(&cli.address_or_name, cli.direction.as_deref(), cli.hash.as_deref())?;
    let target = resolve_target(client.as_ref(), &route).await?;
    if let Some(location) = &target.redirect {
        info!("redirecting to {location}");
    }

    let mut labels = LabelCache::new(config.resolver_concurrency);
    if let Some(capacity) = config.label_cache_capacity {
        labels = labels.with_capacity_limit(capacity);
    }
    let mut view = AddressView::new(target.address, page_size, labels);

    view.navigate(client.as_ref(), client.as_ref(), route.direction, route.cursor)
        .await
        .map_err(|e| anyhow::anyhow!("{e:#}\n\nRPC: {rpc_url}"))?;
    print_view(&view, target.ens_name.as_deref());

    config.add_recent_address(target.address.to_checksum(None));
    if let Err(e) = config.save() {
        warn!("could not save config: {e:#}");
    }

    if cli.follow {
        follow(&mut view, client, config.block_poll_interval(), target.ens_name.as_deref()).await?;
    }

    Ok(())
}

async fn follow(
    view: &mut AddressView,
    client: Arc<RpcClient>,
    poll_interval: std::time::Duration,
    ens_name: Option<&str>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(10);
    let chain: Arc<dyn ChainClient> = client.clone();
    let subscription = subscribe_to_new_blocks(chain, poll_interval, move |header| {
        forward_block(&tx, header.number);
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(number) = rx.recv() => {
                match view.refresh(client.as_ref(), client.as_ref()).await {
                    Ok(true) => {
                        info!(number, "reloaded first page");
                        print_view(view, ens_name);
                    }
                    Ok(false) => {}
                    Err(e) => warn!("reload after block {number} failed: {e:#}"),
                }
            }
        }
    }

    subscription.unsubscribe();
    Ok(())
}

/// Hand a new block number to the follow loop. Returns false when the loop is
/// behind and the notification was dropped.
fn forward_block(tx: &mpsc::Sender<u64>, number: u64) -> bool {
    match tx.try_send(number) {
        Ok(()) => true,
        Err(e) => {
            debug!(number, "block notification dropped: {e}");
            false
        }
    }
}

fn print_view(view: &AddressView, ens_name: Option<&str>) {
    let address = view.address();
    match ens_name {
        Some(name) => println!("Address {} (ENS: {name})", address.to_checksum(None)),
        None => println!("Address {}", address.to_checksum(None)),
    }

    let Some(controller) = view.controller() else {
        println!("Waiting for search results...");
        return;
    };
    let page = controller.page();
    println!("{} transactions on this page\n", page.len());

    for tx in page {
        print_transaction(view, tx);
    }

    println!();
    if let (false, Some(hash)) = (controller.is_first(), controller.prev_cursor()) {
        println!(
            "prev: {}",
            route::location(address, Some(route::Direction::Prev), Some(hash))
        );
    }
    if let (false, Some(hash)) = (controller.is_last(), controller.next_cursor()) {
        println!(
            "next: {}",
            route::location(address, Some(route::Direction::Next), Some(hash))
        );
    }
}

fn print_transaction(view: &AddressView, tx: &TransactionSummary) {
    let label = |a: Address| -> String {
        view.labels()
            .name(&a)
            .map(String::from)
            .unwrap_or_else(|| shorten_hex(&a.to_checksum(None)))
    };

    let to = match (tx.to, tx.contract_created) {
        (Some(to), _) => label(to),
        (None, Some(created)) => format!("[create] {}", label(created)),
        (None, None) => "[create]".to_string(),
    };
    let status = match tx.status {
        Some(false) => " FAILED",
        _ => "",
    };
    let fee = tx
        .fee
        .map(|f| format!("{} ETH", format_u256_decimals(f, 18)))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{}  #{:<10} {:>18} -> {:<18} {:>14} ETH  fee {}  {}{}",
        shorten_hex(&format!("{:?}", tx.hash)),
        tx.block_number,
        label(tx.from),
        to,
        format_u256_decimals(tx.value, 18),
        fee,
        tx.decoded_method.as_deref().unwrap_or(""),
        status
    );

    for transfer in &tx.token_transfers {
        println!(
            "    > {} -> {}  {} of {}",
            label(transfer.from),
            label(transfer.to),
            transfer.value,
            label(transfer.token)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_block_reports_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(forward_block(&tx, 7));
        assert!(!forward_block(&tx, 8));
        assert_eq!(rx.try_recv().unwrap(), 7);

        drop(rx);
        assert!(!forward_block(&tx, 9));
    }

    #[test]
    fn test_page_size_must_be_positive() {
        assert!(Cli::try_parse_from(["atex", "vitalik.eth", "--page-size", "0"]).is_err());
        let cli = Cli::try_parse_from(["atex", "vitalik.eth", "--page-size", "10"]).unwrap();
        assert_eq!(cli.page_size, Some(10));
    }
}
