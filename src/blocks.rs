use crate::client::ChainClient;
use crate::rpc::BlockHeader;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle of a running block subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Call `callback` with the header of every new tip seen, starting with the
/// current one. Polls every `poll_interval`; failed polls are logged and
/// retried on the next tick. Must be called inside a tokio runtime.
pub fn subscribe_to_new_blocks<F>(
    client: Arc<dyn ChainClient>,
    poll_interval: Duration,
    mut callback: F,
) -> Subscription
where
    F: FnMut(BlockHeader) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<u64> = None;

        loop {
            ticker.tick().await;

            let latest = match client.latest_block_number().await {
                Ok(n) => n,
                Err(e) => {
                    warn!("block poll failed: {e:#}");
                    continue;
                }
            };
            if last_seen.is_some_and(|seen| latest <= seen) {
                continue;
            }

            match client.block_header(latest).await {
                Ok(header) => {
                    debug!(number = header.number, "new block");
                    last_seen = Some(latest);
                    callback(header);
                }
                Err(e) => warn!("failed to fetch header of block {latest}: {e:#}"),
            }
        }
    });

    Subscription { handle }
}
