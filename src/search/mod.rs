mod action;

pub use action::{decide_action, execute, Action, PageRequest};

use crate::client::{ChainClient, ClientError};
use crate::rpc::{SearchBatch, TransactionSummary};
use alloy::primitives::{Address, TxHash};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transaction {0:?} is not part of this address's history")]
    CursorNotFound(TxHash),
    #[error("already on the {0} page")]
    PageBoundary(&'static str),
    #[error("controller is bound to {bound}, not {requested}")]
    AddressMismatch { bound: Address, requested: Address },
    #[error("no page loaded for {0}")]
    NotLoaded(Address),
    #[error("page step requested without a cursor")]
    MissingCursor,
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

/// Immutable page of an address's transaction index, newest first. Each step
/// returns a new controller; "next" walks towards older entries.
///
/// Index queries return whole blocks, so the buffer may hold entries past the
/// page on either side. The following step consumes them before fetching.
#[derive(Debug, Clone)]
pub struct SearchController {
    address: Address,
    page_size: usize,
    /// Newest first. Holds the current page plus any overflow on either side.
    txs: Arc<[TransactionSummary]>,
    page_start: usize,
    page_end: usize,
    /// `txs[0]` is the newest entry of the index
    reached_newest: bool,
    /// `txs[len - 1]` is the oldest entry of the index
    reached_oldest: bool,
}

impl SearchController {
    fn new(
        address: Address,
        page_size: usize,
        txs: Vec<TransactionSummary>,
        reached_newest: bool,
        reached_oldest: bool,
        bound_to_start: bool,
    ) -> Self {
        let page_size = page_size.max(1);
        let len = txs.len();
        let (page_start, page_end) = if bound_to_start {
            (0, len.min(page_size))
        } else {
            (len.saturating_sub(page_size), len)
        };

        Self {
            address,
            page_size,
            txs: txs.into(),
            page_start,
            page_end,
            reached_newest,
            reached_oldest,
        }
    }

    fn empty(address: Address, page_size: usize) -> Self {
        Self::new(address, page_size, Vec::new(), true, true, true)
    }

    /// Newest page of the index. An address without history yields an empty
    /// page that is both first and last.
    pub async fn first_page(
        client: &dyn ChainClient,
        address: Address,
        page_size: usize,
    ) -> Result<Self, SearchError> {
        let page_size = page_size.max(1);
        debug!(%address, "loading first page");
        match client
            .search_transactions_before(address, None, page_size)
            .await
        {
            Ok(batch) if batch.is_empty() => Ok(Self::empty(address, page_size)),
            Ok(batch) => Ok(Self::new(
                address,
                page_size,
                batch.txs,
                true,
                batch.reached_oldest,
                true,
            )),
            Err(e) if is_not_found(&e) => Ok(Self::empty(address, page_size)),
            Err(e) => Err(e.into()),
        }
    }

    /// Oldest page of the index
    pub async fn last_page(
        client: &dyn ChainClient,
        address: Address,
        page_size: usize,
    ) -> Result<Self, SearchError> {
        let page_size = page_size.max(1);
        debug!(%address, "loading last page");
        match client
            .search_transactions_after(address, None, page_size)
            .await
        {
            Ok(batch) if batch.is_empty() => Ok(Self::empty(address, page_size)),
            Ok(batch) => Ok(Self::new(
                address,
                page_size,
                batch.txs,
                batch.reached_newest,
                true,
                false,
            )),
            Err(e) if is_not_found(&e) => Ok(Self::empty(address, page_size)),
            Err(e) => Err(e.into()),
        }
    }

    /// Page right after (`forward`, older) or right before (newer) the cursor
    /// transaction, for deep links that carry no previous controller. A cursor
    /// with nothing beyond it yields the boundary page on that side.
    pub async fn middle_page(
        client: &dyn ChainClient,
        address: Address,
        cursor: TxHash,
        forward: bool,
        page_size: usize,
    ) -> Result<Self, SearchError> {
        let page_size = page_size.max(1);
        debug!(%address, ?cursor, forward, "loading middle page");
        let block = client
            .transaction_block(cursor)
            .await?
            .ok_or(SearchError::CursorNotFound(cursor))?;

        if forward {
            let batch = fetch_older(client, address, cursor, block, page_size).await?;
            if batch.is_empty() {
                debug!(%address, ?cursor, "cursor is the oldest entry");
                return Self::last_page(client, address, page_size).await;
            }
            Ok(Self::new(
                address,
                page_size,
                batch.txs,
                false,
                batch.reached_oldest,
                true,
            ))
        } else {
            let batch = fetch_newer(client, address, cursor, block, page_size).await?;
            if batch.is_empty() {
                debug!(%address, ?cursor, "cursor is the newest entry");
                return Self::first_page(client, address, page_size).await;
            }
            Ok(Self::new(
                address,
                page_size,
                batch.txs,
                batch.reached_newest,
                false,
                false,
            ))
        }
    }

    /// Step towards newer entries. `cursor` must be the first listed hash.
    pub async fn prev_page(
        &self,
        client: &dyn ChainClient,
        cursor: TxHash,
    ) -> Result<Self, SearchError> {
        if self.is_first() {
            return Err(SearchError::PageBoundary("first"));
        }
        if self.page().first().map(|tx| tx.hash) != Some(cursor) {
            return Err(SearchError::CursorNotFound(cursor));
        }

        let overflow = &self.txs[..self.page_start];
        if overflow.len() >= self.page_size || self.reached_newest {
            return Ok(Self::new(
                self.address,
                self.page_size,
                overflow.to_vec(),
                self.reached_newest,
                false,
                false,
            ));
        }

        // Newest buffered entry; the current page is never empty here
        let anchor = &self.txs[0];
        let batch = fetch_newer(
            client,
            self.address,
            anchor.hash,
            anchor.block_number,
            self.page_size - overflow.len(),
        )
        .await?;

        let mut txs = batch.txs;
        txs.extend_from_slice(overflow);
        Ok(Self::new(
            self.address,
            self.page_size,
            txs,
            batch.reached_newest,
            false,
            false,
        ))
    }

    /// Step towards older entries. `cursor` must be the last listed hash.
    pub async fn next_page(
        &self,
        client: &dyn ChainClient,
        cursor: TxHash,
    ) -> Result<Self, SearchError> {
        if self.is_last() {
            return Err(SearchError::PageBoundary("last"));
        }
        if self.page().last().map(|tx| tx.hash) != Some(cursor) {
            return Err(SearchError::CursorNotFound(cursor));
        }

        let overflow = &self.txs[self.page_end..];
        if overflow.len() >= self.page_size || self.reached_oldest {
            return Ok(Self::new(
                self.address,
                self.page_size,
                overflow.to_vec(),
                false,
                self.reached_oldest,
                true,
            ));
        }

        let anchor = &self.txs[self.txs.len() - 1];
        let batch = fetch_older(
            client,
            self.address,
            anchor.hash,
            anchor.block_number,
            self.page_size - overflow.len(),
        )
        .await?;

        let mut txs = overflow.to_vec();
        txs.extend(batch.txs);
        Ok(Self::new(
            self.address,
            self.page_size,
            txs,
            false,
            batch.reached_oldest,
            true,
        ))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page(&self) -> &[TransactionSummary] {
        &self.txs[self.page_start..self.page_end]
    }

    /// The page touches the newest end of the index
    pub fn is_first(&self) -> bool {
        self.reached_newest && self.page_start == 0
    }

    /// The page touches the oldest end of the index
    pub fn is_last(&self) -> bool {
        self.reached_oldest && self.page_end == self.txs.len()
    }

    /// Cursor for the "prev" link
    pub fn prev_cursor(&self) -> Option<TxHash> {
        self.page().first().map(|tx| tx.hash)
    }

    /// Cursor for the "next" link
    pub fn next_cursor(&self) -> Option<TxHash> {
        self.page().last().map(|tx| tx.hash)
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<ClientError>(), Some(ClientError::NotFound(_)))
}

/// Entries strictly older than the anchor, at least `want` of them unless the
/// index ends first. Fails with `CursorNotFound` if the anchor is not in the
/// address's index at `block`.
async fn fetch_older(
    client: &dyn ChainClient,
    address: Address,
    anchor: TxHash,
    block: u64,
    want: usize,
) -> Result<SearchBatch, SearchError> {
    // Upper bound is exclusive, so this starts with the anchor's own block
    let first = client
        .search_transactions_before(address, Some(block.saturating_add(1)), want)
        .await?;
    let position = first
        .txs
        .iter()
        .find(|tx| tx.hash == anchor)
        .map(|tx| tx.position())
        .ok_or(SearchError::CursorNotFound(anchor))?;

    let mut txs: Vec<_> = first
        .txs
        .into_iter()
        .filter(|tx| tx.position() < position)
        .collect();
    let mut reached_oldest = first.reached_oldest;

    // Everything past the anchor's block arrives in whole blocks
    while txs.len() < want && !reached_oldest {
        let from = txs.last().map_or(block, |tx| tx.block_number);
        let more = client
            .search_transactions_before(address, Some(from), want - txs.len())
            .await?;
        reached_oldest = more.reached_oldest;
        if more.is_empty() {
            break;
        }
        txs.extend(more.txs);
    }

    Ok(SearchBatch {
        txs,
        reached_newest: false,
        reached_oldest,
    })
}

/// Entries strictly newer than the anchor, newest first; mirror of
/// [`fetch_older`].
async fn fetch_newer(
    client: &dyn ChainClient,
    address: Address,
    anchor: TxHash,
    block: u64,
    want: usize,
) -> Result<SearchBatch, SearchError> {
    // Lower bound is exclusive; block 0 has no predecessor so start from genesis
    let first = client
        .search_transactions_after(address, block.checked_sub(1), want)
        .await?;
    let position = first
        .txs
        .iter()
        .find(|tx| tx.hash == anchor)
        .map(|tx| tx.position())
        .ok_or(SearchError::CursorNotFound(anchor))?;

    let mut txs: Vec<_> = first
        .txs
        .into_iter()
        .filter(|tx| tx.position() > position)
        .collect();
    let mut reached_newest = first.reached_newest;

    while txs.len() < want && !reached_newest {
        let from = txs.first().map_or(block, |tx| tx.block_number);
        let more = client
            .search_transactions_after(address, Some(from), want - txs.len())
            .await?;
        reached_newest = more.reached_newest;
        if more.is_empty() {
            break;
        }
        let mut merged = more.txs;
        merged.extend(txs);
        txs = merged;
    }

    Ok(SearchBatch {
        txs,
        reached_newest,
        reached_oldest: false,
    })
}
