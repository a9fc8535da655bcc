use crate::rpc::{BlockHeader, SearchBatch};
use alloy::primitives::{Address, TxHash};
use anyhow::Result;
use thiserror::Error;

/// Errors a chain client reports with a meaning of their own.
/// Anything else travels as a plain `anyhow::Error`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("address {0} has no transaction history")]
    NotFound(Address),
}

/// Access to an address's transaction index and to block data
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Entries strictly older than `block` (`None` = from the tip), newest
    /// first, collected in whole blocks until at least `page_size` entries.
    async fn search_transactions_before(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch>;

    /// Entries strictly newer than `block` (`None` = from genesis), newest
    /// first, collected in whole blocks until at least `page_size` entries.
    async fn search_transactions_after(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch>;

    /// Block containing the transaction, `None` if the chain does not know it
    async fn transaction_block(&self, hash: TxHash) -> Result<Option<u64>>;

    async fn block_header(&self, number: u64) -> Result<BlockHeader>;

    async fn latest_block_number(&self) -> Result<u64>;
}

/// ENS-style name resolution
#[async_trait::async_trait]
pub trait NameService: Send + Sync {
    /// Reverse resolution: address -> primary name
    async fn lookup_address(&self, address: Address) -> Result<Option<String>>;

    /// Forward resolution: name -> address
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>>;
}
