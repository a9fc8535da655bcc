mod helper;
mod types;

pub use helper::{format_u256_decimals, namehash, shorten_hex};
pub use types::*;

use crate::client::{ChainClient, ClientError, NameService};
use alloy::{
    eips::BlockNumberOrTag,
    network::Ethereum,
    primitives::{address, Address, TxHash, TxKind},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

type HttpProvider = RootProvider<Ethereum>;

// ENS ReverseRecords contract on mainnet (for reverse resolution: address -> name)
const ENS_REVERSE_RECORDS: Address = address!("3671aE578E63FdF66ad4F3E12CC0c0d71Ac7510C");

// ENS Registry contract on mainnet (for forward resolution: name -> address)
const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

sol! {
    #[sol(rpc)]
    interface ReverseRecords {
        function getNames(address[] calldata addresses) external view returns (string[] memory);
    }
}

sol! {
    #[sol(rpc)]
    interface ENSRegistry {
        function resolver(bytes32 node) external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface ENSResolver {
        function addr(bytes32 node) external view returns (address);
    }
}

/// RPC client for an Otterscan-enabled node, with retry logic for
/// rate-limited endpoints
pub struct RpcClient {
    provider: HttpProvider,
    max_retries: u32,
    base_delay: Duration,
}

impl RpcClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url.parse().context("Invalid RPC URL")?;
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            provider,
            max_retries: 5,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Override the retry count and the first backoff delay
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut all_errors: Vec<String> = Vec::new();

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let error_full = format!("{e:#}");
                    let error_lower = error_full.to_lowercase();

                    all_errors.push(format!("Attempt {}: {}", attempt + 1, error_full));

                    // Retry on rate limits and transient network errors
                    let is_retryable = error_lower.contains("rate")
                        || error_lower.contains("limit")
                        || error_lower.contains("429")
                        || error_lower.contains("too many")
                        || error_lower.contains("timeout")
                        || error_lower.contains("timed out")
                        || error_lower.contains("connection")
                        || error_lower.contains("temporarily")
                        || error_lower.contains("unavailable")
                        || error_lower.contains("502")
                        || error_lower.contains("503")
                        || error_lower.contains("504");

                    if is_retryable && attempt < self.max_retries {
                        let delay = self.base_delay * 2_u32.pow(attempt);
                        warn!(attempt = attempt + 1, ?delay, "retrying RPC call: {error_full}");
                        sleep(delay).await;
                    } else {
                        if all_errors.len() > 1 {
                            return Err(anyhow!(
                                "{:#}\n\nAll attempts:\n{}",
                                e,
                                all_errors.join("\n")
                            ));
                        }
                        return Err(e);
                    }
                }
            }
        }

        Err(anyhow!(
            "All {} retries failed:\n{}",
            self.max_retries + 1,
            all_errors.join("\n")
        ))
    }

    async fn ots_search(
        &self,
        method: &'static str,
        address: Address,
        block: u64,
        page_size: usize,
    ) -> Result<SearchBatch> {
        self.with_retry(|| async {
            debug!(%address, block, page_size, "{method}");
            let result: OtsSearchResult = self
                .provider
                .raw_request(method.into(), (address, block, page_size as u64))
                .await
                .with_context(|| format!("RPC call {method}({address}, {block}) failed"))?;
            Ok(SearchBatch::from(result))
        })
        .await
    }

    /// Resolve ENS names for a list of addresses in one ReverseRecords call.
    /// Only addresses that have a name appear in the result.
    pub async fn resolve_ens_names(&self, addresses: &[Address]) -> Result<HashMap<Address, String>> {
        let mut result = HashMap::new();

        if addresses.is_empty() {
            return Ok(result);
        }

        let call = ReverseRecords::getNamesCall {
            addresses: addresses.to_vec(),
        };

        let tx = TransactionRequest {
            to: Some(TxKind::Call(ENS_REVERSE_RECORDS)),
            input: alloy::rpc::types::TransactionInput::new(call.abi_encode().into()),
            ..Default::default()
        };

        let response = self
            .with_retry(|| async {
                self.provider
                    .call(tx.clone())
                    .await
                    .context("Failed to query ENS ReverseRecords")
            })
            .await?;

        let names = ReverseRecords::getNamesCall::abi_decode_returns(&response)
            .context("Failed to decode ENS names")?;

        for (addr, name) in addresses.iter().zip(names.iter()) {
            if !name.is_empty() {
                result.insert(*addr, name.clone());
            }
        }

        Ok(result)
    }
}

#[async_trait::async_trait]
impl ChainClient for RpcClient {
    async fn search_transactions_before(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch> {
        let batch = self
            .ots_search("ots_searchTransactionsBefore", address, block.unwrap_or(0), page_size)
            .await?;

        if block.is_none() && batch.is_empty() {
            return Err(ClientError::NotFound(address).into());
        }
        Ok(batch)
    }

    async fn search_transactions_after(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch> {
        let batch = self
            .ots_search("ots_searchTransactionsAfter", address, block.unwrap_or(0), page_size)
            .await?;

        if block.is_none() && batch.is_empty() {
            return Err(ClientError::NotFound(address).into());
        }
        Ok(batch)
    }

    async fn transaction_block(&self, hash: TxHash) -> Result<Option<u64>> {
        self.with_retry(|| async {
            let tx = self
                .provider
                .get_transaction_by_hash(hash)
                .await
                .with_context(|| format!("RPC call get_transaction_by_hash({hash:?}) failed"))?;

            // Pending transactions are not part of any index yet
            Ok(tx.and_then(|tx| tx.block_number))
        })
        .await
    }

    async fn block_header(&self, number: u64) -> Result<BlockHeader> {
        self.with_retry(|| async {
            let block = self
                .provider
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .await
                .with_context(|| format!("RPC call get_block_by_number({number}) failed"))?
                .ok_or_else(|| anyhow!("Block {number} not found (RPC returned null)"))?;

            Ok(BlockHeader::from_block(&block))
        })
        .await
        .with_context(|| format!("Failed to fetch block #{number}"))
    }

    async fn latest_block_number(&self) -> Result<u64> {
        self.with_retry(|| async {
            self.provider
                .get_block_number()
                .await
                .context("Failed to fetch latest block number")
        })
        .await
    }
}

#[async_trait::async_trait]
impl NameService for RpcClient {
    async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        Ok(self.resolve_ens_names(&[address]).await?.remove(&address))
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        let node = namehash(name);

        // Step 1: Get the resolver address from the ENS registry
        let registry_call = ENSRegistry::resolverCall { node };
        let registry_tx = TransactionRequest {
            to: Some(TxKind::Call(ENS_REGISTRY)),
            input: alloy::rpc::types::TransactionInput::new(registry_call.abi_encode().into()),
            ..Default::default()
        };

        let response = self
            .with_retry(|| async {
                self.provider
                    .call(registry_tx.clone())
                    .await
                    .context("Failed to query ENS registry")
            })
            .await?;

        let resolver_addr = ENSRegistry::resolverCall::abi_decode_returns(&response)
            .context("Failed to decode resolver address")?;

        if resolver_addr == Address::ZERO {
            debug!(name, "no ENS resolver");
            return Ok(None);
        }

        // Step 2: Query the resolver for the address
        let resolver_call = ENSResolver::addrCall { node };
        let resolver_tx = TransactionRequest {
            to: Some(TxKind::Call(resolver_addr)),
            input: alloy::rpc::types::TransactionInput::new(resolver_call.abi_encode().into()),
            ..Default::default()
        };

        let response = self
            .with_retry(|| async {
                self.provider
                    .call(resolver_tx.clone())
                    .await
                    .context("Failed to query ENS resolver")
            })
            .await?;

        let resolved_addr = ENSResolver::addrCall::abi_decode_returns(&response)
            .context("Failed to decode resolved address")?;

        Ok((resolved_addr != Address::ZERO).then_some(resolved_addr))
    }
}
