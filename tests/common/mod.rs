#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use anyhow::{anyhow, Result};
use atex::client::{ChainClient, ClientError, NameService};
use atex::rpc::{BlockHeader, SearchBatch, TransactionSummary};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn tx_hash(address: Address, block: u64, index: u64) -> TxHash {
    let mut seed = address.to_vec();
    seed.extend_from_slice(&block.to_be_bytes());
    seed.extend_from_slice(&index.to_be_bytes());
    keccak256(seed)
}

/// Transaction index per address, answering queries the way an Otterscan
/// node does: whole blocks, newest first.
#[derive(Default)]
pub struct MemoryChain {
    index: Mutex<HashMap<Address, Vec<TransactionSummary>>>,
    latest_block: AtomicU64,
    fail: AtomicBool,
    pub searches: AtomicUsize,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// One block per entry of `counts`, starting at block 1; `counts[i]`
    /// transactions in block i + 1. Each tx sends to `addr(200)`.
    pub fn with_blocks(address: Address, counts: &[usize]) -> Self {
        let chain = Self::new();
        for (i, count) in counts.iter().enumerate() {
            chain.add_block(address, i as u64 + 1, *count);
        }
        chain
    }

    /// `n` transactions, one per block
    pub fn with_history(address: Address, n: usize) -> Self {
        Self::with_blocks(address, &vec![1; n])
    }

    pub fn add_block(&self, address: Address, block: u64, count: usize) {
        let mut index = self.index.lock().unwrap();
        let entries = index.entry(address).or_default();
        for i in 0..count as u64 {
            let mut tx = TransactionSummary::new(tx_hash(address, block, i), block, i, address);
            tx.to = Some(addr(200));
            tx.value = U256::from(block * 1000 + i);
            entries.push(tx);
        }
        entries.sort_by(|a, b| b.position().cmp(&a.position()));
        self.latest_block.fetch_max(block, Ordering::SeqCst);
    }

    /// Newest first
    pub fn entries(&self, address: Address) -> Vec<TransactionSummary> {
        self.index
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .unwrap_or_default()
    }

    pub fn hashes(&self, address: Address) -> Vec<TxHash> {
        self.entries(address).iter().map(|tx| tx.hash).collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn set_latest_block(&self, block: u64) {
        self.latest_block.store(block, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

/// Leading entries of `list`, extended to the end of the block in which the
/// `size`th entry lies
fn take_whole_blocks(list: &[TransactionSummary], size: usize) -> Vec<TransactionSummary> {
    let mut out: Vec<TransactionSummary> = Vec::new();
    for tx in list {
        if out.len() >= size && out.last().map(|l| l.block_number) != Some(tx.block_number) {
            break;
        }
        out.push(tx.clone());
    }
    out
}

#[async_trait::async_trait]
impl ChainClient for MemoryChain {
    async fn search_transactions_before(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch> {
        self.check()?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries(address);
        if entries.is_empty() && block.is_none() {
            return Err(ClientError::NotFound(address).into());
        }

        let candidates: Vec<_> = entries
            .iter()
            .filter(|tx| block.map_or(true, |b| tx.block_number < b))
            .cloned()
            .collect();
        let txs = take_whole_blocks(&candidates, page_size);

        Ok(SearchBatch {
            reached_newest: entries.first().map(|tx| tx.hash) == txs.first().map(|tx| tx.hash),
            reached_oldest: txs.len() == candidates.len(),
            txs,
        })
    }

    async fn search_transactions_after(
        &self,
        address: Address,
        block: Option<u64>,
        page_size: usize,
    ) -> Result<SearchBatch> {
        self.check()?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries(address);
        if entries.is_empty() && block.is_none() {
            return Err(ClientError::NotFound(address).into());
        }

        // Oldest first while collecting
        let candidates: Vec<_> = entries
            .iter()
            .rev()
            .filter(|tx| block.map_or(true, |b| tx.block_number > b))
            .cloned()
            .collect();
        let mut txs = take_whole_blocks(&candidates, page_size);
        let reached_newest = txs.len() == candidates.len();
        let reached_oldest = entries.last().map(|tx| tx.hash) == txs.first().map(|tx| tx.hash);
        txs.reverse();

        Ok(SearchBatch {
            txs,
            reached_newest,
            reached_oldest,
        })
    }

    async fn transaction_block(&self, hash: TxHash) -> Result<Option<u64>> {
        self.check()?;
        Ok(self
            .index
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|tx| tx.hash == hash)
            .map(|tx| tx.block_number))
    }

    async fn block_header(&self, number: u64) -> Result<BlockHeader> {
        self.check()?;
        Ok(BlockHeader {
            number,
            hash: B256::left_padding_from(&number.to_be_bytes()),
            timestamp: number * 12,
            miner: Address::ZERO,
            gas_used: 0,
            base_fee: None,
        })
    }

    async fn latest_block_number(&self) -> Result<u64> {
        self.check()?;
        Ok(self.latest_block.load(Ordering::SeqCst))
    }
}

/// Reverse names from a fixed table; addresses in `failing` error out
#[derive(Default)]
pub struct MemoryNames {
    names: HashMap<Address, String>,
    failing: HashSet<Address>,
    lookups: Mutex<Vec<Address>>,
}

impl MemoryNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, address: Address, name: &str) -> Self {
        self.names.insert(address, name.to_string());
        self
    }

    pub fn with_failure(mut self, address: Address) -> Self {
        self.failing.insert(address);
        self
    }

    pub fn lookups(&self) -> Vec<Address> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NameService for MemoryNames {
    async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        self.lookups.lock().unwrap().push(address);
        if self.failing.contains(&address) {
            return Err(anyhow!("lookup of {address} failed"));
        }
        Ok(self.names.get(&address).cloned())
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        Ok(self
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(a, _)| *a))
    }
}
