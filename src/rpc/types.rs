use alloy::primitives::{Address, Bytes, TxHash, B256, U128, U256, U64};
use serde::Deserialize;
use std::collections::HashMap;

use super::helper::*;

// ============================================================================
// Data Types
// ============================================================================

/// ERC-20 / ERC-721 transfer extracted from a receipt's logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// One entry of an address's transaction index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub hash: TxHash,
    pub block_number: u64,
    pub tx_index: u64,
    pub timestamp: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_created: Option<Address>,
    pub value: U256,
    pub gas_price: Option<u128>,
    pub gas_used: Option<u64>,
    pub fee: Option<U256>,
    pub status: Option<bool>,
    pub method_selector: Option<String>,
    pub decoded_method: Option<String>,
    pub token_transfers: Vec<TokenTransfer>,
}

impl TransactionSummary {
    /// Minimal entry, used where only the index position matters
    pub fn new(hash: TxHash, block_number: u64, tx_index: u64, from: Address) -> Self {
        Self {
            hash,
            block_number,
            tx_index,
            timestamp: 0,
            from,
            to: None,
            contract_created: None,
            value: U256::ZERO,
            gas_price: None,
            gas_used: None,
            fee: None,
            status: None,
            method_selector: None,
            decoded_method: None,
            token_transfers: Vec::new(),
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Position in the index; larger is newer
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.tx_index)
    }

    fn from_ots(tx: &OtsTransaction, receipt: Option<&OtsReceipt>) -> Self {
        let input = &tx.input;

        let method_selector = if input.len() >= 4 && tx.to.is_some() {
            Some(format!(
                "0x{:02x}{:02x}{:02x}{:02x}",
                input[0], input[1], input[2], input[3]
            ))
        } else {
            None
        };
        let decoded_method = decode_function_selector(input).map(String::from);

        let gas_used = receipt.map(|r| r.gas_used.to::<u64>());
        let effective_price = receipt
            .and_then(|r| r.effective_gas_price)
            .or(tx.gas_price)
            .map(|p| p.to::<u128>());
        let fee = match (gas_used, effective_price) {
            (Some(used), Some(price)) => Some(U256::from(used) * U256::from(price)),
            _ => None,
        };

        let token_transfers = receipt
            .map(|r| r.logs.iter().filter_map(OtsLog::as_transfer).collect())
            .unwrap_or_default();

        Self {
            hash: tx.hash,
            block_number: tx.block_number.to::<u64>(),
            tx_index: tx.transaction_index.to::<u64>(),
            timestamp: receipt
                .and_then(|r| r.timestamp)
                .map(|t| t.to::<u64>())
                .unwrap_or_default(),
            from: tx.from,
            to: tx.to,
            contract_created: receipt.and_then(|r| r.contract_address),
            value: tx.value,
            gas_price: effective_price,
            gas_used,
            fee,
            status: receipt.and_then(|r| r.status).map(|s| s.to::<u64>() == 1),
            method_selector,
            decoded_method,
            token_transfers,
        }
    }
}

/// Result of one index query: whole blocks, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBatch {
    pub txs: Vec<TransactionSummary>,
    /// The batch contains the newest entry of the index
    pub reached_newest: bool,
    /// The batch contains the oldest entry of the index
    pub reached_oldest: bool,
}

impl SearchBatch {
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn newest_block(&self) -> Option<u64> {
        self.txs.first().map(|tx| tx.block_number)
    }

    pub fn oldest_block(&self) -> Option<u64> {
        self.txs.last().map(|tx| tx.block_number)
    }
}

/// Block header fields shown next to page entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub miner: Address,
    pub gas_used: u64,
    pub base_fee: Option<u64>,
}

impl BlockHeader {
    pub fn from_block(block: &alloy::rpc::types::Block) -> Self {
        Self {
            number: block.header.number,
            hash: block.header.hash,
            timestamp: block.header.timestamp,
            miner: block.header.beneficiary,
            gas_used: block.header.gas_used,
            base_fee: block.header.base_fee_per_gas,
        }
    }
}

// ============================================================================
// Otterscan wire types
// ============================================================================

/// `ots_searchTransactionsBefore` / `ots_searchTransactionsAfter` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtsSearchResult {
    pub txs: Vec<OtsTransaction>,
    #[serde(default)]
    pub receipts: Vec<OtsReceipt>,
    pub first_page: bool,
    pub last_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtsTransaction {
    pub hash: TxHash,
    pub block_number: U64,
    pub transaction_index: U64,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    pub value: U256,
    #[serde(default)]
    pub gas_price: Option<U128>,
    #[serde(default)]
    pub input: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtsReceipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub status: Option<U64>,
    pub gas_used: U64,
    #[serde(default)]
    pub effective_gas_price: Option<U128>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<OtsLog>,
    #[serde(default)]
    pub timestamp: Option<U64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtsLog {
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl OtsLog {
    /// Decode a `Transfer(address,address,uint256)` log. ERC-721 carries the
    /// token id as a fourth topic instead of data.
    fn as_transfer(&self) -> Option<TokenTransfer> {
        if self.topics.first() != Some(&TRANSFER_TOPIC) || self.topics.len() < 3 {
            return None;
        }
        let value = match self.topics.get(3) {
            Some(token_id) => U256::from_be_bytes(token_id.0),
            None if self.data.len() >= 32 => U256::from_be_slice(&self.data[..32]),
            None => U256::ZERO,
        };
        Some(TokenTransfer {
            token: self.address,
            from: topic_to_address(&self.topics[1]),
            to: topic_to_address(&self.topics[2]),
            value,
        })
    }
}

impl From<OtsSearchResult> for SearchBatch {
    fn from(result: OtsSearchResult) -> Self {
        let receipts: HashMap<TxHash, &OtsReceipt> = result
            .receipts
            .iter()
            .map(|r| (r.transaction_hash, r))
            .collect();

        let mut txs: Vec<TransactionSummary> = result
            .txs
            .iter()
            .map(|tx| TransactionSummary::from_ots(tx, receipts.get(&tx.hash).copied()))
            .collect();
        // The node already returns newest first; keep that independent of node version
        txs.sort_by(|a, b| b.position().cmp(&a.position()));

        Self {
            txs,
            reached_newest: result.first_page,
            reached_oldest: result.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> serde_json::Value {
        json!({
            "txs": [
                {
                    "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                    "blockNumber": "0x10",
                    "transactionIndex": "0x0",
                    "from": "0x742d35cc6634c0532925a3b844bc9e7595f8fe31",
                    "to": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                    "value": "0x0",
                    "gasPrice": "0x3b9aca00",
                    "input": "0xa9059cbb0000000000000000000000000000000000000000000000000000000000000001"
                },
                {
                    "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
                    "blockNumber": "0x11",
                    "transactionIndex": "0x2",
                    "from": "0x742d35cc6634c0532925a3b844bc9e7595f8fe31",
                    "to": null,
                    "value": "0xde0b6b3a7640000",
                    "input": "0x6080"
                }
            ],
            "receipts": [
                {
                    "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                    "status": "0x1",
                    "gasUsed": "0x5208",
                    "effectiveGasPrice": "0x3b9aca00",
                    "timestamp": "0x65000000",
                    "logs": [
                        {
                            "address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                            "topics": [
                                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                                "0x000000000000000000000000742d35cc6634c0532925a3b844bc9e7595f8fe31",
                                "0x0000000000000000000000000000000000000000000000000000000000000001"
                            ],
                            "data": "0x00000000000000000000000000000000000000000000000000000000000003e8"
                        }
                    ]
                },
                {
                    "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
                    "status": "0x0",
                    "gasUsed": "0x10000",
                    "contractAddress": "0x00000000000000000000000000000000000000cc",
                    "logs": []
                }
            ],
            "firstPage": true,
            "lastPage": false
        })
    }

    fn sample_batch() -> SearchBatch {
        let result: OtsSearchResult = serde_json::from_value(sample_result()).unwrap();
        SearchBatch::from(result)
    }

    #[test]
    fn test_batch_is_sorted_newest_first() {
        let batch = sample_batch();
        assert_eq!(batch.txs.len(), 2);
        assert_eq!(batch.txs[0].block_number, 0x11);
        assert_eq!(batch.txs[1].block_number, 0x10);
        assert_eq!(batch.newest_block(), Some(0x11));
        assert_eq!(batch.oldest_block(), Some(0x10));
    }

    #[test]
    fn test_batch_maps_page_flags() {
        let batch = sample_batch();
        assert!(batch.reached_newest);
        assert!(!batch.reached_oldest);
    }

    #[test]
    fn test_summary_fee_and_status() {
        let batch = sample_batch();
        let transfer_tx = &batch.txs[1];
        assert_eq!(transfer_tx.gas_used, Some(21000));
        assert_eq!(
            transfer_tx.fee,
            Some(U256::from(21000u64) * U256::from(1_000_000_000u64))
        );
        assert_eq!(transfer_tx.status, Some(true));
        assert_eq!(transfer_tx.timestamp, 0x65000000);
        assert_eq!(transfer_tx.method_selector.as_deref(), Some("0xa9059cbb"));
        assert_eq!(transfer_tx.decoded_method.as_deref(), Some("transfer"));
    }

    #[test]
    fn test_summary_contract_creation() {
        let batch = sample_batch();
        let creation = &batch.txs[0];
        assert!(creation.is_contract_creation());
        assert_eq!(creation.status, Some(false));
        assert!(creation.contract_created.is_some());
        assert!(creation.method_selector.is_none());
        // No gas price anywhere, so no fee
        assert_eq!(creation.fee, None);
    }

    #[test]
    fn test_summary_decodes_token_transfer() {
        let batch = sample_batch();
        let transfers = &batch.txs[1].token_transfers;
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].value, U256::from(1000u64));
        assert_eq!(
            transfers[0].token,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
                .parse::<Address>()
                .unwrap()
        );
        let mut one = [0u8; 20];
        one[19] = 1;
        assert_eq!(transfers[0].to, Address::from(one));
    }

    #[test]
    fn test_non_transfer_log_is_ignored() {
        let log = OtsLog {
            address: Address::ZERO,
            topics: vec![B256::ZERO],
            data: Bytes::new(),
        };
        assert!(log.as_transfer().is_none());
    }
}
