use alloy::primitives::{b256, keccak256, Address, B256, U256};

// ============================================================================
// Helper Functions
// ============================================================================

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// Compute the namehash for an ENS name
/// https://docs.ens.domains/contract-api-reference/name-processing#algorithm
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;

    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(node.as_slice());
        combined[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(combined);
    }

    node
}

/// Extract the address packed into the low 20 bytes of an indexed topic
pub fn topic_to_address(topic: &B256) -> Address {
    Address::from_slice(&topic.as_slice()[12..])
}

/// Known function selectors, shortened to the method name for list display
pub fn decode_function_selector(selector: &[u8]) -> Option<&'static str> {
    if selector.len() < 4 {
        return None;
    }
    match &selector[..4] {
        // ERC-20
        [0xa9, 0x05, 0x9c, 0xbb] => Some("transfer"),
        [0x23, 0xb8, 0x72, 0xdd] => Some("transferFrom"),
        [0x09, 0x5e, 0xa7, 0xb3] => Some("approve"),
        // ERC-721
        [0x42, 0x84, 0x2e, 0x0e] | [0xb8, 0x8d, 0x4f, 0xde] => Some("safeTransferFrom"),
        [0xa2, 0x2c, 0xb4, 0x65] => Some("setApprovalForAll"),
        // Uniswap V2
        [0x38, 0xed, 0x17, 0x39] => Some("swapExactTokensForTokens"),
        [0x7f, 0xf3, 0x6a, 0xb5] => Some("swapExactETHForTokens"),
        [0x18, 0xcb, 0xaf, 0xe5] => Some("swapExactTokensForETH"),
        [0xfb, 0x3b, 0xdb, 0x41] => Some("swapETHForExactTokens"),
        // Uniswap V3
        [0xc0, 0x4b, 0x8d, 0x59] => Some("exactInput"),
        [0xdb, 0x3e, 0x21, 0x98] => Some("exactInputSingle"),
        [0xac, 0x96, 0x50, 0xd8] | [0x1f, 0x0e, 0x74, 0x08] => Some("multicall"),
        // WETH
        [0xd0, 0xe3, 0x0d, 0xb0] => Some("deposit"),
        [0x2e, 0x1a, 0x7d, 0x4d] => Some("withdraw"),
        // ENS
        [0x3b, 0x3b, 0x57, 0xde] => Some("setAddr"),
        [0xc4, 0x7f, 0x00, 0x27] => Some("setName"),
        _ => None,
    }
}

/// Format U256 with decimals for display
pub fn format_u256_decimals(value: U256, decimals: u8) -> String {
    if value == U256::ZERO {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder == U256::ZERO {
        format!("{whole}")
    } else {
        let frac_str = format!("{remainder}");
        let padded = format!("{:0>width$}", frac_str, width = decimals as usize);
        let trimmed = padded.trim_end_matches('0');
        if trimmed.is_empty() {
            format!("{whole}")
        } else {
            format!("{whole}.{trimmed}")
        }
    }
}

/// Shorten a 0x-prefixed hex string to `0x1234…abcd`
pub fn shorten_hex(s: &str) -> String {
    if s.len() <= 14 {
        return s.to_string();
    }
    format!("{}…{}", &s[..6], &s[s.len() - 4..])
}
