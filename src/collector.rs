use crate::rpc::TransactionSummary;
use alloy::primitives::Address;
use std::collections::BTreeSet;

/// Every distinct address a page references: senders, recipients, created
/// contracts and both sides plus the token of each token transfer.
pub fn collect(page: Option<&[TransactionSummary]>) -> BTreeSet<Address> {
    let mut addresses = BTreeSet::new();

    for tx in page.unwrap_or_default() {
        addresses.insert(tx.from);
        addresses.extend(tx.to);
        addresses.extend(tx.contract_created);
        for transfer in &tx.token_transfers {
            addresses.insert(transfer.token);
            addresses.insert(transfer.from);
            addresses.insert(transfer.to);
        }
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::TokenTransfer;
    use alloy::primitives::{B256, U256};

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn test_collect_unset_page_is_empty() {
        assert!(collect(None).is_empty());
        assert!(collect(Some(&[][..])).is_empty());
    }

    #[test]
    fn test_collect_dedups_across_entries() {
        let mut a = TransactionSummary::new(B256::repeat_byte(1), 10, 0, addr(1));
        a.to = Some(addr(2));
        let mut b = TransactionSummary::new(B256::repeat_byte(2), 9, 0, addr(2));
        b.to = Some(addr(1));

        let collected = collect(Some(&[a, b][..]));
        assert_eq!(collected.into_iter().collect::<Vec<_>>(), vec![addr(1), addr(2)]);
    }

    #[test]
    fn test_collect_includes_creations_and_transfers() {
        let mut creation = TransactionSummary::new(B256::repeat_byte(1), 10, 0, addr(1));
        creation.contract_created = Some(addr(3));
        creation.token_transfers.push(TokenTransfer {
            token: addr(4),
            from: addr(3),
            to: addr(5),
            value: U256::from(1u64),
        });

        let collected = collect(Some(&[creation][..]));
        assert_eq!(
            collected.into_iter().collect::<Vec<_>>(),
            vec![addr(1), addr(3), addr(4), addr(5)]
        );
    }
}
