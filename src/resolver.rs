use crate::client::NameService;
use alloy::primitives::Address;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

pub const DEFAULT_RESOLVER_CONCURRENCY: usize = 8;

/// Display label of an address. `NoLabel` is cached like a name so the
/// address is not looked up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Name(String),
    NoLabel,
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name),
            Label::NoLabel => None,
        }
    }
}

pub type ResolvedAddresses = HashMap<Address, Label>;

/// Memoized address labels for the pages of one address view. An optional
/// capacity limit evicts the oldest insertions first.
#[derive(Debug, Clone)]
pub struct LabelCache {
    resolved: ResolvedAddresses,
    /// Insertion order, oldest first
    order: VecDeque<Address>,
    capacity: Option<usize>,
    concurrency: usize,
}

impl Default for LabelCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVER_CONCURRENCY)
    }
}

impl LabelCache {
    pub fn new(concurrency: usize) -> Self {
        Self {
            resolved: HashMap::new(),
            order: VecDeque::new(),
            capacity: None,
            concurrency: concurrency.max(1),
        }
    }

    /// Bound the number of cached labels. The addresses of the batch being
    /// resolved are never evicted by it, so one page referencing more
    /// addresses than `capacity` keeps all of its labels.
    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self.evict(&BTreeSet::new());
        self
    }

    pub fn resolved(&self) -> &ResolvedAddresses {
        &self.resolved
    }

    pub fn get(&self, address: &Address) -> Option<&Label> {
        self.resolved.get(address)
    }

    /// Resolved name, if the address has one
    pub fn name(&self, address: &Address) -> Option<&str> {
        self.get(address).and_then(Label::name)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Addresses of `addresses` that have no entry yet
    pub fn missing(&self, addresses: &BTreeSet<Address>) -> Vec<Address> {
        addresses
            .iter()
            .filter(|a| !self.resolved.contains_key(*a))
            .copied()
            .collect()
    }

    /// Look up every address not cached yet, concurrently, and merge the
    /// outcome. A failed lookup only marks its own address as `NoLabel`.
    pub async fn resolve(
        &mut self,
        names: &dyn NameService,
        addresses: &BTreeSet<Address>,
    ) -> &ResolvedAddresses {
        let missing = self.missing(addresses);
        if missing.is_empty() {
            return &self.resolved;
        }

        let outcome = lookup_all(names, missing, self.concurrency).await;
        self.insert_new(outcome);
        self.evict(addresses);
        &self.resolved
    }

    /// Map union; entries already present win
    pub fn merge(&mut self, labels: impl IntoIterator<Item = (Address, Label)>) {
        self.insert_new(labels);
        self.evict(&BTreeSet::new());
    }

    fn insert_new(&mut self, labels: impl IntoIterator<Item = (Address, Label)>) {
        for (address, label) in labels {
            if self.resolved.contains_key(&address) {
                continue;
            }
            self.resolved.insert(address, label);
            self.order.push_back(address);
        }
    }

    /// Drop the oldest entries outside `pinned` until within capacity
    fn evict(&mut self, pinned: &BTreeSet<Address>) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let mut kept = Vec::new();
        while self.resolved.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if pinned.contains(&oldest) {
                kept.push(oldest);
            } else {
                self.resolved.remove(&oldest);
            }
        }
        for address in kept.into_iter().rev() {
            self.order.push_front(address);
        }
    }
}

/// Concurrent reverse lookups; the result order is completion order
pub async fn lookup_all(
    names: &dyn NameService,
    addresses: Vec<Address>,
    concurrency: usize,
) -> Vec<(Address, Label)> {
    debug!(count = addresses.len(), "resolving address labels");
    stream::iter(addresses)
        .map(|address| async move {
            let label = match names.lookup_address(address).await {
                Ok(Some(name)) => Label::Name(name),
                Ok(None) => Label::NoLabel,
                Err(e) => {
                    debug!(%address, "label lookup failed: {e:#}");
                    Label::NoLabel
                }
            };
            (address, label)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
