use crate::client::{ChainClient, NameService};
use crate::collector::collect;
use crate::resolver::LabelCache;
use crate::route::Direction;
use crate::search::{decide_action, execute, Action, PageRequest, SearchController, SearchError};
use alloy::primitives::{Address, TxHash};
use tracing::debug;

/// Ticket for one in-flight page fetch
#[derive(Debug, Clone)]
pub struct Navigation {
    generation: u64,
    request: PageRequest,
    action: Action,
    prev: Option<SearchController>,
    page_size: usize,
}

impl Navigation {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    pub async fn run(&self, client: &dyn ChainClient) -> Result<SearchController, SearchError> {
        execute(
            client,
            self.prev.as_ref(),
            &self.request,
            self.action,
            self.page_size,
        )
        .await
    }
}

/// Controller and labels of one address view. Only the most recently issued
/// [`Navigation`] is ever applied.
pub struct AddressView {
    address: Address,
    page_size: usize,
    controller: Option<SearchController>,
    labels: LabelCache,
    generation: u64,
}

impl AddressView {
    pub fn new(address: Address, page_size: usize, labels: LabelCache) -> Self {
        Self {
            address,
            page_size,
            controller: None,
            labels,
            generation: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn controller(&self) -> Option<&SearchController> {
        self.controller.as_ref()
    }

    pub fn labels(&self) -> &LabelCache {
        &self.labels
    }

    /// Decide what the route calls for and issue a ticket for it. Any ticket
    /// issued earlier becomes stale.
    pub fn begin(&mut self, direction: Option<Direction>, cursor: Option<TxHash>) -> Navigation {
        let request = PageRequest {
            address: self.address,
            direction,
            cursor,
        };
        let action = decide_action(self.controller.as_ref(), &request);
        self.issue(request, action)
    }

    fn issue(&mut self, request: PageRequest, action: Action) -> Navigation {
        self.generation += 1;
        Navigation {
            generation: self.generation,
            request,
            action,
            prev: self.controller.clone(),
            page_size: self.page_size,
        }
    }

    /// Install a fetched controller. Returns false and drops it when a newer
    /// ticket exists or it belongs to another address.
    pub fn apply(&mut self, navigation: &Navigation, controller: SearchController) -> bool {
        if navigation.generation != self.generation || controller.address() != self.address {
            debug!(
                generation = navigation.generation,
                current = self.generation,
                "dropping stale page"
            );
            return false;
        }
        self.controller = Some(controller);
        true
    }

    /// Fetch the labels of every address on the current page not known yet
    pub async fn resolve_labels(&mut self, names: &dyn NameService) {
        let addresses = collect(self.controller.as_ref().map(|c| c.page()));
        self.labels.resolve(names, &addresses).await;
    }

    /// Begin, run and apply a navigation, then resolve the new page's labels.
    /// On failure the previous page stays in place.
    pub async fn navigate(
        &mut self,
        client: &dyn ChainClient,
        names: &dyn NameService,
        direction: Option<Direction>,
        cursor: Option<TxHash>,
    ) -> Result<&SearchController, SearchError> {
        let navigation = self.begin(direction, cursor);
        self.finish(client, names, navigation).await
    }

    /// Reload the first page if it is the one on screen, e.g. after a new
    /// block. Returns whether a reload happened.
    pub async fn refresh(
        &mut self,
        client: &dyn ChainClient,
        names: &dyn NameService,
    ) -> Result<bool, SearchError> {
        if !self.controller.as_ref().is_some_and(|c| c.is_first()) {
            return Ok(false);
        }
        let request = PageRequest {
            address: self.address,
            direction: Some(Direction::First),
            cursor: None,
        };
        let navigation = self.issue(request, Action::FirstPage);
        self.finish(client, names, navigation).await?;
        Ok(true)
    }

    async fn finish(
        &mut self,
        client: &dyn ChainClient,
        names: &dyn NameService,
        navigation: Navigation,
    ) -> Result<&SearchController, SearchError> {
        let controller = navigation.run(client).await?;
        self.apply(&navigation, controller);
        self.resolve_labels(names).await;
        self.controller
            .as_ref()
            .ok_or(SearchError::NotLoaded(self.address))
    }
}
