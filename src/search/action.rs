use super::{SearchController, SearchError};
use crate::client::ChainClient;
use crate::route::Direction;
use alloy::primitives::{Address, TxHash};
use tracing::{debug, warn};

/// Which fetch a route change calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The previous controller already shows the requested page
    Keep,
    FirstPage,
    LastPage,
    MiddlePage { forward: bool },
    PrevPage,
    NextPage,
}

/// The part of a route the controller cares about, after name resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub address: Address,
    pub direction: Option<Direction>,
    pub cursor: Option<TxHash>,
}

/// Decide the fetch for `request` given the controller currently shown.
///
/// Stepping from a controller is only possible when it is bound to the same
/// address and the cursor is the matching edge of its page; anything else is
/// treated as a deep link. Stepping past a boundary is a no-op.
pub fn decide_action(prev: Option<&SearchController>, request: &PageRequest) -> Action {
    let bound = prev.filter(|c| c.address() == request.address);

    match (request.direction, request.cursor) {
        (None | Some(Direction::First), _) => match bound {
            Some(c) if c.is_first() => Action::Keep,
            _ => Action::FirstPage,
        },
        (Some(Direction::Last), _) => match bound {
            Some(c) if c.is_last() => Action::Keep,
            _ => Action::LastPage,
        },
        (Some(Direction::Prev | Direction::Next), None) => Action::FirstPage,
        (Some(Direction::Prev), Some(cursor)) => match bound {
            Some(c) if c.prev_cursor() == Some(cursor) && c.is_first() => Action::Keep,
            Some(c) if c.prev_cursor() == Some(cursor) => Action::PrevPage,
            _ => Action::MiddlePage { forward: false },
        },
        (Some(Direction::Next), Some(cursor)) => match bound {
            Some(c) if c.next_cursor() == Some(cursor) && c.is_last() => Action::Keep,
            Some(c) if c.next_cursor() == Some(cursor) => Action::NextPage,
            _ => Action::MiddlePage { forward: true },
        },
    }
}

/// Run an action. A deep link whose cursor is unknown falls back to the first
/// page; every other failure is returned and `prev` stays valid.
pub async fn execute(
    client: &dyn ChainClient,
    prev: Option<&SearchController>,
    request: &PageRequest,
    action: Action,
    page_size: usize,
) -> Result<SearchController, SearchError> {
    let address = request.address;
    debug!(%address, ?action, "executing page action");

    let bound = |prev: Option<&SearchController>| match prev {
        Some(c) if c.address() == address => Ok(c.clone()),
        Some(c) => Err(SearchError::AddressMismatch {
            bound: c.address(),
            requested: address,
        }),
        None => Err(SearchError::NotLoaded(address)),
    };

    match action {
        Action::Keep => bound(prev),
        Action::FirstPage => SearchController::first_page(client, address, page_size).await,
        Action::LastPage => SearchController::last_page(client, address, page_size).await,
        Action::MiddlePage { forward } => {
            let Some(cursor) = request.cursor else {
                return SearchController::first_page(client, address, page_size).await;
            };
            match SearchController::middle_page(client, address, cursor, forward, page_size).await
            {
                Err(SearchError::CursorNotFound(hash)) => {
                    warn!(%address, ?hash, "stale cursor, falling back to first page");
                    SearchController::first_page(client, address, page_size).await
                }
                other => other,
            }
        }
        Action::PrevPage | Action::NextPage => {
            let controller = bound(prev)?;
            let cursor = request.cursor.ok_or(SearchError::MissingCursor)?;
            if action == Action::PrevPage {
                controller.prev_page(client, cursor).await
            } else {
                controller.next_page(client, cursor).await
            }
        }
    }
}
