//! atex - Address Transaction Explorer
//!
//! Pages through an address's transaction history on an EVM node that serves
//! the Otterscan `ots_` index, and labels the addresses on each page with
//! their ENS names.

pub mod blocks;
pub mod client;
pub mod collector;
pub mod config;
pub mod resolver;
pub mod route;
pub mod rpc;
pub mod search;
pub mod view;

// Re-export commonly used types
pub use client::{ChainClient, ClientError, NameService};
pub use config::Config;
pub use resolver::{Label, LabelCache, ResolvedAddresses};
pub use route::{Direction, RouteError, RouteParams};
pub use search::{Action, SearchController, SearchError};
pub use view::AddressView;
