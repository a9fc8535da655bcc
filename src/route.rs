use crate::client::NameService;
use alloy::primitives::{Address, TxHash};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("\"{0}\" is not an ETH address or ENS name")]
    InvalidIdentifier(String),
    #[error("ENS name \"{0}\" does not resolve to an address")]
    NameNotResolved(String),
    #[error("unknown page direction \"{0}\" (expected first, prev, next or last)")]
    InvalidDirection(String),
    #[error("invalid transaction hash in cursor: {0}")]
    InvalidCursor(String),
    #[error("failed to resolve ENS name \"{name}\"")]
    Lookup {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Page direction segment of the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    First,
    Prev,
    Next,
    Last,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::First => "first",
            Direction::Prev => "prev",
            Direction::Next => "next",
            Direction::Last => "last",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Direction::First),
            "prev" => Ok(Direction::Prev),
            "next" => Ok(Direction::Next),
            "last" => Ok(Direction::Last),
            _ => Err(RouteError::InvalidDirection(s.to_string())),
        }
    }
}

/// What the `address-or-name` segment looks like before any lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressQuery {
    /// 40 hex chars with optional 0x; all lower, all upper or checksummed
    Address(Address),
    /// Dotted name, lowercased
    EnsName(String),
    Invalid(String),
}

impl AddressQuery {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        if hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            let prefixed = format!("0x{hex_part}");
            // Mixed case must carry a valid EIP-55 checksum
            let mixed_case = hex_part.chars().any(|c| c.is_ascii_lowercase())
                && hex_part.chars().any(|c| c.is_ascii_uppercase());
            let parsed = if mixed_case {
                Address::parse_checksummed(&prefixed, None).ok()
            } else {
                prefixed.parse::<Address>().ok()
            };
            return parsed.map_or_else(|| Self::Invalid(trimmed.to_string()), Self::Address);
        }

        if trimmed.starts_with("0x") {
            return Self::Invalid(trimmed.to_string());
        }

        if Self::looks_like_ens(trimmed) {
            return Self::EnsName(trimmed.to_lowercase());
        }

        Self::Invalid(trimmed.to_string())
    }

    /// A name has at least two non-empty labels of alphanumerics and hyphens
    fn looks_like_ens(s: &str) -> bool {
        s.contains('.')
            && s.split('.').all(|label| !label.is_empty())
            && s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    }
}

/// Parsed route of one address view request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub address_or_name: String,
    pub direction: Option<Direction>,
    pub cursor: Option<TxHash>,
}

impl RouteParams {
    pub fn parse(
        address_or_name: &str,
        direction: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Self, RouteError> {
        let direction = direction
            .filter(|d| !d.trim().is_empty())
            .map(str::parse)
            .transpose()?;
        let cursor = cursor
            .filter(|h| !h.trim().is_empty())
            .map(|h| {
                h.trim()
                    .parse::<TxHash>()
                    .map_err(|_| RouteError::InvalidCursor(h.to_string()))
            })
            .transpose()?;

        Ok(Self {
            address_or_name: address_or_name.trim().to_string(),
            direction,
            cursor,
        })
    }
}

/// The address a route points at, after canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub address: Address,
    /// Set when the route named the address through ENS
    pub ens_name: Option<String>,
    /// Location the caller must replace the current one with, when the route
    /// carried a valid but non-checksummed address
    pub redirect: Option<String>,
}

/// Resolve the `address-or-name` segment to a checksummed address.
/// Invalid input fails without touching the name service.
pub async fn resolve_target(
    names: &dyn NameService,
    route: &RouteParams,
) -> Result<ResolvedTarget, RouteError> {
    match AddressQuery::parse(&route.address_or_name) {
        AddressQuery::Address(address) => {
            let checksummed = address.to_checksum(None);
            let redirect = (checksummed != route.address_or_name)
                .then(|| location(address, route.direction, route.cursor));
            Ok(ResolvedTarget {
                address,
                ens_name: None,
                redirect,
            })
        }
        AddressQuery::EnsName(name) => {
            debug!(%name, "resolving ENS name");
            let resolved = names
                .resolve_name(&name)
                .await
                .map_err(|source| RouteError::Lookup {
                    name: name.clone(),
                    source,
                })?;
            match resolved {
                Some(address) => Ok(ResolvedTarget {
                    address,
                    ens_name: Some(name),
                    redirect: None,
                }),
                None => Err(RouteError::NameNotResolved(name)),
            }
        }
        AddressQuery::Invalid(input) => Err(RouteError::InvalidIdentifier(input)),
    }
}

/// `/address/<checksummed>[/<direction>][?h=<hash>]`
pub fn location(address: Address, direction: Option<Direction>, cursor: Option<TxHash>) -> String {
    let mut path = format!("/address/{}", address.to_checksum(None));
    if let Some(direction) = direction {
        path.push('/');
        path.push_str(direction.as_str());
    }
    if let Some(hash) = cursor {
        path.push_str(&format!("?h={hash:?}"));
    }
    path
}
