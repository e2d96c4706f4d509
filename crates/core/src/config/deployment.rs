//! Deployment settings read from the environment.
//!
//! Endpoints, contract addresses and the signing key. Values are only
//! checked for presence and, for addresses, syntax.

use alloy::primitives::Address;
use anyhow::Result;

/// Environment variable names.
pub mod env {
    pub const RPC_URL: &str = "RPC_URL";
    pub const SUBGRAPH_URL: &str = "SUBGRAPH_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const ROUTER_ADDRESS: &str = "ROUTER_ADDRESS";
    pub const FACTORY_ADDRESS: &str = "FACTORY_ADDRESS";
    pub const ADMIN_ADDRESS: &str = "ADMIN_ADDRESS";
}

/// Deployment configuration loaded from environment.
#[derive(Clone)]
pub struct Deployment {
    /// Chain RPC endpoint
    pub rpc_url: String,
    /// Subgraph GraphQL endpoint
    pub subgraph_url: String,
    /// Signing key of the liquidator
    pub private_key: String,
    /// Router used for approvals and liquidations
    pub router: Address,
    /// Pool factory (informational)
    pub factory: Option<Address>,
    /// Receiver of seized collateral; the signer when unset
    pub admin: Option<Address>,
}

impl Deployment {
    /// Load from process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Missing env var: {}", name))
        };

        let parse_address = |name: &str, value: String| -> Result<Address> {
            value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid address for {}: {}", name, e))
        };

        let optional_address = |name: &str| -> Result<Option<Address>> {
            match get_env(name) {
                Ok(value) => parse_address(name, value).map(Some),
                Err(_) => Ok(None),
            }
        };

        Ok(Self {
            rpc_url: get_env(env::RPC_URL)?,
            subgraph_url: get_env(env::SUBGRAPH_URL)?,
            private_key: get_env(env::PRIVATE_KEY)?,
            router: parse_address(env::ROUTER_ADDRESS, get_env(env::ROUTER_ADDRESS)?)?,
            factory: optional_address(env::FACTORY_ADDRESS)?,
            admin: optional_address(env::ADMIN_ADDRESS)?,
        })
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("rpc_url", &self.rpc_url)
            .field("subgraph_url", &self.subgraph_url)
            .field("router", &self.router)
            .field("factory", &self.factory)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}
