// src/config.rs
use std::time::Duration;

use ethers::types::{Address, U256};

use crate::error::{Result, SmartWalletError};

pub const ENTRY_POINT_ADDRESS: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
pub const KERNEL_FACTORY_ADDRESS: &str = "0xf7d5E0c8bDC24807c8793507a2aF586514f4c46e";
pub const BATCH_ACTIONS_EXECUTOR: &str = "0xaEA978bAa9357C7d2B3B2D243621B94ce3d5793F";
pub const ECDSA_VALIDATOR_ADDRESS: &str = "0x180D6465F921C7E0DEA0040107D342c87455fFF5";
pub const BASE_API_URL: &str = "https://api.bastionwallet.io";

/// 2030-01-01T00:00:00Z
pub const EXECUTION_VALID_UNTIL: u64 = 1_893_456_000;

/// Caller-supplied options for one wallet session.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Hex private key of the owner. Optional when the gateway carries its own signer.
    pub private_key: Option<String>,
    pub rpc_url: String,
    pub chain_id: u64,
    pub api_key: String,
    /// Pay gas in this ERC-20 instead of having it sponsored.
    pub gas_token: Option<Address>,
    pub no_sponsorship: bool,
    pub salt: U256,
}

impl Options {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64, api_key: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn gas_token(mut self, token: Address) -> Self {
        self.gas_token = Some(token);
        self
    }

    pub fn no_sponsorship(mut self, no_sponsorship: bool) -> Self {
        self.no_sponsorship = no_sponsorship;
        self
    }

    pub fn salt(mut self, salt: impl Into<U256>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn require_private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SmartWalletError::Validation("owner private key is required".to_string()))
    }

    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.trim().is_empty() {
            return Err(SmartWalletError::Validation("API key is required".to_string()));
        }
        Ok(&self.api_key)
    }
}

/// Contract addresses and service endpoint the wallet talks to.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub entry_point: Address,
    pub factory: Address,
    pub batch_executor: Address,
    pub validator: Address,
    pub api_base_url: String,
    pub execution_valid_until: u64,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            entry_point: parse_address(ENTRY_POINT_ADDRESS),
            factory: parse_address(KERNEL_FACTORY_ADDRESS),
            batch_executor: parse_address(BATCH_ACTIONS_EXECUTOR),
            validator: parse_address(ECDSA_VALIDATOR_ADDRESS),
            api_base_url: BASE_API_URL.to_string(),
            execution_valid_until: EXECUTION_VALID_UNTIL,
        }
    }
}

impl Deployment {
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

// Only called on the compile-time constants above.
fn parse_address(s: &str) -> Address {
    s.parse().unwrap_or_default()
}

/// How long and how often to poll for a receipt or a deployment.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}
