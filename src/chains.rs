// src/chains.rs
use crate::error::{Result, SmartWalletError};

/// A chain the relay service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    pub id: u64,
    pub name: &'static str,
    /// Value-bearing network: smart accounts are only deployed on an explicit
    /// `create_account`, never as a side effect of sending.
    pub mainnet: bool,
}

const SUPPORTED_CHAINS: &[SupportedChain] = &[
    SupportedChain { id: 1, name: "ethereum", mainnet: true },
    SupportedChain { id: 10, name: "optimism", mainnet: true },
    SupportedChain { id: 137, name: "polygon", mainnet: true },
    SupportedChain { id: 8453, name: "base", mainnet: true },
    SupportedChain { id: 42161, name: "arbitrum", mainnet: true },
    SupportedChain { id: 420, name: "optimism-goerli", mainnet: false },
    SupportedChain { id: 59140, name: "linea-testnet", mainnet: false },
    SupportedChain { id: 80001, name: "mumbai", mainnet: false },
    SupportedChain { id: 84531, name: "base-goerli", mainnet: false },
    SupportedChain { id: 421613, name: "arbitrum-goerli", mainnet: false },
    SupportedChain { id: 534353, name: "scroll-testnet", mainnet: false },
    SupportedChain { id: 11155111, name: "sepolia", mainnet: false },
];

pub fn lookup(chain_id: u64) -> Option<&'static SupportedChain> {
    SUPPORTED_CHAINS.iter().find(|chain| chain.id == chain_id)
}

pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    lookup(chain_id).map(|chain| chain.name)
}

pub fn check_chain_compatibility(chain_id: u64) -> Result<&'static SupportedChain> {
    lookup(chain_id).ok_or(SmartWalletError::UnsupportedChain(chain_id))
}

pub fn supported_chains() -> &'static [SupportedChain] {
    SUPPORTED_CHAINS
}
