// src/gateway/mod.rs
//! Chain access behind one capability trait so the wallet logic never sees a
//! concrete client type.
use async_trait::async_trait;
use ethers::types::{Address, Bytes, Signature, H256, U256};
use thiserror::Error;

use crate::types::BlockInfo;

mod signer_provider;
mod split_client;

#[cfg(test)]
pub(crate) mod mock;

pub use signer_provider::SignerProviderGateway;
pub use split_client::SplitClientGateway;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Ethereum provider error: {0}")]
    Provider(String),

    #[error("JSON-RPC error: {0}")]
    Rpc(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Latest block unavailable")]
    MissingBlock,

    #[error("Could not decode contract return data: {0}")]
    Decode(String),
}

impl From<ethers::abi::AbiError> for GatewayError {
    fn from(err: ethers::abi::AbiError) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Everything the wallet needs from a chain: reads, one write path for direct
/// account creation, and the owner's signature.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Address of the owner key this gateway signs with.
    fn owner(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, GatewayError>;

    async fn get_code(&self, address: Address) -> Result<Bytes, GatewayError>;

    async fn get_gas_price(&self) -> Result<U256, GatewayError>;

    async fn get_block(&self) -> Result<BlockInfo, GatewayError>;

    async fn get_balance(&self, address: Address) -> Result<U256, GatewayError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError>;

    /// Sends a transaction from the owner and returns its hash once broadcast.
    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, GatewayError>;

    /// EIP-191 personal signature by the owner.
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, GatewayError>;
}
