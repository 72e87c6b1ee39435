// src/rpc.rs
use ethers::types::{Address, BlockNumber, Bytes, H256, U256};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde::{Deserialize, Serialize};

use crate::types::BlockInfo;

/// Minimal `eth_call` / `eth_estimateGas` request object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

// Read-only Ethereum JSON-RPC surface used by the split-client gateway.
#[rpc(client, namespace = "eth")]
pub trait EthApi {
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U256>;

    #[method(name = "getCode")]
    async fn get_code(&self, address: Address, block: BlockNumber) -> RpcResult<Bytes>;

    #[method(name = "gasPrice")]
    async fn gas_price(&self) -> RpcResult<U256>;

    #[method(name = "getBlockByNumber")]
    async fn block_by_number(&self, block: BlockNumber, full: bool) -> RpcResult<Option<BlockInfo>>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, address: Address, block: BlockNumber) -> RpcResult<U256>;

    #[method(name = "call")]
    async fn call(&self, request: CallRequest, block: BlockNumber) -> RpcResult<Bytes>;

    #[method(name = "getTransactionCount")]
    async fn transaction_count(&self, address: Address, block: BlockNumber) -> RpcResult<U256>;

    #[method(name = "estimateGas")]
    async fn estimate_gas(&self, request: CallRequest) -> RpcResult<U256>;

    #[method(name = "sendRawTransaction")]
    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<H256>;
}
