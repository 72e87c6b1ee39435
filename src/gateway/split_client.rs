// src/gateway/split_client.rs
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, Signature, TransactionRequest, H256, U256};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::debug;

use super::{ChainGateway, GatewayError};
use crate::config::Options;
use crate::error::{Result as WalletResult, SmartWalletError};
use crate::rpc::{CallRequest, EthApiClient};
use crate::types::BlockInfo;

/// Split backend: a read-only JSON-RPC client for chain state plus a local
/// wallet that signs and builds raw transactions.
#[derive(Debug, Clone)]
pub struct SplitClientGateway {
    public: HttpClient,
    wallet: LocalWallet,
}

impl SplitClientGateway {
    pub fn new(public: HttpClient, wallet: LocalWallet) -> Self {
        Self { public, wallet }
    }

    pub fn connect(options: &Options) -> WalletResult<Self> {
        let public = HttpClientBuilder::default()
            .build(&options.rpc_url)
            .map_err(|e| SmartWalletError::Validation(format!("invalid RPC URL: {e}")))?;
        let wallet = options
            .require_private_key()?
            .parse::<LocalWallet>()
            .map_err(|e| SmartWalletError::Validation(format!("invalid private key: {e}")))?
            .with_chain_id(options.chain_id);
        Ok(Self::new(public, wallet))
    }

    fn rpc_err(e: impl std::fmt::Display) -> GatewayError {
        GatewayError::Rpc(e.to_string())
    }
}

#[async_trait]
impl ChainGateway for SplitClientGateway {
    fn owner(&self) -> Address {
        self.wallet.address()
    }

    async fn chain_id(&self) -> Result<u64, GatewayError> {
        let id = self.public.chain_id().await.map_err(Self::rpc_err)?;
        Ok(id.as_u64())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, GatewayError> {
        self.public
            .get_code(address, BlockNumber::Latest)
            .await
            .map_err(Self::rpc_err)
    }

    async fn get_gas_price(&self) -> Result<U256, GatewayError> {
        self.public.gas_price().await.map_err(Self::rpc_err)
    }

    async fn get_block(&self) -> Result<BlockInfo, GatewayError> {
        self.public
            .block_by_number(BlockNumber::Latest, false)
            .await
            .map_err(Self::rpc_err)?
            .ok_or(GatewayError::MissingBlock)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, GatewayError> {
        self.public
            .get_balance(address, BlockNumber::Latest)
            .await
            .map_err(Self::rpc_err)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
        let request = CallRequest {
            from: None,
            to,
            data,
        };
        self.public
            .call(request, BlockNumber::Latest)
            .await
            .map_err(Self::rpc_err)
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, GatewayError> {
        let from = self.wallet.address();
        let nonce = self
            .public
            .transaction_count(from, BlockNumber::Pending)
            .await
            .map_err(Self::rpc_err)?;
        let gas = self
            .public
            .estimate_gas(CallRequest {
                from: Some(from),
                to,
                data: data.clone(),
            })
            .await
            .map_err(Self::rpc_err)?;
        let gas_price = self.public.gas_price().await.map_err(Self::rpc_err)?;

        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(to)
            .data(data)
            .nonce(nonce)
            .gas(gas)
            .gas_price(gas_price)
            .chain_id(self.wallet.chain_id())
            .into();
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| GatewayError::Signer(e.to_string()))?;

        let hash = self
            .public
            .send_raw_transaction(tx.rlp_signed(&signature))
            .await
            .map_err(Self::rpc_err)?;
        debug!("Broadcast owner transaction {:?} (nonce {})", hash, nonce);
        Ok(hash)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, GatewayError> {
        self.wallet
            .sign_message(message)
            .await
            .map_err(|e| GatewayError::Signer(e.to_string()))
    }
}
