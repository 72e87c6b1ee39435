// src/gateway/signer_provider.rs
use std::sync::Arc;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use tracing::debug;

use super::{ChainGateway, GatewayError};
use crate::config::Options;
use crate::types::BlockInfo;

/// Classic backend: an ethers provider with the owner wallet layered on top
/// as signing middleware.
#[derive(Debug, Clone)]
pub struct SignerProviderGateway<P: JsonRpcClient = Http> {
    client: Arc<SignerMiddleware<Provider<P>, LocalWallet>>,
}

impl SignerProviderGateway<Http> {
    pub fn connect(options: &Options) -> crate::error::Result<Self> {
        let provider = Provider::<Http>::try_from(options.rpc_url.as_str()).map_err(|e| {
            crate::error::SmartWalletError::Validation(format!("invalid RPC URL: {e}"))
        })?;
        let wallet = options
            .require_private_key()?
            .parse::<LocalWallet>()
            .map_err(|e| {
                crate::error::SmartWalletError::Validation(format!("invalid private key: {e}"))
            })?
            .with_chain_id(options.chain_id);
        Ok(Self::new(provider, wallet))
    }
}

impl<P: JsonRpcClient + 'static> SignerProviderGateway<P> {
    pub fn new(provider: Provider<P>, wallet: LocalWallet) -> Self {
        Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        }
    }

    fn provider_err(e: impl std::fmt::Display) -> GatewayError {
        GatewayError::Provider(e.to_string())
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainGateway for SignerProviderGateway<P> {
    fn owner(&self) -> Address {
        self.client.signer().address()
    }

    async fn chain_id(&self) -> Result<u64, GatewayError> {
        let id = self
            .client
            .get_chainid()
            .await
            .map_err(Self::provider_err)?;
        Ok(id.as_u64())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, GatewayError> {
        self.client
            .get_code(address, None)
            .await
            .map_err(Self::provider_err)
    }

    async fn get_gas_price(&self) -> Result<U256, GatewayError> {
        self.client.get_gas_price().await.map_err(Self::provider_err)
    }

    async fn get_block(&self) -> Result<BlockInfo, GatewayError> {
        let block = self
            .client
            .get_block(BlockNumber::Latest)
            .await
            .map_err(Self::provider_err)?
            .ok_or(GatewayError::MissingBlock)?;
        Ok(BlockInfo {
            number: block.number.unwrap_or_default(),
            timestamp: block.timestamp,
        })
    }

    async fn get_balance(&self, address: Address) -> Result<U256, GatewayError> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(Self::provider_err)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.client.call(&tx, None).await.map_err(Self::provider_err)
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, GatewayError> {
        let tx = TransactionRequest::new().to(to).data(data);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(Self::provider_err)?;
        let hash = pending.tx_hash();
        debug!("Broadcast owner transaction {:?}", hash);
        Ok(hash)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, GatewayError> {
        self.client
            .signer()
            .sign_message(message)
            .await
            .map_err(|e| GatewayError::Signer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::EthRpcResponder;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer};

    const OWNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    async fn gateway(server: &MockServer) -> SignerProviderGateway {
        let options = Options::new(server.uri(), 11155111, "key").private_key(OWNER_KEY);
        SignerProviderGateway::connect(&options).unwrap()
    }

    #[tokio::test]
    async fn reads_code_and_gas_price() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                EthRpcResponder::default()
                    .with("eth_getCode", serde_json::json!("0x6080"))
                    .with("eth_gasPrice", serde_json::json!("0x3b9aca00")),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        let code = gateway.get_code(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(code, Bytes::from(vec![0x60, 0x80]));
        let price = gateway.get_gas_price().await.unwrap();
        assert_eq!(price, U256::from(1_000_000_000u64));
    }

    #[tokio::test]
    async fn connect_without_key_is_rejected() {
        let options = Options::new("http://localhost:8545", 11155111, "key");
        let err = SignerProviderGateway::connect(&options).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn signs_with_owner_key() {
        let server = MockServer::start().await;
        let gateway = gateway(&server).await;
        let signature = gateway.sign_message(b"hello").await.unwrap();
        signature.verify(b"hello".to_vec(), gateway.owner()).unwrap();
    }
}
