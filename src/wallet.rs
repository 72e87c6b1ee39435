// src/wallet.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ethers::types::{Address, Bytes, Signature, H256, U256};
use futures::future::try_join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::builder::{split_batch, validate_batch, OperationBuilder};
use crate::bundler::Submitter;
use crate::chains::{self, SupportedChain};
use crate::config::{Deployment, Options, ReceiptPolling};
use crate::contracts;
use crate::error::{Result, SmartWalletError};
use crate::gateway::{ChainGateway, GatewayError};
use crate::paymaster::SponsorshipNegotiator;
use crate::permission::ExecutionPermissionGate;
use crate::pipeline::Pipeline;
use crate::poll::poll_until;
use crate::resolver::AddressResolver;
use crate::signer::OperationSigner;
use crate::types::{BasicTransaction, SmartAccountRef, SubmittedOperation};

/// One owner, one chain, one Kernel smart account.
///
/// Created by [`SmartWallet::init`], which validates the API key and chain
/// and resolves the account address once. Every chain-mutating call holds the
/// session lock, so sends from the same session never race on the nonce.
pub struct SmartWallet {
    gateway: Arc<dyn ChainGateway>,
    options: Options,
    deployment: Deployment,
    polling: ReceiptPolling,
    chain: &'static SupportedChain,
    account: SmartAccountRef,
    address: Address,
    resolver: AddressResolver,
    builder: OperationBuilder,
    gate: ExecutionPermissionGate,
    pipeline: Pipeline,
    send_lock: Mutex<()>,
    // Set once the relay has accepted a deployment request for this account.
    relay_requested: AtomicBool,
    cancel: CancellationToken,
}

impl SmartWallet {
    pub async fn init(gateway: Arc<dyn ChainGateway>, options: Options) -> Result<Self> {
        Self::init_with(gateway, options, Deployment::default(), ReceiptPolling::default()).await
    }

    pub async fn init_with(
        gateway: Arc<dyn ChainGateway>,
        options: Options,
        deployment: Deployment,
        polling: ReceiptPolling,
    ) -> Result<Self> {
        options.require_api_key()?;
        let chain = chains::check_chain_compatibility(options.chain_id)?;

        let connected = gateway.chain_id().await.map_err(SmartWalletError::Resolution)?;
        if connected != options.chain_id {
            return Err(SmartWalletError::Validation(format!(
                "RPC endpoint serves chain {connected}, expected {}",
                options.chain_id
            )));
        }

        let api = ApiClient::new(deployment.api_base_url.clone(), options.api_key.clone());
        match api.validate_key().await {
            Ok(true) => {}
            Ok(false) => return Err(SmartWalletError::InvalidApiKey),
            Err(e) if matches!(e.status(), Some(401) | Some(403)) => {
                return Err(SmartWalletError::InvalidApiKey)
            }
            Err(e) => {
                return Err(SmartWalletError::Validation(format!(
                    "could not validate API key: {e}"
                )))
            }
        }

        let account = SmartAccountRef {
            owner: gateway.owner(),
            salt: options.salt,
            chain_id: options.chain_id,
        };
        let resolver = AddressResolver::new(gateway.clone(), api.clone(), &deployment);
        let address = resolver.resolve(&account).await?;
        let exists = resolver.ensure_deployed(&account, address).await?;
        let relay_requested =
            !exists && !AddressResolver::requires_explicit_deployment(account.chain_id);

        let builder = OperationBuilder::new(gateway.clone(), resolver.clone());
        let pipeline = Pipeline::new(
            SponsorshipNegotiator::new(api.clone()),
            OperationSigner::new(gateway.clone(), deployment.entry_point, options.chain_id),
            Submitter::new(api),
        );
        let gate = ExecutionPermissionGate::new(
            gateway.clone(),
            resolver.clone(),
            builder.clone(),
            pipeline.clone(),
            deployment.clone(),
            polling,
        );

        info!(
            "Smart wallet {:?} ready on {} (deployed: {})",
            address, chain.name, exists
        );
        Ok(Self {
            gateway,
            options,
            deployment,
            polling,
            chain,
            account,
            address,
            resolver,
            builder,
            gate,
            pipeline,
            send_lock: Mutex::new(()),
            relay_requested: AtomicBool::new(relay_requested),
            cancel: CancellationToken::new(),
        })
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.account.owner
    }

    pub fn chain(&self) -> &'static SupportedChain {
        self.chain
    }

    pub fn account(&self) -> &SmartAccountRef {
        &self.account
    }

    /// Cancelling this token aborts every wait the session is doing on its
    /// own behalf (deployment, permission confirmation).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn is_deployed(&self) -> Result<bool> {
        self.resolver.is_deployed(self.address).await
    }

    pub async fn send_transaction(&self, tx: &BasicTransaction) -> Result<SubmittedOperation> {
        let _guard = self.send_lock.lock().await;
        self.await_deployment().await?;
        let op = self.builder.build_single(&self.account, self.address, tx).await?;
        self.pipeline.submit(self.account.chain_id, op, &self.options).await
    }

    /// Runs `to[i]` with `data[i]` and `value[i]` in one user operation.
    pub async fn execute_batch(
        &self,
        to: Vec<Address>,
        data: Vec<Bytes>,
        value: Vec<U256>,
    ) -> Result<SubmittedOperation> {
        validate_batch(&to, &data, &value)?;
        let _guard = self.send_lock.lock().await;
        self.await_deployment().await?;
        self.gate
            .ensure(&self.account, self.address, &self.options, &self.cancel)
            .await?;

        let op = self
            .builder
            .build_batch(&self.account, self.address, to, value, data)
            .await?;
        self.pipeline.submit(self.account.chain_id, op, &self.options).await
    }

    pub async fn execute_calls(&self, calls: &[BasicTransaction]) -> Result<SubmittedOperation> {
        let (to, value, data) = split_batch(calls);
        self.execute_batch(to, data, value).await
    }

    /// Deploys the account from the owner's own key.
    pub async fn create_account(&self) -> Result<Address> {
        let _guard = self.send_lock.lock().await;
        if self.is_deployed().await? {
            debug!("Smart account {:?} already deployed", self.address);
            return Ok(self.address);
        }

        let data = contracts::encode_create_account(self.account.owner, self.account.salt);
        let tx_hash = self
            .gateway
            .send_transaction(self.deployment.factory, data)
            .await
            .map_err(|e| SmartWalletError::Deployment(e.to_string()))?;
        info!("Sent account deployment {:?} for {:?}", tx_hash, self.address);

        self.wait_for_code().await?;
        Ok(self.address)
    }

    /// Deploys the account through the relay service, which pays for it.
    pub async fn create_account_by_dapp(&self) -> Result<Address> {
        let _guard = self.send_lock.lock().await;
        if self.is_deployed().await? {
            debug!("Smart account {:?} already deployed", self.address);
            return Ok(self.address);
        }

        self.request_relay().await?;
        self.wait_for_code().await?;
        Ok(self.address)
    }

    /// Makes sure the account has code before an operation is built for it.
    /// Gated chains fail with `AccountNotFound`; elsewhere the relay is asked
    /// at most once per session and the call waits for the code to land.
    async fn await_deployment(&self) -> Result<()> {
        if self.is_deployed().await? {
            return Ok(());
        }
        if AddressResolver::requires_explicit_deployment(self.account.chain_id) {
            return Err(SmartWalletError::AccountNotFound {
                address: self.address,
                chain_id: self.account.chain_id,
            });
        }
        self.request_relay().await?;
        self.wait_for_code().await
    }

    async fn request_relay(&self) -> Result<()> {
        if self.relay_requested.load(Ordering::SeqCst) {
            debug!("Deployment of {:?} already requested from the relay", self.address);
            return Ok(());
        }
        if let Some(relayed) = self.resolver.relay_deployment(&self.account).await? {
            if relayed != self.address {
                return Err(SmartWalletError::Deployment(format!(
                    "relay deployed {relayed:?}, expected {:?}",
                    self.address
                )));
            }
        }
        self.relay_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_code(&self) -> Result<()> {
        let deployed = poll_until(self.polling, &self.cancel, move || async move {
            Ok(self.is_deployed().await?.then_some(()))
        })
        .await?;
        match deployed {
            Some(()) => {
                info!("Smart account {:?} deployed", self.address);
                Ok(())
            }
            None => {
                warn!("Smart account {:?} has no code after {:?}", self.address, self.polling.timeout);
                Err(SmartWalletError::Deployment(format!(
                    "no code at {:?} after {:?}",
                    self.address, self.polling.timeout
                )))
            }
        }
    }

    /// EIP-191 signature by the owner key.
    pub async fn sign_message(&self, message: impl AsRef<[u8]>) -> Result<Signature> {
        self.gateway
            .sign_message(message.as_ref())
            .await
            .map_err(SmartWalletError::Signing)
    }

    pub async fn get_transaction_hash(&self, user_op_hash: H256) -> Result<H256> {
        self.pipeline
            .submitter()
            .transaction_hash(self.account.chain_id, user_op_hash)
            .await
    }

    pub async fn wait_for_receipt(&self, user_op_hash: H256, cancel: &CancellationToken) -> Result<H256> {
        self.pipeline
            .submitter()
            .wait_for_receipt(self.account.chain_id, user_op_hash, self.polling, cancel)
            .await
    }

    pub async fn native_balance(&self) -> Result<U256> {
        self.gateway
            .get_balance(self.address)
            .await
            .map_err(SmartWalletError::Resolution)
    }

    /// ERC-20 balances of the smart account, in the order of `tokens`.
    pub async fn token_balances(&self, tokens: &[Address]) -> Result<Vec<(Address, U256)>> {
        let lookups = tokens.iter().map(|&token| async move {
            let ret = self
                .gateway
                .call(token, contracts::encode_balance_of(self.address))
                .await
                .map_err(SmartWalletError::Resolution)?;
            let balance = contracts::decode_balance(&ret)
                .map_err(|e| SmartWalletError::Resolution(GatewayError::from(e)))?;
            Ok::<_, SmartWalletError>((token, balance))
        });
        try_join_all(lookups).await
    }
}
