// src/resolver.rs
use std::sync::Arc;

use ethers::types::{Address, U256};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::chains;
use crate::config::Deployment;
use crate::contracts;
use crate::error::{Result, SmartWalletError};
use crate::gateway::{ChainGateway, GatewayError};
use crate::types::{CreateAccountRequest, CreateAccountResponse, SmartAccountRef};

/// Counterfactual address derivation and deployment state of Kernel accounts.
#[derive(Clone)]
pub struct AddressResolver {
    gateway: Arc<dyn ChainGateway>,
    api: ApiClient,
    factory: Address,
    entry_point: Address,
}

impl AddressResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>, api: ApiClient, deployment: &Deployment) -> Self {
        Self {
            gateway,
            api,
            factory: deployment.factory,
            entry_point: deployment.entry_point,
        }
    }

    /// Asks the factory where the account for `owner`/`salt` lives. Read-only.
    pub async fn resolve(&self, account: &SmartAccountRef) -> Result<Address> {
        let data = contracts::encode_get_account_address(account.owner, account.salt);
        let ret = self
            .gateway
            .call(self.factory, data)
            .await
            .map_err(SmartWalletError::Resolution)?;
        let address = contracts::decode_account_address(&ret)
            .map_err(|e| SmartWalletError::Resolution(GatewayError::from(e)))?;
        debug!("Smart account for owner {:?}: {:?}", account.owner, address);
        Ok(address)
    }

    pub async fn is_deployed(&self, address: Address) -> Result<bool> {
        let code = self
            .gateway
            .get_code(address)
            .await
            .map_err(SmartWalletError::Resolution)?;
        Ok(!code.is_empty())
    }

    /// Mainnet-class chains never get an unsolicited deployment.
    pub fn requires_explicit_deployment(chain_id: u64) -> bool {
        chains::lookup(chain_id).map_or(true, |chain| chain.mainnet)
    }

    /// Returns whether the account exists. When it does not and the chain
    /// allows it, deployment is relayed through the service; the account is
    /// still reported as missing until the relay lands on chain.
    pub async fn ensure_deployed(&self, account: &SmartAccountRef, address: Address) -> Result<bool> {
        if self.is_deployed(address).await? {
            return Ok(true);
        }
        if Self::requires_explicit_deployment(account.chain_id) {
            warn!(
                "Smart account {:?} not deployed on chain {}; call create_account first",
                address, account.chain_id
            );
            return Ok(false);
        }
        self.relay_deployment(account).await?;
        Ok(false)
    }

    /// Fails with `AccountNotFound` unless bytecode exists at `address`.
    pub async fn require_deployed(&self, address: Address, chain_id: u64) -> Result<()> {
        if self.is_deployed(address).await? {
            Ok(())
        } else {
            Err(SmartWalletError::AccountNotFound { address, chain_id })
        }
    }

    pub async fn relay_deployment(&self, account: &SmartAccountRef) -> Result<Option<Address>> {
        let request = CreateAccountRequest {
            chain_id: account.chain_id,
            eoa: account.owner,
            salt: account.salt,
        };
        let response: CreateAccountResponse = self
            .api
            .post("/v1/transaction/create-account", &request)
            .await
            .map_err(|e| SmartWalletError::Deployment(e.to_string()))?;
        info!(
            "Relayed smart account deployment for owner {:?} on chain {}",
            account.owner, account.chain_id
        );
        Ok(response.smart_account_address)
    }

    /// Entry point nonce for key 0.
    pub async fn nonce(&self, address: Address) -> Result<U256> {
        let ret = self
            .gateway
            .call(self.entry_point, contracts::encode_get_nonce(address))
            .await
            .map_err(SmartWalletError::Resolution)?;
        contracts::decode_nonce(&ret).map_err(|e| SmartWalletError::Resolution(GatewayError::from(e)))
    }
}
