// src/builder.rs
use std::sync::Arc;

use ethers::types::{Address, Bytes, U256};
use tracing::{debug, info};

use crate::contracts;
use crate::error::{Result, SmartWalletError};
use crate::gateway::ChainGateway;
use crate::resolver::AddressResolver;
use crate::signer::dummy_signature;
use crate::types::{BasicTransaction, SmartAccountRef, UserOperation};

/// Static gas limits; the paymaster may raise or lower them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasLimits {
    pub call_gas_limit: u64,
    pub verification_gas_limit: u64,
    pub pre_verification_gas: u64,
}

impl GasLimits {
    pub const SINGLE: GasLimits = GasLimits {
        call_gas_limit: 250_000,
        verification_gas_limit: 600_000,
        pre_verification_gas: 200_000,
    };

    pub const BATCH: GasLimits = GasLimits {
        call_gas_limit: 150_000,
        verification_gas_limit: 500_000,
        pre_verification_gas: 100_000,
    };
}

/// Parallel call lists are only meaningful when they line up one to one.
pub fn validate_batch(to: &[Address], data: &[Bytes], value: &[U256]) -> Result<()> {
    if to.is_empty() {
        return Err(SmartWalletError::Validation("batch has no calls".to_string()));
    }
    if to.len() != data.len() || to.len() != value.len() {
        return Err(SmartWalletError::Validation(format!(
            "batch length mismatch: {} targets, {} payloads, {} values",
            to.len(),
            data.len(),
            value.len()
        )));
    }
    Ok(())
}

/// Splits calls into the parallel lists `executeBatch` takes.
pub fn split_batch(calls: &[BasicTransaction]) -> (Vec<Address>, Vec<U256>, Vec<Bytes>) {
    let mut to = Vec::with_capacity(calls.len());
    let mut value = Vec::with_capacity(calls.len());
    let mut data = Vec::with_capacity(calls.len());
    for call in calls {
        to.push(call.to);
        value.push(call.value);
        data.push(call.data.clone());
    }
    (to, value, data)
}

/// Assembles unsigned user operations for an existing (or relayed) Kernel account.
#[derive(Clone)]
pub struct OperationBuilder {
    gateway: Arc<dyn ChainGateway>,
    resolver: AddressResolver,
}

impl OperationBuilder {
    pub fn new(gateway: Arc<dyn ChainGateway>, resolver: AddressResolver) -> Self {
        Self { gateway, resolver }
    }

    pub async fn build_single(
        &self,
        account: &SmartAccountRef,
        sender: Address,
        tx: &BasicTransaction,
    ) -> Result<UserOperation> {
        let call_data = contracts::encode_execute(tx.to, tx.value, tx.data.clone());
        debug!("Building single call to {:?} from {:?}", tx.to, sender);
        self.build(account, sender, call_data, GasLimits::SINGLE).await
    }

    pub async fn build_batch(
        &self,
        account: &SmartAccountRef,
        sender: Address,
        to: Vec<Address>,
        value: Vec<U256>,
        data: Vec<Bytes>,
    ) -> Result<UserOperation> {
        validate_batch(&to, &data, &value)?;
        debug!("Building batch of {} calls from {:?}", to.len(), sender);
        let call_data = contracts::encode_execute_batch(to, value, data);
        self.build(account, sender, call_data, GasLimits::BATCH).await
    }

    async fn build(
        &self,
        account: &SmartAccountRef,
        sender: Address,
        call_data: Bytes,
        gas: GasLimits,
    ) -> Result<UserOperation> {
        let gas_price = self
            .gateway
            .get_gas_price()
            .await
            .map_err(SmartWalletError::Resolution)?;

        let exists = self.resolver.ensure_deployed(account, sender).await?;
        if !exists && AddressResolver::requires_explicit_deployment(account.chain_id) {
            return Err(SmartWalletError::AccountNotFound {
                address: sender,
                chain_id: account.chain_id,
            });
        }
        // Relayed accounts start at nonce 0 and are deployed by the service,
        // so init code stays empty either way.
        let nonce = if exists {
            self.resolver.nonce(sender).await?
        } else {
            U256::zero()
        };

        info!("Built user operation for {:?} with nonce {}", sender, nonce);
        Ok(UserOperation {
            sender,
            nonce,
            init_code: Bytes::default(),
            call_data,
            call_gas_limit: gas.call_gas_limit.into(),
            verification_gas_limit: gas.verification_gas_limit.into(),
            pre_verification_gas: gas.pre_verification_gas.into(),
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: gas_price,
            paymaster_and_data: Bytes::default(),
            signature: dummy_signature(),
        })
    }
}
