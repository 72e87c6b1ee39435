// src/permission.rs
use std::sync::Arc;

use ethers::types::{Address, Bytes};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::builder::OperationBuilder;
use crate::config::{Deployment, Options, ReceiptPolling};
use crate::contracts;
use crate::error::{Result, SmartWalletError};
use crate::gateway::{ChainGateway, GatewayError};
use crate::pipeline::Pipeline;
use crate::poll::poll_until;
use crate::resolver::AddressResolver;
use crate::types::{BasicTransaction, ExecutionPermission, SmartAccountRef};

/// Makes sure the Kernel account lets the batch executor handle
/// `executeBatch` before any batch is built against it.
#[derive(Clone)]
pub struct ExecutionPermissionGate {
    gateway: Arc<dyn ChainGateway>,
    resolver: AddressResolver,
    builder: OperationBuilder,
    pipeline: Pipeline,
    deployment: Deployment,
    polling: ReceiptPolling,
}

impl ExecutionPermissionGate {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        resolver: AddressResolver,
        builder: OperationBuilder,
        pipeline: Pipeline,
        deployment: Deployment,
        polling: ReceiptPolling,
    ) -> Self {
        Self {
            gateway,
            resolver,
            builder,
            pipeline,
            deployment,
            polling,
        }
    }

    pub async fn permission(&self, sender: Address) -> Result<ExecutionPermission> {
        let data = contracts::encode_get_execution(contracts::execute_batch_selector());
        let ret = self
            .gateway
            .call(sender, data)
            .await
            .map_err(SmartWalletError::Resolution)?;
        contracts::decode_execution(&ret).map_err(|e| SmartWalletError::Resolution(GatewayError::from(e)))
    }

    /// Returns `true` when this call had to install the permission.
    pub async fn ensure(
        &self,
        account: &SmartAccountRef,
        sender: Address,
        options: &Options,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.resolver.require_deployed(sender, account.chain_id).await?;

        let current = self.permission(sender).await?;
        if current.is_set() {
            debug!("Batch execution already enabled for {:?}", sender);
            return Ok(false);
        }

        let block = self
            .gateway
            .get_block()
            .await
            .map_err(SmartWalletError::Resolution)?;
        let call_data = contracts::encode_set_execution(
            contracts::execute_batch_selector(),
            self.deployment.batch_executor,
            self.deployment.validator,
            self.deployment.execution_valid_until,
            block.timestamp.low_u64(),
            Bytes::from(account.owner.as_bytes().to_vec()),
        );
        info!("Enabling batch execution for {:?}", sender);

        let tx = BasicTransaction::new(sender).data(call_data);
        let op = self.builder.build_single(account, sender, &tx).await?;
        let submitted = self.pipeline.submit(account.chain_id, op, options).await?;

        let confirmed = poll_until(self.polling, cancel, move || async move {
            Ok(self.permission(sender).await?.is_set().then_some(()))
        })
        .await?;
        match confirmed {
            Some(()) => {
                info!("Batch execution enabled for {:?}", sender);
                Ok(true)
            }
            None => Err(SmartWalletError::ReceiptTimeout {
                user_op_hash: submitted.user_op_hash,
                waited: self.polling.timeout,
            }),
        }
    }
}
