// src/bundler.rs
use ethers::types::H256;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::ApiClient;
use crate::config::ReceiptPolling;
use crate::error::{Result, SmartWalletError};
use crate::poll::poll_until;
use crate::types::{
    ReceiptResponse, SendTransactionRequest, SendTransactionResponse, SubmittedOperation, UserOperation,
};

const SEND_TRANSACTION_PATH: &str = "/v1/transaction/send-transaction";

// The relay nests both payloads one level deeper than documented.
#[derive(Deserialize)]
#[serde(untagged)]
enum SendBody {
    #[serde(rename_all = "camelCase")]
    Nested {
        send_transaction_response: SendTransactionResponse,
    },
    Flat(SendTransactionResponse),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReceiptBody {
    #[serde(rename_all = "camelCase")]
    Nested { trx_receipt: ReceiptResponse },
    Flat(ReceiptResponse),
}

/// Hands signed operations to the relay's bundler endpoint and looks up
/// their receipts.
#[derive(Debug, Clone)]
pub struct Submitter {
    api: ApiClient,
}

impl Submitter {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn send(&self, chain_id: u64, op: UserOperation) -> Result<SubmittedOperation> {
        let request = SendTransactionRequest {
            chain_id,
            user_operation: &op,
        };
        let body: SendBody = self
            .api
            .post(SEND_TRANSACTION_PATH, &request)
            .await
            .map_err(|e| {
                error!("Bundler rejected operation from {:?}: {}", op.sender, e);
                SmartWalletError::Submission(e)
            })?;
        let response = match body {
            SendBody::Nested {
                send_transaction_response,
            } => send_transaction_response,
            SendBody::Flat(response) => response,
        };

        info!(
            "User operation {:?} accepted by {} on chain {}",
            response.user_operation_hash, response.bundler, response.chain_id
        );
        Ok(SubmittedOperation {
            user_op_hash: response.user_operation_hash,
            bundler: response.bundler,
            bundler_url: response.bundler_url,
            chain_id: response.chain_id,
            user_operation: op,
        })
    }

    /// Single lookup of the transaction that included `user_op_hash`.
    pub async fn transaction_hash(&self, chain_id: u64, user_op_hash: H256) -> Result<H256> {
        let path = format!("/v1/transaction/receipt/{chain_id}/{user_op_hash:?}");
        let body: ReceiptBody = self.api.get(&path).await.map_err(|e| match e.status() {
            Some(401) | Some(403) => SmartWalletError::InvalidApiKey,
            _ => SmartWalletError::ReceiptUnavailable {
                user_op_hash,
                reason: e.to_string(),
            },
        })?;
        let receipt = match body {
            ReceiptBody::Nested { trx_receipt } => trx_receipt,
            ReceiptBody::Flat(receipt) => receipt,
        };
        receipt
            .receipt
            .map(|r| r.transaction_hash)
            .ok_or_else(|| SmartWalletError::ReceiptUnavailable {
                user_op_hash,
                reason: "not yet included".to_string(),
            })
    }

    /// Polls until the operation is included. Only "not available yet" is
    /// retried; any other failure ends the wait.
    pub async fn wait_for_receipt(
        &self,
        chain_id: u64,
        user_op_hash: H256,
        polling: ReceiptPolling,
        cancel: &CancellationToken,
    ) -> Result<H256> {
        let found = poll_until(polling, cancel, move || async move {
            match self.transaction_hash(chain_id, user_op_hash).await {
                Ok(hash) => Ok(Some(hash)),
                Err(SmartWalletError::ReceiptUnavailable { reason, .. }) => {
                    debug!("Receipt for {:?} not ready: {}", user_op_hash, reason);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await?;
        found.ok_or(SmartWalletError::ReceiptTimeout {
            user_op_hash,
            waited: polling.timeout,
        })
    }
}
