// src/types.rs
use ethers::types::{Address, Bytes, H256, U256, U64};
use serde::{Deserialize, Serialize};

/// ERC-4337 (v0.6) user operation. Every numeric and byte field goes over the
/// wire as a `0x`-prefixed hex string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// Applies the fields a paymaster is allowed to rewrite. Sender, init code,
    /// call data and signature always stay as built locally.
    pub fn apply_sponsorship(&mut self, patch: UserOperationPatch) {
        if let Some(paymaster_and_data) = patch.paymaster_and_data {
            self.paymaster_and_data = paymaster_and_data;
        }
        if let Some(nonce) = patch.nonce {
            self.nonce = nonce;
        }
        if let Some(gas) = patch.call_gas_limit {
            self.call_gas_limit = gas;
        }
        if let Some(gas) = patch.verification_gas_limit {
            self.verification_gas_limit = gas;
        }
        if let Some(gas) = patch.pre_verification_gas {
            self.pre_verification_gas = gas;
        }
        if let Some(fee) = patch.max_fee_per_gas {
            self.max_fee_per_gas = fee;
        }
        if let Some(fee) = patch.max_priority_fee_per_gas {
            self.max_priority_fee_per_gas = fee;
        }
    }
}

/// User operation as returned by the paymaster; any field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationPatch {
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default)]
    pub nonce: Option<U256>,
    #[serde(default)]
    pub call_gas_limit: Option<U256>,
    #[serde(default)]
    pub verification_gas_limit: Option<U256>,
    #[serde(default)]
    pub pre_verification_gas: Option<U256>,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub paymaster_and_data: Option<Bytes>,
}

/// A single call made through the smart account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicTransaction {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl BasicTransaction {
    pub fn new(to: Address) -> Self {
        Self {
            to,
            ..Default::default()
        }
    }

    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }
}

/// Identity of a counterfactual smart account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmartAccountRef {
    pub owner: Address,
    pub salt: U256,
    pub chain_id: u64,
}

/// On-chain execution record of the Kernel account for one function selector.
///
/// The owner data passed to `setExecution` is handed to the validator and
/// not stored in this record; Kernel's `getExecution` returns only the four
/// fields below, so it cannot be read back here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPermission {
    pub valid_until: u64,
    pub valid_after: u64,
    pub executor: Address,
    pub validator: Address,
}

impl ExecutionPermission {
    pub fn is_set(&self) -> bool {
        self.valid_until != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: U64,
    pub timestamp: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub chain_id: u64,
    pub eoa: Address,
    pub salt: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    #[serde(default)]
    pub smart_account_address: Option<Address>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipRequest<'a> {
    pub chain_id: u64,
    pub user_operation: &'a UserOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erc20_token: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipResponse {
    pub user_operation: UserOperationPatch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionRequest<'a> {
    pub chain_id: u64,
    pub user_operation: &'a UserOperation,
}

/// Bundler acknowledgement of a submitted user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResponse {
    pub bundler: String,
    #[serde(rename = "bundlerURL")]
    pub bundler_url: String,
    pub chain_id: u64,
    pub user_operation_hash: H256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    #[serde(default)]
    pub receipt: Option<ReceiptSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub transaction_hash: H256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyResponse {
    pub is_valid: bool,
}

/// What a caller gets back once the bundler accepted an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOperation {
    pub user_op_hash: H256,
    pub bundler: String,
    pub bundler_url: String,
    pub chain_id: u64,
    pub user_operation: UserOperation,
}
