// src/signer.rs
use std::sync::Arc;

use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use tracing::debug;

use crate::error::{Result, SmartWalletError};
use crate::gateway::ChainGateway;
use crate::types::UserOperation;

/// Validator-selector tag the Kernel account expects in front of the ECDSA
/// signature (all zero selects the default validator).
pub const SIGNATURE_PADDING: [u8; 4] = [0u8; 4];

// Shaped like an ECDSA signature (r, s, v) so bundler simulation passes the
// format checks; it never recovers to the owner.
const DUMMY_ECDSA_SIGNATURE: [u8; 65] = {
    let mut sig = [0xffu8; 65];
    sig[64] = 0x1c;
    sig
};

pub fn dummy_signature() -> Bytes {
    let mut sig = Vec::with_capacity(SIGNATURE_PADDING.len() + DUMMY_ECDSA_SIGNATURE.len());
    sig.extend_from_slice(&SIGNATURE_PADDING);
    sig.extend_from_slice(&DUMMY_ECDSA_SIGNATURE);
    Bytes::from(sig)
}

/// ERC-4337 v0.6 user operation hash, as computed by `EntryPoint.getUserOpHash`.
pub fn user_op_hash(op: &UserOperation, entry_point: Address, chain_id: u64) -> H256 {
    let packed = encode(&[
        Token::Address(op.sender),
        Token::Uint(op.nonce),
        Token::FixedBytes(keccak256(&op.init_code).to_vec()),
        Token::FixedBytes(keccak256(&op.call_data).to_vec()),
        Token::Uint(op.call_gas_limit),
        Token::Uint(op.verification_gas_limit),
        Token::Uint(op.pre_verification_gas),
        Token::Uint(op.max_fee_per_gas),
        Token::Uint(op.max_priority_fee_per_gas),
        Token::FixedBytes(keccak256(&op.paymaster_and_data).to_vec()),
    ]);
    let hash = encode(&[
        Token::FixedBytes(keccak256(packed).to_vec()),
        Token::Address(entry_point),
        Token::Uint(U256::from(chain_id)),
    ]);
    H256::from(keccak256(hash))
}

/// Produces the owner signature of a user operation.
#[derive(Clone)]
pub struct OperationSigner {
    gateway: Arc<dyn ChainGateway>,
    entry_point: Address,
    chain_id: u64,
}

impl OperationSigner {
    pub fn new(gateway: Arc<dyn ChainGateway>, entry_point: Address, chain_id: u64) -> Self {
        Self {
            gateway,
            entry_point,
            chain_id,
        }
    }

    pub fn hash(&self, op: &UserOperation) -> H256 {
        user_op_hash(op, self.entry_point, self.chain_id)
    }

    pub async fn sign(&self, mut op: UserOperation) -> Result<UserOperation> {
        let hash = self.hash(&op);
        let signature = self
            .gateway
            .sign_message(hash.as_bytes())
            .await
            .map_err(SmartWalletError::Signing)?;

        let mut bytes = SIGNATURE_PADDING.to_vec();
        bytes.extend_from_slice(&signature.to_vec());
        op.signature = Bytes::from(bytes);
        debug!("Signed user operation {:?} for {:?}", hash, op.sender);
        Ok(op)
    }
}
