// src/error.rs
use std::time::Duration;

use ethers::types::{Address, H256};
use thiserror::Error;

use crate::api::ApiError;
use crate::gateway::GatewayError;

/// Which sponsorship endpoint produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorshipKind {
    Native,
    Erc20,
}

impl SponsorshipKind {
    pub fn code(&self) -> &'static str {
        match self {
            SponsorshipKind::Native => "PAYMENT_SPONSORSHIP_ERR",
            SponsorshipKind::Erc20 => "PAYMENT_SPONSORSHIP_ERR_ERC20",
        }
    }
}

/// Machine-checkable discriminant of [`SmartWalletError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    UnsupportedChain,
    InvalidApiKey,
    AccountNotFound,
    Resolution,
    Sponsorship(SponsorshipKind),
    Signing,
    Submission,
    Deployment,
    ReceiptUnavailable,
    ReceiptTimeout,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SmartWalletError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unsupported chain id {0}")]
    UnsupportedChain(u64),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Smart account {address} is not deployed on chain {chain_id}")]
    AccountNotFound { address: Address, chain_id: u64 },

    #[error("Chain read failed: {0}")]
    Resolution(#[source] GatewayError),

    #[error("{}: {source}", .kind.code())]
    Sponsorship {
        kind: SponsorshipKind,
        #[source]
        source: ApiError,
    },

    #[error("Owner signature failed: {0}")]
    Signing(#[source] GatewayError),

    #[error("Bundler rejected user operation: {0}")]
    Submission(#[source] ApiError),

    #[error("Account deployment failed: {0}")]
    Deployment(String),

    #[error("Receipt unavailable for user operation {user_op_hash:?}: {reason}")]
    ReceiptUnavailable { user_op_hash: H256, reason: String },

    #[error("No receipt for user operation {user_op_hash:?} after {waited:?}")]
    ReceiptTimeout { user_op_hash: H256, waited: Duration },

    #[error("Wait cancelled")]
    Cancelled,
}

impl SmartWalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SmartWalletError::Validation(_) => ErrorKind::Validation,
            SmartWalletError::UnsupportedChain(_) => ErrorKind::UnsupportedChain,
            SmartWalletError::InvalidApiKey => ErrorKind::InvalidApiKey,
            SmartWalletError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            SmartWalletError::Resolution(_) => ErrorKind::Resolution,
            SmartWalletError::Sponsorship { kind, .. } => ErrorKind::Sponsorship(*kind),
            SmartWalletError::Signing(_) => ErrorKind::Signing,
            SmartWalletError::Submission(_) => ErrorKind::Submission,
            SmartWalletError::Deployment(_) => ErrorKind::Deployment,
            SmartWalletError::ReceiptUnavailable { .. } => ErrorKind::ReceiptUnavailable,
            SmartWalletError::ReceiptTimeout { .. } => ErrorKind::ReceiptTimeout,
            SmartWalletError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Sponsorship error code, if this is a sponsorship failure.
    pub fn sponsorship_code(&self) -> Option<&'static str> {
        match self {
            SmartWalletError::Sponsorship { kind, .. } => Some(kind.code()),
            _ => None,
        }
    }
}

pub type Result<T, E = SmartWalletError> = std::result::Result<T, E>;
