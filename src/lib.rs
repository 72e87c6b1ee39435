// src/lib.rs
//! Client-side lifecycle of ERC-4337 user operations for Kernel smart
//! accounts: address resolution, operation building, sponsorship, signing and
//! submission through a relay service.
pub mod api;
pub mod builder;
pub mod bundler;
pub mod chains;
pub mod config;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod paymaster;
pub mod permission;
pub mod pipeline;
pub mod poll;
pub mod resolver;
pub mod rpc;
pub mod signer;
pub mod types;
pub mod wallet;

pub use config::{Deployment, Options, ReceiptPolling};
pub use error::{ErrorKind, Result, SmartWalletError, SponsorshipKind};
pub use gateway::{ChainGateway, GatewayError, SignerProviderGateway, SplitClientGateway};
pub use types::{BasicTransaction, SubmittedOperation, UserOperation};
pub use wallet::SmartWallet;
