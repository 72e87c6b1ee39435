// src/pipeline.rs
use tracing::info;

use crate::bundler::Submitter;
use crate::config::Options;
use crate::error::Result;
use crate::paymaster::SponsorshipNegotiator;
use crate::signer::OperationSigner;
use crate::types::{SubmittedOperation, UserOperation};

/// Sponsor, sign, send. Every built operation leaves the session through here.
#[derive(Clone)]
pub struct Pipeline {
    negotiator: SponsorshipNegotiator,
    signer: OperationSigner,
    submitter: Submitter,
}

impl Pipeline {
    pub fn new(negotiator: SponsorshipNegotiator, signer: OperationSigner, submitter: Submitter) -> Self {
        Self {
            negotiator,
            signer,
            submitter,
        }
    }

    pub fn signer(&self) -> &OperationSigner {
        &self.signer
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    pub async fn submit(&self, chain_id: u64, op: UserOperation, options: &Options) -> Result<SubmittedOperation> {
        let sponsored = self.negotiator.sponsor(chain_id, op, options).await?;
        let signed = self.signer.sign(sponsored).await?;
        let submitted = self.submitter.send(chain_id, signed).await?;
        info!(
            "Submitted user operation {:?} from {:?}",
            submitted.user_op_hash, submitted.user_operation.sender
        );
        Ok(submitted)
    }
}
