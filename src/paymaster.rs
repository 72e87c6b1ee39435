// src/paymaster.rs
use ethers::types::Address;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::api::ApiClient;
use crate::config::Options;
use crate::error::{Result, SmartWalletError, SponsorshipKind};
use crate::types::{SponsorshipRequest, SponsorshipResponse, UserOperation};

const NATIVE_SPONSORSHIP_PATH: &str = "/v1/transaction/payment-sponsorship";
const ERC20_SPONSORSHIP_PATH: &str = "/v1/transaction/payment-sponsorship-erc20";

// The live service wraps the paymaster reply in `paymasterDataResponse`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SponsorshipBody {
    #[serde(rename_all = "camelCase")]
    Nested {
        paymaster_data_response: SponsorshipResponse,
    },
    Flat(SponsorshipResponse),
}

impl From<SponsorshipBody> for SponsorshipResponse {
    fn from(body: SponsorshipBody) -> Self {
        match body {
            SponsorshipBody::Nested {
                paymaster_data_response,
            } => paymaster_data_response,
            SponsorshipBody::Flat(response) => response,
        }
    }
}

/// Client of the relay's paymaster endpoints.
#[derive(Debug, Clone)]
pub struct SponsorshipNegotiator {
    api: ApiClient,
}

impl SponsorshipNegotiator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Applies the per-session rule: nothing when sponsorship is off, the
    /// ERC-20 path when a gas token is set, native sponsorship otherwise.
    pub async fn sponsor(&self, chain_id: u64, op: UserOperation, options: &Options) -> Result<UserOperation> {
        if options.no_sponsorship {
            debug!("Sponsorship disabled, sender pays gas");
            return Ok(op);
        }
        match options.gas_token {
            Some(token) => self.sponsor_erc20(chain_id, op, token).await,
            None => self.sponsor_native(chain_id, op).await,
        }
    }

    pub async fn sponsor_native(&self, chain_id: u64, op: UserOperation) -> Result<UserOperation> {
        self.request(chain_id, op, None).await
    }

    pub async fn sponsor_erc20(&self, chain_id: u64, op: UserOperation, token: Address) -> Result<UserOperation> {
        self.request(chain_id, op, Some(token)).await
    }

    async fn request(
        &self,
        chain_id: u64,
        mut op: UserOperation,
        erc20_token: Option<Address>,
    ) -> Result<UserOperation> {
        let (kind, path) = match erc20_token {
            Some(_) => (SponsorshipKind::Erc20, ERC20_SPONSORSHIP_PATH),
            None => (SponsorshipKind::Native, NATIVE_SPONSORSHIP_PATH),
        };
        let request = SponsorshipRequest {
            chain_id,
            user_operation: &op,
            erc20_token,
        };

        let response: SponsorshipResponse = match self.api.post::<_, SponsorshipBody>(path, &request).await {
            Ok(body) => body.into(),
            Err(source) => {
                error!("{} for {:?}: {}", kind.code(), op.sender, source);
                return Err(SmartWalletError::Sponsorship { kind, source });
            }
        };

        if let Some(sender) = response.user_operation.sender {
            if sender != op.sender {
                debug!("Paymaster echoed sender {:?}, keeping {:?}", sender, op.sender);
            }
        }
        op.apply_sponsorship(response.user_operation);
        info!(
            "Sponsored user operation for {:?} ({:?}), paymasterAndData {} bytes",
            op.sender,
            kind,
            op.paymaster_and_data.len()
        );
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ethers::types::{Bytes, U256};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn op() -> UserOperation {
        UserOperation {
            sender: Address::repeat_byte(0x5a),
            nonce: U256::from(3),
            call_data: Bytes::from(vec![0xb6, 0x1d, 0x27, 0xf6]),
            call_gas_limit: U256::from(250_000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn native_sponsorship_rewrites_paymaster_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(NATIVE_SPONSORSHIP_PATH))
            .and(header("x-api-key", "key"))
            .and(body_partial_json(json!({"chainId": 80001, "userOperation": {"nonce": "0x3"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userOperation": {"paymasterAndData": "0x1234", "callGasLimit": "0x30d40"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let negotiator = SponsorshipNegotiator::new(ApiClient::new(server.uri(), "key"));
        let sponsored = negotiator.sponsor_native(80001, op()).await.unwrap();
        assert_eq!(sponsored.paymaster_and_data, Bytes::from(vec![0x12, 0x34]));
        assert_eq!(sponsored.call_gas_limit, U256::from(200_000));
        assert_eq!(sponsored.call_data, op().call_data);
    }

    #[tokio::test]
    async fn erc20_sponsorship_sends_token() {
        let server = MockServer::start().await;
        let token = Address::repeat_byte(0x70);
        Mock::given(method("POST"))
            .and(path(ERC20_SPONSORSHIP_PATH))
            .and(body_partial_json(json!({"erc20Token": format!("{token:?}")})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"userOperation": {"paymasterAndData": "0xabcd"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let negotiator = SponsorshipNegotiator::new(ApiClient::new(server.uri(), "key"));
        let options = Options::new("http://localhost:8545", 80001, "key").gas_token(token);
        let sponsored = negotiator.sponsor(80001, op(), &options).await.unwrap();
        assert_eq!(sponsored.paymaster_and_data, Bytes::from(vec![0xab, 0xcd]));
    }

    #[tokio::test]
    async fn live_service_reply_is_unwrapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(NATIVE_SPONSORSHIP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"paymasterDataResponse": {
                    "userOperation": {"paymasterAndData": "0x1234", "preVerificationGas": "0xc350"}
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let negotiator = SponsorshipNegotiator::new(ApiClient::new(server.uri(), "key"));
        let sponsored = negotiator.sponsor_native(80001, op()).await.unwrap();
        assert_eq!(sponsored.paymaster_and_data, Bytes::from(vec![0x12, 0x34]));
        assert_eq!(sponsored.pre_verification_gas, U256::from(50_000));
        assert_eq!(sponsored.sender, op().sender);
    }

    #[tokio::test]
    async fn failures_are_tagged_by_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(NATIVE_SPONSORSHIP_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(ERC20_SPONSORSHIP_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "token not supported"})))
            .mount(&server)
            .await;

        let negotiator = SponsorshipNegotiator::new(ApiClient::new(server.uri(), "key"));

        let native = negotiator.sponsor_native(80001, op()).await.unwrap_err();
        assert_eq!(native.sponsorship_code(), Some("PAYMENT_SPONSORSHIP_ERR"));
        assert_eq!(native.kind(), ErrorKind::Sponsorship(SponsorshipKind::Native));

        let erc20 = negotiator
            .sponsor_erc20(80001, op(), Address::repeat_byte(1))
            .await
            .unwrap_err();
        assert_eq!(erc20.sponsorship_code(), Some("PAYMENT_SPONSORSHIP_ERR_ERC20"));
        assert!(erc20.to_string().contains("token not supported"));
    }

    #[tokio::test]
    async fn disabled_sponsorship_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let negotiator = SponsorshipNegotiator::new(ApiClient::new(server.uri(), "key"));
        let options = Options::new("http://localhost:8545", 80001, "key").no_sponsorship(true);
        let unchanged = negotiator.sponsor(80001, op(), &options).await.unwrap();
        assert_eq!(unchanged, op());
    }
}
