// src/gateway/mock.rs
//! Test doubles: an in-memory chain and a JSON-RPC responder for wiremock.
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::AbiEncode;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Signature, H256, U256, U64};
use ethers::utils::id;
use serde_json::{json, Value};
use wiremock::{Request, Respond, ResponseTemplate};

use super::{ChainGateway, GatewayError};
use crate::contracts;
use crate::types::{BlockInfo, ExecutionPermission};

pub(crate) const OWNER_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Answers JSON-RPC requests by method name, echoing the request id.
#[derive(Default, Clone)]
pub(crate) struct EthRpcResponder {
    results: HashMap<String, Value>,
}

impl EthRpcResponder {
    pub(crate) fn with(mut self, method: &str, result: Value) -> Self {
        self.results.insert(method.to_string(), result);
        self
    }
}

impl Respond for EthRpcResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let id = body.get("id").cloned().unwrap_or(json!(0));
        let method = body.get("method").and_then(Value::as_str).unwrap_or_default();
        let payload = match self.results.get(method) {
            Some(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            None => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("method {method} not mocked")},
            }),
        };
        ResponseTemplate::new(200).set_body_json(payload)
    }
}

#[derive(Debug)]
struct MockChainState {
    deployed: bool,
    nonce: U256,
    permissions: VecDeque<ExecutionPermission>,
    token_balances: HashMap<Address, U256>,
    sent: Vec<(Address, Bytes)>,
}

/// In-memory chain for one owner and one counterfactual account.
#[derive(Debug)]
pub(crate) struct MockGateway {
    wallet: LocalWallet,
    pub(crate) chain_id: u64,
    pub(crate) account: Address,
    gas_price: U256,
    state: Mutex<MockChainState>,
    reads: AtomicUsize,
    deploy_on_send: bool,
}

impl MockGateway {
    pub(crate) fn new(chain_id: u64) -> Self {
        let wallet = OWNER_KEY
            .parse::<LocalWallet>()
            .unwrap()
            .with_chain_id(chain_id);
        Self {
            wallet,
            chain_id,
            account: Address::repeat_byte(0x5a),
            gas_price: U256::from(1_000_000_000u64),
            state: Mutex::new(MockChainState {
                deployed: false,
                nonce: U256::zero(),
                permissions: VecDeque::from([unset_permission()]),
                token_balances: HashMap::new(),
                sent: Vec::new(),
            }),
            reads: AtomicUsize::new(0),
            deploy_on_send: true,
        }
    }

    pub(crate) fn deployed(self, nonce: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.deployed = true;
            state.nonce = U256::from(nonce);
        }
        self
    }

    /// Successive `getExecution` reads return these in order; the last one sticks.
    pub(crate) fn permissions(self, permissions: Vec<ExecutionPermission>) -> Self {
        self.state.lock().unwrap().permissions = permissions.into();
        self
    }

    pub(crate) fn token_balance(self, token: Address, balance: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .token_balances
            .insert(token, U256::from(balance));
        self
    }

    pub(crate) fn never_deploys(mut self) -> Self {
        self.deploy_on_send = false;
        self
    }

    pub(crate) fn set_deployed(&self, deployed: bool) {
        self.state.lock().unwrap().deployed = deployed;
    }

    pub(crate) fn sent_transactions(&self) -> Vec<(Address, Bytes)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn unset_permission() -> ExecutionPermission {
    ExecutionPermission {
        valid_until: 0,
        valid_after: 0,
        executor: Address::zero(),
        validator: Address::zero(),
    }
}

pub(crate) fn set_permission() -> ExecutionPermission {
    ExecutionPermission {
        valid_until: crate::config::EXECUTION_VALID_UNTIL,
        valid_after: 1_700_000_000,
        executor: Address::repeat_byte(0xee),
        validator: Address::repeat_byte(0xaa),
    }
}

fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

#[async_trait]
impl ChainGateway for MockGateway {
    fn owner(&self) -> Address {
        self.wallet.address()
    }

    async fn chain_id(&self) -> Result<u64, GatewayError> {
        Ok(self.chain_id)
    }

    async fn get_code(&self, _address: Address) -> Result<Bytes, GatewayError> {
        self.read();
        let deployed = self.state.lock().unwrap().deployed;
        Ok(if deployed {
            Bytes::from(vec![0x60, 0x80, 0x60, 0x40])
        } else {
            Bytes::default()
        })
    }

    async fn get_gas_price(&self) -> Result<U256, GatewayError> {
        self.read();
        Ok(self.gas_price)
    }

    async fn get_block(&self) -> Result<BlockInfo, GatewayError> {
        self.read();
        Ok(BlockInfo {
            number: U64::from(100),
            timestamp: U256::from(1_700_000_000u64),
        })
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, GatewayError> {
        self.read();
        Ok(U256::exp10(18))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, GatewayError> {
        self.read();
        let sel: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| GatewayError::Rpc("empty calldata".to_string()))?;
        let mut state = self.state.lock().unwrap();
        let ret = if sel == selector("getAccountAddress(address,uint256)") {
            self.account.encode()
        } else if sel == selector("getNonce(address,uint192)") {
            state.nonce.encode()
        } else if sel == selector("getExecution(bytes4)") {
            let permission = if state.permissions.len() > 1 {
                state.permissions.pop_front().unwrap_or_else(unset_permission)
            } else {
                state.permissions.front().copied().unwrap_or_else(unset_permission)
            };
            (
                permission.valid_until,
                permission.valid_after,
                permission.executor,
                permission.validator,
            )
                .encode()
        } else if sel == selector("balanceOf(address)") {
            state.token_balances.get(&to).copied().unwrap_or_default().encode()
        } else {
            return Err(GatewayError::Rpc(format!("unexpected call to {to:?}")));
        };
        Ok(Bytes::from(ret))
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if data.starts_with(&contracts::encode_create_account(Address::zero(), U256::zero())[..4])
            && self.deploy_on_send
        {
            state.deployed = true;
        }
        state.sent.push((to, data));
        Ok(H256::repeat_byte(0x77))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, GatewayError> {
        self.wallet
            .sign_message(message)
            .await
            .map_err(|e| GatewayError::Signer(e.to_string()))
    }
}
