// src/contracts.rs
//! ABI surface of the on-chain contracts the wallet calls into.
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::contract::{abigen, EthCall};
use ethers::types::{Address, Bytes, U256};

use crate::types::ExecutionPermission;

abigen!(
    EntryPoint,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256)
    ]"#
);

abigen!(
    KernelFactory,
    r#"[
        function getAccountAddress(address owner, uint256 index) external view returns (address)
        function createAccount(address owner, uint256 index) external returns (address)
    ]"#
);

abigen!(
    Kernel,
    r#"[
        function execute(address to, uint256 value, bytes data, uint8 operation) external
        function getExecution(bytes4 selector) external view returns (uint48 valid_until, uint48 valid_after, address executor, address validator)
        function setExecution(bytes4 selector, address executor, address validator, uint48 valid_until, uint48 valid_after, bytes enable_data) external
    ]"#
);

abigen!(
    BatchActions,
    r#"[
        function executeBatch(address[] to, uint256[] value, bytes[] data, uint8 operation) external
    ]"#
);

abigen!(
    FungibleToken,
    r#"[
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

/// Kernel operation type: plain call (1 would be delegatecall).
pub const OPERATION_CALL: u8 = 0;

pub fn execute_batch_selector() -> [u8; 4] {
    <batch_actions::ExecuteBatchCall as EthCall>::selector()
}

pub fn encode_get_nonce(sender: Address) -> Bytes {
    entry_point::GetNonceCall {
        sender,
        key: U256::zero(),
    }
    .encode()
    .into()
}

pub fn decode_nonce(data: &[u8]) -> Result<U256, ethers::abi::AbiError> {
    Ok(entry_point::GetNonceReturn::decode(data)?.0)
}

pub fn encode_get_account_address(owner: Address, index: U256) -> Bytes {
    kernel_factory::GetAccountAddressCall { owner, index }.encode().into()
}

pub fn decode_account_address(data: &[u8]) -> Result<Address, ethers::abi::AbiError> {
    Ok(kernel_factory::GetAccountAddressReturn::decode(data)?.0)
}

pub fn encode_create_account(owner: Address, index: U256) -> Bytes {
    kernel_factory::CreateAccountCall { owner, index }.encode().into()
}

pub fn encode_execute(to: Address, value: U256, data: Bytes) -> Bytes {
    kernel::ExecuteCall {
        to,
        value,
        data,
        operation: OPERATION_CALL,
    }
    .encode()
    .into()
}

pub fn encode_execute_batch(to: Vec<Address>, value: Vec<U256>, data: Vec<Bytes>) -> Bytes {
    batch_actions::ExecuteBatchCall {
        to,
        value,
        data,
        operation: OPERATION_CALL,
    }
    .encode()
    .into()
}

pub fn encode_get_execution(selector: [u8; 4]) -> Bytes {
    kernel::GetExecutionCall { selector }.encode().into()
}

pub fn decode_execution(data: &[u8]) -> Result<ExecutionPermission, ethers::abi::AbiError> {
    let ret = kernel::GetExecutionReturn::decode(data)?;
    Ok(ExecutionPermission {
        valid_until: ret.valid_until,
        valid_after: ret.valid_after,
        executor: ret.executor,
        validator: ret.validator,
    })
}

pub fn encode_set_execution(
    selector: [u8; 4],
    executor: Address,
    validator: Address,
    valid_until: u64,
    valid_after: u64,
    enable_data: Bytes,
) -> Bytes {
    kernel::SetExecutionCall {
        selector,
        executor,
        validator,
        valid_until,
        valid_after,
        enable_data,
    }
    .encode()
    .into()
}

pub fn encode_balance_of(account: Address) -> Bytes {
    fungible_token::BalanceOfCall { account }.encode().into()
}

pub fn decode_balance(data: &[u8]) -> Result<U256, ethers::abi::AbiError> {
    Ok(fungible_token::BalanceOfReturn::decode(data)?.0)
}
