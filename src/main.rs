// src/main.rs
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use ethers::types::{Address, Bytes, H256, U256};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use smart_wallet_sdk::config::BASE_API_URL;
use smart_wallet_sdk::{
    BasicTransaction, ChainGateway, Deployment, Options, ReceiptPolling, SignerProviderGateway,
    SmartWallet, SplitClientGateway,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// ethers provider with a signing middleware
    SignerProvider,
    /// jsonrpsee reads, local wallet for writes
    Split,
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "ERC-4337 smart wallet client", long_about = None)]
struct Args {
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    #[clap(long, env = "RPC_URL")]
    rpc_url: String,

    #[clap(long, env = "CHAIN_ID")]
    chain_id: u64,

    #[clap(long, env = "API_KEY", hide_env_values = true)]
    api_key: String,

    /// Pay gas in this ERC-20 token
    #[clap(long, env = "GAS_TOKEN")]
    gas_token: Option<String>,

    #[clap(long, env = "NO_SPONSORSHIP")]
    no_sponsorship: bool,

    #[clap(long, default_value_t = 0)]
    salt: u64,

    #[clap(long, env = "API_BASE_URL", default_value = BASE_API_URL)]
    api_base_url: String,

    #[clap(long, value_enum, default_value = "signer-provider")]
    backend: Backend,

    #[clap(long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the smart account address
    Address,
    /// Deploy the smart account
    CreateAccount {
        /// Let the relay service pay for the deployment
        #[clap(long)]
        relayed: bool,
    },
    /// Send a single call through the smart account
    Send {
        to: String,
        /// Wei, decimal
        #[clap(long, default_value = "0")]
        value: String,
        #[clap(long, default_value = "0x")]
        data: String,
    },
    /// Send several calls in one user operation
    Batch {
        /// `to[:value[:data]]`, repeatable
        #[clap(long = "call", required = true)]
        calls: Vec<String>,
    },
    /// Look up the transaction that included a user operation
    Receipt {
        user_op_hash: String,
        #[clap(long)]
        wait: bool,
    },
    /// Native and ERC-20 balances of the smart account
    Balance {
        #[clap(long = "token")]
        tokens: Vec<String>,
    },
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    s.parse::<Address>().map_err(|e| anyhow!("invalid address {s}: {e}"))
}

fn parse_value(s: &str) -> anyhow::Result<U256> {
    U256::from_dec_str(s).map_err(|e| anyhow!("invalid value {s}: {e}"))
}

fn parse_data(s: &str) -> anyhow::Result<Bytes> {
    s.parse::<Bytes>().map_err(|e| anyhow!("invalid calldata {s}: {e}"))
}

fn parse_call(arg: &str) -> anyhow::Result<BasicTransaction> {
    let mut parts = arg.splitn(3, ':');
    let to = parse_address(parts.next().unwrap_or_default())?;
    let value = parts.next().map(parse_value).transpose()?.unwrap_or_default();
    let data = parts.next().map(parse_data).transpose()?.unwrap_or_default();
    Ok(BasicTransaction { to, value, data })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let level: Level = args
        .log_level
        .parse()
        .map_err(|_| anyhow!("invalid log level {}", args.log_level))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut options = Options::new(args.rpc_url.clone(), args.chain_id, args.api_key.clone())
        .private_key(args.private_key.clone())
        .no_sponsorship(args.no_sponsorship)
        .salt(args.salt);
    if let Some(token) = &args.gas_token {
        options = options.gas_token(parse_address(token)?);
    }

    let gateway: Arc<dyn ChainGateway> = match args.backend {
        Backend::SignerProvider => Arc::new(SignerProviderGateway::connect(&options)?),
        Backend::Split => Arc::new(SplitClientGateway::connect(&options)?),
    };
    let deployment = Deployment::default().with_api_base_url(args.api_base_url.clone());
    let wallet = SmartWallet::init_with(gateway, options, deployment, ReceiptPolling::default())
        .await
        .context("wallet initialisation failed")?;

    let cancel = wallet.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match args.command {
        Command::Address => {
            println!("{:?}", wallet.get_address());
        }
        Command::CreateAccount { relayed } => {
            let address = if relayed {
                wallet.create_account_by_dapp().await?
            } else {
                wallet.create_account().await?
            };
            println!("{address:?}");
        }
        Command::Send { to, value, data } => {
            let tx = BasicTransaction {
                to: parse_address(&to)?,
                value: parse_value(&value)?,
                data: parse_data(&data)?,
            };
            let submitted = wallet.send_transaction(&tx).await?;
            info!("Accepted by {} ({})", submitted.bundler, submitted.bundler_url);
            println!("{:?}", submitted.user_op_hash);
        }
        Command::Batch { calls } => {
            let calls = calls
                .iter()
                .map(|call| parse_call(call))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let submitted = wallet.execute_calls(&calls).await?;
            info!("Accepted by {} ({})", submitted.bundler, submitted.bundler_url);
            println!("{:?}", submitted.user_op_hash);
        }
        Command::Receipt { user_op_hash, wait } => {
            let hash: H256 = user_op_hash
                .parse()
                .map_err(|e| anyhow!("invalid user operation hash {user_op_hash}: {e}"))?;
            let tx_hash = if wait {
                wallet.wait_for_receipt(hash, &wallet.cancel_token()).await?
            } else {
                wallet.get_transaction_hash(hash).await?
            };
            println!("{tx_hash:?}");
        }
        Command::Balance { tokens } => {
            println!("native {}", wallet.native_balance().await?);
            let tokens = tokens
                .iter()
                .map(|token| parse_address(token))
                .collect::<anyhow::Result<Vec<_>>>()?;
            for (token, balance) in wallet.token_balances(&tokens).await? {
                println!("{token:?} {balance}");
            }
        }
    }

    Ok(())
}
