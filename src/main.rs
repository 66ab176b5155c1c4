//! eth-txbuilder - build, sign and broadcast Ethereum transactions

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eth_txbuilder::abi::{encode_call_hex, parse_abi};
use eth_txbuilder::chain::RpcChainClient;
use eth_txbuilder::config::Settings;
use eth_txbuilder::keys::{checksum_address, derive_address};
use eth_txbuilder::tx::{build, calculate_cost, decode_signed, TxForm, TxSession};
use eth_txbuilder::validation::{parse_hex_quantity, validate_address};
use ethers::types::U256;
use ethers::utils::parse_ether;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "eth-txbuilder",
    version,
    about = "Build, sign and broadcast Ethereum transactions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, env = "TXBUILDER_CONFIG")]
    config: Option<PathBuf>,

    /// Network id from the config
    #[arg(short, long, global = true)]
    network: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the checksummed address of a private key
    Address {
        #[arg(long, env = "TXBUILDER_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },

    /// ABI-encode a function call
    Encode {
        /// e.g. "transfer(address,uint256)"
        signature: String,
        /// Comma-separated arguments
        #[arg(default_value = "")]
        params: String,
    },

    /// Decode a raw signed transaction and recover its sender
    Decode { raw: String },

    /// List the functions of a contract ABI JSON file
    Functions { abi: PathBuf },

    /// Sign a transaction offline; every field must be supplied
    Build {
        #[command(flatten)]
        tx: TxArgs,
        /// Print all fields as JSON instead of the raw hex
        #[arg(long)]
        json: bool,
    },

    /// Fill nonce and gas from the network, sign and broadcast
    Send {
        #[command(flatten)]
        tx: TxArgs,
        /// Sign and print without broadcasting
        #[arg(long)]
        dry_run: bool,
    },

    /// Balance of an address on the selected network
    Balance { address: String },

    /// Maximum fee for a gas limit at a gas price (fetched when omitted)
    Cost {
        /// 0x hex
        #[arg(long)]
        gas_limit: String,
        /// 0x hex wei
        #[arg(long)]
        gas_price: Option<String>,
    },
}

#[derive(Args)]
struct TxArgs {
    #[arg(long)]
    to: String,
    #[arg(long, env = "TXBUILDER_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,
    /// Hex or decimal
    #[arg(long)]
    nonce: Option<String>,
    /// 0x hex
    #[arg(long)]
    gas_limit: Option<String>,
    /// 0x hex wei
    #[arg(long)]
    gas_price: Option<String>,
    /// Amount in ETH
    #[arg(long)]
    value: Option<String>,
    #[arg(long)]
    function: Option<String>,
    /// Comma-separated arguments for --function
    #[arg(long)]
    params: Option<String>,
    #[arg(long)]
    chain_id: Option<u64>,
}

impl TxArgs {
    fn into_form(self) -> Result<TxForm> {
        let value = self
            .value
            .map(|eth| {
                parse_ether(eth.as_str())
                    .map(|wei| format!("0x{:x}", wei))
                    .with_context(|| format!("Invalid ETH amount: {}", eth))
            })
            .transpose()?;

        // a function without arguments still needs its selector
        let params = match (&self.function, self.params) {
            (Some(_), None) => Some(String::new()),
            (_, params) => params,
        };

        Ok(TxForm {
            recipient: self.to,
            private_key: self.private_key,
            nonce: self.nonce,
            function_signature: self.function,
            function_parameters: params,
            value,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            chain_id: self.chain_id,
            expected_sender: None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load_or_default()?,
    };
    let network = settings.network(cli.network.as_deref())?.clone();

    let session = || -> Result<TxSession> {
        let client = RpcChainClient::new(&network, settings.rpc.request_timeout())?;
        Ok(TxSession::new(
            Arc::new(client),
            network.clone(),
            settings.gas.clone(),
        ))
    };

    match cli.command {
        Commands::Address { private_key } => {
            let address = derive_address(&private_key)?;
            println!("{}", checksum_address(&address));
        }
        Commands::Encode { signature, params } => {
            println!("{}", encode_call_hex(&signature, &params)?);
        }
        Commands::Decode { raw } => {
            let decoded = decode_signed(&raw)?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Commands::Functions { abi } => {
            let json = std::fs::read_to_string(&abi)
                .with_context(|| format!("Failed to read ABI file: {:?}", abi))?;
            for function in parse_abi(&json)? {
                let kind = if function.is_read_only() { "view" } else { "write" };
                println!("{:<40} {}", function.signature, kind);
            }
        }
        Commands::Build { tx, json } => {
            let request = tx
                .into_form()?
                .parse(network.chain_id, settings.gas.max_gas_limit)?;
            let signed = build(&request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&signed)?);
            } else {
                println!("{}", signed);
            }
        }
        Commands::Send { tx, dry_run } => {
            let form = tx.into_form()?;
            let session = session()?;
            if dry_run {
                let signed = session.prepare(&form).await?;
                println!("{}", serde_json::to_string_pretty(&signed)?);
            } else {
                let receipt = session.send(&form).await?;
                info!("Sent {:?} on {}", receipt.tx_hash, network.name);
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            }
        }
        Commands::Balance { address } => {
            let address = validate_address("address", &address)?;
            let balance = session()?.balance(address).await?;
            println!("{} {}", balance, network.currency);
        }
        Commands::Cost {
            gas_limit,
            gas_price,
        } => {
            let gas_limit = parse_hex_quantity("gas limit", &gas_limit)?;
            let gas_price: U256 = match gas_price {
                Some(price) => parse_hex_quantity("gas price", &price)?,
                None => session()?.gas_prices().await?.standard,
            };
            let cost = calculate_cost(gas_limit, gas_price);
            println!(
                "{} {} ({} wei at {} gwei)",
                cost.eth, network.currency, cost.wei, cost.gwei
            );
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eth_txbuilder=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
