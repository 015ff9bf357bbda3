//! oc - command-line client for the offchain gateway
//!
//! Reads go out with a bearer token when one is given; transfers and
//! withdrawals are always signed with the Ed25519 signing key.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oc_lib::httpsig::Ed25519Signer;
use oc_lib::types::{TransferRequest, WithdrawalRequest};
use oc_lib::{DefaultSecretResolver, SecretResolver};

mod client;
mod commands;

#[derive(Parser)]
#[command(name = "oc")]
#[command(author, version, about = "Offchain gateway CLI", long_about = None)]
struct Cli {
    /// Gateway URL
    #[arg(long, env = "OFFCHAIN_URL", default_value = "http://127.0.0.1:6333")]
    url: String,

    /// Bearer token secret reference, e.g. env:OFFCHAIN_TOKEN
    #[arg(long, env = "OFFCHAIN_BEARER")]
    bearer: Option<String>,

    /// Signing key secret reference, e.g. file:~/.offchain/key
    #[arg(long, env = "OFFCHAIN_SIGNING_KEY")]
    signing_key: Option<String>,

    /// Sub-account id or alias to act on
    #[arg(long)]
    sub_account: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage signing keys
    #[command(subcommand)]
    Keys(KeyCommands),

    #[command(flatten)]
    Exchange(ExchangeCommands),
}

/// Calls against the gateway, all scoped to one exchange.
#[derive(Subcommand)]
enum ExchangeCommands {
    /// List assets supported by an exchange
    Assets { exchange: String },

    /// List account types of an exchange
    AccountTypes { exchange: String },

    /// List balances
    Balances {
        exchange: String,

        /// Account type, e.g. funding or trading
        #[arg(long = "type")]
        account_type: Option<String>,
    },

    /// Show the deposit address for an asset
    DepositAddress {
        exchange: String,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        network: String,
    },

    /// List sub-accounts
    Subaccounts { exchange: String },

    /// List past withdrawals
    WithdrawalHistory {
        exchange: String,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Move funds between accounts on one exchange
    Transfer {
        exchange: String,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        amount: String,

        /// Source sub-account id or alias (main account when omitted)
        #[arg(long)]
        from: Option<String>,

        /// Destination sub-account id or alias (main account when omitted)
        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        from_type: Option<String>,

        #[arg(long)]
        to_type: Option<String>,
    },

    /// Withdraw funds to an external address
    Withdraw {
        exchange: String,

        /// Destination address
        #[arg(long)]
        address: String,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        network: String,

        #[arg(long)]
        amount: String,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generate a new Ed25519 signing key
    Generate,

    /// Print the public key of a signing key
    Public {
        /// Signing key secret reference
        #[arg(long)]
        secret: String,
    },
}

/// Build an API client from the global credential flags
async fn create_api_client(cli: &Cli) -> Result<client::ApiClient> {
    let resolver = DefaultSecretResolver;

    let bearer_token = match &cli.bearer {
        Some(reference) => Some(
            resolver
                .load(reference)
                .await
                .context("Failed to load bearer token")?,
        ),
        None => None,
    };

    let signer = match &cli.signing_key {
        Some(reference) => {
            let seed = resolver
                .load(reference)
                .await
                .context("Failed to load signing key")?;
            Some(Ed25519Signer::from_hex_seed(&seed)?)
        }
        None => None,
    };

    client::ApiClient::new(
        &cli.url,
        client::ClientOptions {
            bearer_token,
            signer,
            sub_account: cli.sub_account.clone(),
            timeout: Some(Duration::from_secs(cli.timeout)),
        },
    )
}

async fn run(cli: Cli) -> Result<()> {
    use commands::exchange;

    let command = match &cli.command {
        Commands::Keys(KeyCommands::Generate) => return commands::keys::generate(),
        Commands::Keys(KeyCommands::Public { secret }) => {
            return commands::keys::public(secret).await
        }
        Commands::Exchange(command) => command,
    };

    let client = create_api_client(&cli).await?;
    match command {
        ExchangeCommands::Assets { exchange: ex } => exchange::assets(&client, ex).await,
        ExchangeCommands::AccountTypes { exchange: ex } => {
            exchange::account_types(&client, ex).await
        }
        ExchangeCommands::Balances {
            exchange: ex,
            account_type,
        } => exchange::balances(&client, ex, account_type.as_deref()).await,
        ExchangeCommands::DepositAddress {
            exchange: ex,
            symbol,
            network,
        } => exchange::deposit_address(&client, ex, symbol, network).await,
        ExchangeCommands::Subaccounts { exchange: ex } => exchange::subaccounts(&client, ex).await,
        ExchangeCommands::WithdrawalHistory {
            exchange: ex,
            limit,
            page_token,
        } => exchange::withdrawal_history(&client, ex, *limit, page_token.as_deref()).await,
        ExchangeCommands::Transfer {
            exchange: ex,
            symbol,
            amount,
            from,
            to,
            from_type,
            to_type,
        } => {
            let request = TransferRequest {
                symbol: Some(symbol.clone()),
                amount: amount.clone(),
                from: from.clone(),
                to: to.clone(),
                from_type: from_type.clone(),
                to_type: to_type.clone(),
            };
            exchange::transfer(&client, ex, request).await
        }
        ExchangeCommands::Withdraw {
            exchange: ex,
            address,
            symbol,
            network,
            amount,
        } => {
            let request = WithdrawalRequest {
                address: address.clone(),
                symbol: Some(symbol.clone()),
                network: Some(network.clone()),
                amount: amount.clone(),
            };
            exchange::withdraw(&client, ex, request).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
