//! Exchange account commands
//!
//! Each command prints the gateway's JSON response to stdout.

use anyhow::Result;
use oc_lib::types::{parse_amount, TransferRequest, WithdrawalRequest};

use crate::client::ApiClient;

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn assets(client: &ApiClient, exchange: &str) -> Result<()> {
    print_json(&client.list_assets(exchange).await?)
}

pub async fn account_types(client: &ApiClient, exchange: &str) -> Result<()> {
    print_json(&client.list_account_types(exchange).await?)
}

pub async fn balances(
    client: &ApiClient,
    exchange: &str,
    account_type: Option<&str>,
) -> Result<()> {
    print_json(&client.list_balances(exchange, account_type).await?)
}

pub async fn deposit_address(
    client: &ApiClient,
    exchange: &str,
    symbol: &str,
    network: &str,
) -> Result<()> {
    print_json(&client.get_deposit_address(exchange, symbol, network).await?)
}

pub async fn subaccounts(client: &ApiClient, exchange: &str) -> Result<()> {
    print_json(&client.list_subaccounts(exchange).await?)
}

pub async fn withdrawal_history(
    client: &ApiClient,
    exchange: &str,
    limit: Option<u32>,
    page_token: Option<&str>,
) -> Result<()> {
    print_json(
        &client
            .list_withdrawal_history(exchange, limit, page_token)
            .await?,
    )
}

pub async fn transfer(client: &ApiClient, exchange: &str, request: TransferRequest) -> Result<()> {
    check_amount(&request.amount)?;
    print_json(&client.account_transfer(exchange, &request).await?)
}

pub async fn withdraw(client: &ApiClient, exchange: &str, request: WithdrawalRequest) -> Result<()> {
    check_amount(&request.amount)?;
    print_json(&client.create_withdrawal(exchange, &request).await?)
}

/// Rejects amounts the gateway would refuse before signing anything.
fn check_amount(amount: &str) -> Result<()> {
    match parse_amount(amount) {
        Ok(false) => Ok(()),
        Ok(true) => anyhow::bail!("amount must be greater than 0"),
        Err(message) => anyhow::bail!(message),
    }
}
