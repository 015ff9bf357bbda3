//! Wire types shared by the gateway and its client
//!
//! Request bodies for the write routes, plus the health and error payloads.
//! Exchange responses are passed through as JSON and are not modelled here.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/exchanges/{exchange}/account-transfer`.
///
/// `from` and `to` name sub-accounts by id or alias; an empty side is the main
/// account. `from_type` and `to_type` name exchange account types such as
/// `funding` or `trading`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_type: Option<String>,
}

/// Body of `POST /v1/exchanges/{exchange}/withdrawal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub amount: String,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of every non-2xx gateway response. `code` and `status` follow the
/// gRPC status code names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub status: String,
    pub message: String,
}

/// Checks a plain decimal amount such as `10` or `0.25`. Returns whether the
/// amount is zero.
pub fn parse_amount(amount: &str) -> Result<bool, String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err("amount is required".to_string());
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction)
    {
        return Err(format!("invalid amount: {}", amount));
    }

    Ok(whole.bytes().chain(fraction.bytes()).all(|b| b == b'0'))
}
