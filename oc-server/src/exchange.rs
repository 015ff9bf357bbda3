//! Exchange backends
//!
//! Handlers never talk to an exchange directly. They resolve the target
//! account from configuration and hand an [`Operation`] to the exchange's
//! [`ExchangeBackend`]. Exchanges listed in configuration without a linked
//! backend answer `501 Not Implemented`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oc_lib::config::{ExchangeConfig, ServerConfig, SubaccountConfig};
use oc_lib::types::{TransferRequest, WithdrawalRequest};
use serde::Serialize;

use crate::error::ApiError;

/// One call against an exchange account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    ListAssets,
    ListAccountTypes,
    ListBalances {
        account_type: Option<String>,
    },
    GetDepositAddress {
        symbol: String,
        network: String,
    },
    ListSubaccounts,
    ListWithdrawalHistory {
        limit: Option<u32>,
        page_token: Option<String>,
    },
    AccountTransfer(TransferRequest),
    CreateWithdrawal(WithdrawalRequest),
}

impl Operation {
    /// Whether the operation moves funds.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::AccountTransfer(_) | Operation::CreateWithdrawal(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListAssets => "list assets",
            Operation::ListAccountTypes => "list account types",
            Operation::ListBalances { .. } => "list balances",
            Operation::GetDepositAddress { .. } => "get deposit address",
            Operation::ListSubaccounts => "list subaccounts",
            Operation::ListWithdrawalHistory { .. } => "list withdrawal history",
            Operation::AccountTransfer(_) => "create account transfer",
            Operation::CreateWithdrawal(_) => "create withdrawal",
        }
    }
}

/// The account an operation runs against: an exchange's main account, or one
/// of its configured sub-accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub exchange: String,
    pub subaccount: Option<SubaccountConfig>,
}

/// Adapter for one exchange's API.
#[async_trait]
pub trait ExchangeBackend: Send + Sync {
    async fn call(&self, operation: Operation, account: &Account) -> anyhow::Result<serde_json::Value>;
}

struct Registered {
    config: ExchangeConfig,
    backend: Option<Arc<dyn ExchangeBackend>>,
}

/// Configured exchanges and the backends linked to them.
#[derive(Default)]
pub struct ExchangeRegistry {
    exchanges: HashMap<String, Registered>,
}

impl ExchangeRegistry {
    /// Registers every configured exchange with no backend linked.
    pub fn from_config(config: &ServerConfig) -> Self {
        let exchanges = config
            .exchanges
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    Registered {
                        config: e.clone(),
                        backend: None,
                    },
                )
            })
            .collect();
        Self { exchanges }
    }

    /// Links a backend to a configured exchange.
    pub fn link(&mut self, exchange: &str, backend: Arc<dyn ExchangeBackend>) -> anyhow::Result<()> {
        let registered = self
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| anyhow::anyhow!("exchange {} is not configured", exchange))?;
        registered.backend = Some(backend);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Resolves the target account. `subaccount` matches a configured id or
    /// alias; `None` is the main account.
    pub fn account(&self, exchange: &str, subaccount: Option<&str>) -> Result<Account, ApiError> {
        let registered = self.registered(exchange)?;
        let subaccount = match subaccount {
            None => None,
            Some(name) => Some(registered.config.subaccount(name).cloned().ok_or_else(|| {
                ApiError::not_found(format!(
                    "subaccount {} for exchange {} not found",
                    name, exchange
                ))
            })?),
        };
        Ok(Account {
            exchange: exchange.to_string(),
            subaccount,
        })
    }

    /// Resolves a transfer side (`from`/`to`) to a sub-account id.
    pub fn subaccount_id(&self, exchange: &str, name: &str) -> Result<Option<String>, ApiError> {
        let registered = self.registered(exchange)?;
        Ok(registered.config.subaccount(name).map(|s| s.id.clone()))
    }

    pub fn backend(&self, exchange: &str) -> Result<Arc<dyn ExchangeBackend>, ApiError> {
        self.registered(exchange)?.backend.clone().ok_or_else(|| {
            ApiError::not_implemented(format!("exchange {} has no backend linked", exchange))
        })
    }

    fn registered(&self, exchange: &str) -> Result<&Registered, ApiError> {
        self.exchanges
            .get(exchange)
            .ok_or_else(|| ApiError::not_found(format!("exchange not found: {}", exchange)))
    }
}
