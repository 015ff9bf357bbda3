//! Gateway API
//!
//! Provides HTTP endpoints for:
//! - Health (no credential)
//! - Exchange reference data (public)
//! - Account state (bearer token or signature)
//! - Transfers and withdrawals (signature only)
//!
//! The authenticator runs as route middleware, so a rejected request never
//! reaches a handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use oc_lib::httpsig::{ObservedRequest, HEADER_SUB_ACCOUNT};
use oc_lib::types::{parse_amount, HealthResponse, TransferRequest, WithdrawalRequest};
use oc_lib::{Authenticator, Credential, RouteClass};
use serde::Deserialize;

use crate::error::ApiError;
use crate::exchange::{ExchangeRegistry, Operation};

/// Largest request body the gateway buffers for authentication.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// API server state
#[derive(Clone)]
pub struct ApiState {
    pub authenticator: Arc<Authenticator>,
    pub exchanges: Arc<ExchangeRegistry>,
}

impl ApiState {
    pub fn new(authenticator: Authenticator, exchanges: ExchangeRegistry) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            exchanges: Arc::new(exchanges),
        }
    }
}

/// State of the authentication middleware for one group of routes.
#[derive(Clone)]
struct Guard {
    class: RouteClass,
    authenticator: Arc<Authenticator>,
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let guard = |class| Guard {
        class,
        authenticator: Arc::clone(&state.authenticator),
    };

    let public = Router::new()
        .route("/v1/exchanges/:exchange/assets", get(list_assets))
        .route("/v1/exchanges/:exchange/account-types", get(list_account_types))
        .route_layer(middleware::from_fn_with_state(
            guard(RouteClass::Public),
            authenticate,
        ));

    let read = Router::new()
        .route("/v1/exchanges/:exchange/balances", get(list_balances))
        .route("/v1/exchanges/:exchange/deposit-address", get(get_deposit_address))
        .route("/v1/exchanges/:exchange/subaccounts", get(list_subaccounts))
        .route(
            "/v1/exchanges/:exchange/withdrawal-history",
            get(list_withdrawal_history),
        )
        .route_layer(middleware::from_fn_with_state(
            guard(RouteClass::ReadOrWrite),
            authenticate,
        ));

    let write = Router::new()
        .route("/v1/exchanges/:exchange/account-transfer", post(account_transfer))
        .route("/v1/exchanges/:exchange/withdrawal", post(create_withdrawal))
        .route_layer(middleware::from_fn_with_state(
            guard(RouteClass::Write),
            authenticate,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(public)
        .merge(read)
        .merge(write)
        .with_state(state)
}

/// Buffers the body, applies the route policy, then hands the request on
/// with the same bytes and the accepted [`Credential`] as an extension.
async fn authenticate(
    State(guard): State<Guard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| {
        ApiError::payload_too_large(format!(
            "request body exceeds {} bytes",
            MAX_BODY_BYTES
        ))
    })?;

    let observed = ObservedRequest::from_parts(&parts, &bytes);
    let credential = match guard.authenticator.authenticate(guard.class, &observed) {
        Ok(credential) => credential,
        Err(e) => {
            tracing::warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                "rejected request"
            );
            return Err(e.into());
        }
    };

    match &credential {
        Credential::Bearer { id } => {
            tracing::debug!(path = %parts.uri.path(), token_id = %id, "authenticated by bearer token")
        }
        Credential::Signature(params) => {
            tracing::debug!(path = %parts.uri.path(), created = ?params.created(), "authenticated by signature")
        }
        Credential::Anonymous => {}
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(credential);
    Ok(next.run(request).await)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// The `sub-account` header, else the `sub-account` query parameter.
fn requested_sub_account(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    headers
        .get(HEADER_SUB_ACCOUNT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            query
                .get(HEADER_SUB_ACCOUNT)
                .filter(|v| !v.is_empty())
                .cloned()
        })
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))
}

/// Resolves the account, then runs the operation on the exchange's backend.
async fn run(
    state: &ApiState,
    exchange: &str,
    subaccount: Option<String>,
    operation: Operation,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = state.exchanges.account(exchange, subaccount.as_deref())?;
    let backend = state.exchanges.backend(exchange)?;

    let name = operation.name();
    let is_write = operation.is_write();
    match backend.call(operation, &account).await {
        Ok(value) => Ok(Json(value)),
        Err(e) => {
            tracing::warn!(exchange, operation = name, error = %e, "exchange call failed");
            let message = format!("failed to {}: {}", name, e);
            if is_write {
                Err(ApiError::conflict(message))
            } else {
                Err(ApiError::internal(message))
            }
        }
    }
}

/// GET /v1/exchanges/:exchange/assets
async fn list_assets(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run(&state, &exchange, None, Operation::ListAssets).await
}

/// GET /v1/exchanges/:exchange/account-types
async fn list_account_types(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run(&state, &exchange, None, Operation::ListAccountTypes).await
}

/// GET /v1/exchanges/:exchange/balances?type=
async fn list_balances(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    let account_type = query.get("type").filter(|t| !t.is_empty()).cloned();
    run(
        &state,
        &exchange,
        subaccount,
        Operation::ListBalances { account_type },
    )
    .await
}

/// GET /v1/exchanges/:exchange/deposit-address?symbol=&network=
async fn get_deposit_address(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    state.exchanges.account(&exchange, subaccount.as_deref())?;

    let symbol = required(query.get("symbol").cloned(), "symbol")?;
    let network = required(query.get("network").cloned(), "network")?;
    run(
        &state,
        &exchange,
        subaccount,
        Operation::GetDepositAddress { symbol, network },
    )
    .await
}

/// GET /v1/exchanges/:exchange/subaccounts
async fn list_subaccounts(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    run(&state, &exchange, subaccount, Operation::ListSubaccounts).await
}

/// GET /v1/exchanges/:exchange/withdrawal-history?limit=&page_token=
async fn list_withdrawal_history(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    state.exchanges.account(&exchange, subaccount.as_deref())?;

    let limit = match query.get("limit").filter(|l| !l.is_empty()) {
        None => None,
        Some(l) => match l.parse::<i64>() {
            Ok(n) if n > 0 => Some(u32::try_from(n).unwrap_or(u32::MAX)),
            Ok(_) => {
                return Err(ApiError::bad_request(
                    "invalid limit parameter: must be greater than 0",
                ))
            }
            Err(_) => {
                return Err(ApiError::bad_request(
                    "invalid limit parameter: must be a number",
                ))
            }
        },
    };
    let page_token = query.get("page_token").filter(|t| !t.is_empty()).cloned();

    run(
        &state,
        &exchange,
        subaccount,
        Operation::ListWithdrawalHistory { limit, page_token },
    )
    .await
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}

/// POST /v1/exchanges/:exchange/account-transfer
async fn account_transfer(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    state.exchanges.account(&exchange, subaccount.as_deref())?;

    let mut req: TransferRequest = parse_body(&body)?;
    req.symbol = Some(required(req.symbol, "symbol")?);
    match parse_amount(&req.amount) {
        Ok(false) => {}
        Ok(true) => return Err(ApiError::bad_request("amount must be greater than 0")),
        Err(message) => return Err(ApiError::bad_request(message)),
    }

    let sides = [&req.from, &req.to, &req.from_type, &req.to_type];
    if sides.iter().all(|s| s.as_deref().unwrap_or_default().is_empty()) {
        return Err(ApiError::bad_request(
            "must specify at least one of to, from, from_type, to_type",
        ));
    }

    // from/to may name a sub-account by alias; the backend gets ids.
    for (side, label) in [(&mut req.from, "from"), (&mut req.to, "to")] {
        if let Some(name) = side.as_deref().filter(|n| !n.is_empty()) {
            let id = state
                .exchanges
                .subaccount_id(&exchange, name)?
                .ok_or_else(|| ApiError::bad_request(format!("invalid {} account", label)))?;
            *side = Some(id);
        }
    }

    tracing::info!(
        exchange = %exchange,
        sub_account = ?subaccount,
        symbol = ?req.symbol,
        amount = %req.amount,
        "account transfer requested"
    );
    run(&state, &exchange, subaccount, Operation::AccountTransfer(req)).await
}

/// POST /v1/exchanges/:exchange/withdrawal
async fn create_withdrawal(
    State(state): State<ApiState>,
    Path(exchange): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subaccount = requested_sub_account(&headers, &query);
    state.exchanges.account(&exchange, subaccount.as_deref())?;

    let mut req: WithdrawalRequest = parse_body(&body)?;
    if req.address.trim().is_empty() {
        return Err(ApiError::bad_request("to address is required"));
    }
    req.symbol = Some(required(req.symbol, "symbol")?);
    req.network = Some(required(req.network, "network")?);
    parse_amount(&req.amount).map_err(ApiError::bad_request)?;

    tracing::info!(
        exchange = %exchange,
        sub_account = ?subaccount,
        symbol = ?req.symbol,
        network = ?req.network,
        amount = %req.amount,
        "withdrawal requested"
    );
    run(&state, &exchange, subaccount, Operation::CreateWithdrawal(req)).await
}
