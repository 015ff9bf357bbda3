//! HTTP client for the gateway API
//!
//! Every request is built as an `http::Request` first so the exact bytes that
//! are signed are the bytes that are sent.

use std::time::Duration;

use anyhow::{Context, Result};
use http::{header, HeaderValue, Method};
use oc_lib::httpsig::{Ed25519Signer, RequestSigner, HEADER_SUB_ACCOUNT};
use oc_lib::types::{ErrorResponse, TransferRequest, WithdrawalRequest};
use oc_lib::RouteClass;
use serde::Serialize;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and request options for [`ApiClient`].
#[derive(Default)]
pub struct ClientOptions {
    pub bearer_token: Option<String>,
    pub signer: Option<Ed25519Signer>,
    pub sub_account: Option<String>,
    pub timeout: Option<Duration>,
}

/// How one request is authenticated.
enum Auth<'a> {
    None,
    Bearer(&'a str),
    Signature(&'a RequestSigner<Ed25519Signer>),
}

/// API client for the gateway
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
    signer: Option<RequestSigner<Ed25519Signer>>,
    sub_account: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            bearer_token: options.bearer_token.filter(|t| !t.is_empty()),
            signer: options.signer.map(RequestSigner::new),
            sub_account: options.sub_account.filter(|s| !s.is_empty()),
        })
    }

    /// Reads prefer the bearer token, everything else prefers a signature.
    /// Write routes accept nothing but a signature.
    fn choose_auth(&self, class: RouteClass, method: &Method) -> Result<Auth<'_>> {
        if class == RouteClass::Write {
            let signer = self.signer.as_ref().with_context(|| {
                format!("a signing key is required for {} requests", method)
            })?;
            return Ok(Auth::Signature(signer));
        }

        match (&self.bearer_token, &self.signer) {
            (Some(token), _) if *method == Method::GET => Ok(Auth::Bearer(token)),
            (_, Some(signer)) => Ok(Auth::Signature(signer)),
            (Some(token), None) => Ok(Auth::Bearer(token)),
            (None, None) if class == RouteClass::Public => Ok(Auth::None),
            (None, None) => {
                anyhow::bail!("no credentials configured; pass --bearer or --signing-key")
            }
        }
    }

    /// Builds the request with its credential attached.
    fn prepare(
        &self,
        class: RouteClass,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<http::Request<Vec<u8>>> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("Invalid server URL: {}", self.base_url))?;

        let mut pairs = query.to_vec();
        if let Some(sub) = &self.sub_account {
            pairs.push((HEADER_SUB_ACCOUNT, sub.as_str()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let has_body = body.is_some();
        let mut request = http::Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .body(body.unwrap_or_default())
            .context("Failed to build request")?;

        if has_body {
            request.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(sub) = &self.sub_account {
            let value = HeaderValue::from_str(sub).context("Invalid sub-account name")?;
            request.headers_mut().insert(HEADER_SUB_ACCOUNT, value);
        }

        match self.choose_auth(class, &method)? {
            Auth::None => {}
            Auth::Bearer(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Invalid bearer token")?;
                request.headers_mut().insert(header::AUTHORIZATION, value);
            }
            Auth::Signature(signer) => {
                // The gateway insists sub-account is covered whenever it is sent.
                let extra: &[&str] = if self.sub_account.is_some() {
                    &[HEADER_SUB_ACCOUNT]
                } else {
                    &[]
                };
                signer
                    .sign(&mut request, extra)
                    .context("Failed to sign request")?;
            }
        }

        Ok(request)
    }

    async fn send(&self, request: http::Request<Vec<u8>>) -> Result<serde_json::Value> {
        tracing::debug!(method = %request.method(), uri = %request.uri(), "sending request");

        let request = reqwest::Request::try_from(request).context("Failed to build request")?;
        let response = self
            .client
            .execute(request)
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("Server returned {}: {}", status, error_message(&body));
        }

        serde_json::from_slice(&body).context("Failed to parse response JSON")
    }

    async fn get(
        &self,
        class: RouteClass,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let request = self.prepare(class, Method::GET, path, query, None)?;
        self.send(request).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<serde_json::Value> {
        let body = serde_json::to_vec(body).context("Failed to encode request body")?;
        let request = self.prepare(RouteClass::Write, Method::POST, path, &[], Some(body))?;
        self.send(request).await
    }

    pub async fn list_assets(&self, exchange: &str) -> Result<serde_json::Value> {
        self.get(RouteClass::Public, &exchange_path(exchange, "assets"), &[])
            .await
    }

    pub async fn list_account_types(&self, exchange: &str) -> Result<serde_json::Value> {
        self.get(RouteClass::Public, &exchange_path(exchange, "account-types"), &[])
            .await
    }

    pub async fn list_balances(
        &self,
        exchange: &str,
        account_type: Option<&str>,
    ) -> Result<serde_json::Value> {
        let query: Vec<(&str, &str)> = account_type.map(|t| ("type", t)).into_iter().collect();
        self.get(
            RouteClass::ReadOrWrite,
            &exchange_path(exchange, "balances"),
            &query,
        )
        .await
    }

    pub async fn get_deposit_address(
        &self,
        exchange: &str,
        symbol: &str,
        network: &str,
    ) -> Result<serde_json::Value> {
        self.get(
            RouteClass::ReadOrWrite,
            &exchange_path(exchange, "deposit-address"),
            &[("symbol", symbol), ("network", network)],
        )
        .await
    }

    pub async fn list_subaccounts(&self, exchange: &str) -> Result<serde_json::Value> {
        self.get(
            RouteClass::ReadOrWrite,
            &exchange_path(exchange, "subaccounts"),
            &[],
        )
        .await
    }

    pub async fn list_withdrawal_history(
        &self,
        exchange: &str,
        limit: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<serde_json::Value> {
        let limit = limit.map(|l| l.to_string());
        let mut query = Vec::new();
        if let Some(limit) = &limit {
            query.push(("limit", limit.as_str()));
        }
        if let Some(token) = page_token {
            query.push(("page_token", token));
        }
        self.get(
            RouteClass::ReadOrWrite,
            &exchange_path(exchange, "withdrawal-history"),
            &query,
        )
        .await
    }

    pub async fn account_transfer(
        &self,
        exchange: &str,
        transfer: &TransferRequest,
    ) -> Result<serde_json::Value> {
        self.post(&exchange_path(exchange, "account-transfer"), transfer)
            .await
    }

    pub async fn create_withdrawal(
        &self,
        exchange: &str,
        withdrawal: &WithdrawalRequest,
    ) -> Result<serde_json::Value> {
        self.post(&exchange_path(exchange, "withdrawal"), withdrawal)
            .await
    }
}

fn exchange_path(exchange: &str, resource: &str) -> String {
    format!("/v1/exchanges/{}/{}", exchange, resource)
}

/// The message of a gateway error envelope, else the raw body text.
fn error_message(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorResponse>(body) {
        return format!("{} ({})", envelope.message, envelope.status);
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "Unknown error".to_string()
    } else {
        text
    }
}
