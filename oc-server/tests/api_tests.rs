//! Router tests: the authentication policy and handlers, driven through the
//! full axum stack with a recording exchange backend.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use oc_lib::config::{ExchangeConfig, ServerConfig, SubaccountConfig};
use oc_lib::httpsig::{Ed25519Signer, Ed25519Verifier, RequestSigner, Signer, Verifier};
use oc_lib::{Authenticator, BearerToken};
use oc_server::{create_router, Account, ApiState, ExchangeBackend, ExchangeRegistry, Operation};
use tower::ServiceExt; // for `oneshot`

const NO_EXTRA: &[&str] = &[];
const BEARER: &str = "read-token";

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(Operation, Account)>>,
    fail: bool,
}

#[async_trait]
impl ExchangeBackend for Recorder {
    async fn call(&self, operation: Operation, account: &Account) -> anyhow::Result<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.clone(), account.clone()));
        if self.fail {
            anyhow::bail!("exchange rejected the request");
        }
        Ok(serde_json::json!({"id": "op-1", "status": "pending"}))
    }
}

impl Recorder {
    fn calls(&self) -> Vec<(Operation, Account)> {
        self.calls.lock().unwrap().clone()
    }
}

struct Gateway {
    app: Router,
    backend: Arc<Recorder>,
    signer: RequestSigner<Ed25519Signer>,
}

fn gateway_with(public_read_endpoints: bool, fail: bool) -> Gateway {
    let key = Ed25519Signer::generate().unwrap();
    let verifier: Arc<dyn Verifier> = Arc::new(Ed25519Verifier::new(&key.public_key()).unwrap());

    let config = ServerConfig {
        exchanges: vec![ExchangeConfig {
            id: "okx".into(),
            subaccounts: vec![
                SubaccountConfig {
                    id: "1001".into(),
                    alias: Some("desk-a".into()),
                },
                SubaccountConfig {
                    id: "1002".into(),
                    alias: Some("desk-b".into()),
                },
            ],
        }],
        ..Default::default()
    };

    let backend = Arc::new(Recorder {
        fail,
        ..Default::default()
    });
    let mut exchanges = ExchangeRegistry::from_config(&config);
    exchanges.link("okx", backend.clone()).unwrap();

    let authenticator = Authenticator::new(
        vec![BearerToken::new("reader", BEARER)],
        vec![verifier],
        public_read_endpoints,
    );

    Gateway {
        app: create_router(ApiState::new(authenticator, exchanges)),
        backend,
        signer: RequestSigner::new(key),
    }
}

fn gateway() -> Gateway {
    gateway_with(false, false)
}

impl Gateway {
    fn signed(&self, method: &str, uri: &str, body: &str, sub_account: Option<&str>) -> Request<Body> {
        let mut req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.as_bytes().to_vec())
            .unwrap();
        match sub_account {
            Some(sub) => {
                req.headers_mut()
                    .insert("sub-account", sub.parse().unwrap());
                self.signer.sign(&mut req, &["sub-account"]).unwrap();
            }
            None => self.signer.sign(&mut req, NO_EXTRA).unwrap(),
        }
        req.map(Body::from)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn public_routes_need_no_credential() {
    let gw = gateway();
    let (status, body) = gw.send(get("/v1/exchanges/okx/assets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(gw.backend.calls()[0].0, Operation::ListAssets);
}

#[tokio::test]
async fn read_route_without_credential() {
    let gw = gateway();
    let (status, body) = gw.send(get("/v1/exchanges/okx/balances")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 3);
    assert!(gw.backend.calls().is_empty());

    let gw = gateway_with(true, false);
    let (status, _) = gw.send(get("/v1/exchanges/okx/balances")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn read_route_with_bearer() {
    let gw = gateway();
    let req = Request::builder()
        .uri("/v1/exchanges/okx/balances?type=funding")
        .header("authorization", format!("Bearer {}", BEARER))
        .body(Body::empty())
        .unwrap();
    let (status, _) = gw.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        gw.backend.calls()[0].0,
        Operation::ListBalances {
            account_type: Some("funding".into())
        }
    );

    let req = Request::builder()
        .uri("/v1/exchanges/okx/balances")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = gw.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "Unauthenticated");
    assert_eq!(body["message"], "invalid bearer token");
}

#[tokio::test]
async fn read_route_with_signature_and_sub_account() {
    let gw = gateway();
    let req = gw.signed("GET", "/v1/exchanges/okx/subaccounts", "", Some("desk-b"));
    let (status, _) = gw.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let (_, account) = &gw.backend.calls()[0];
    assert_eq!(account.subaccount.as_ref().unwrap().id, "1002");
}

#[tokio::test]
async fn write_route_rejects_bearer() {
    let gw = gateway_with(true, false);
    let req = Request::builder()
        .method("POST")
        .uri("/v1/exchanges/okx/withdrawal")
        .header("authorization", format!("Bearer {}", BEARER))
        .body(Body::from(r#"{"address":"0xabc","symbol":"USDT","network":"ETH","amount":"5"}"#))
        .unwrap();
    let (status, body) = gw.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "missing content-digest header");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn signed_withdrawal_reaches_backend() {
    let gw = gateway();
    let body = r#"{"address":"0xabc","symbol":"USDT","network":"ETH","amount":"5"}"#;
    let req = gw.signed("POST", "/v1/exchanges/okx/withdrawal", body, None);
    let (status, resp) = gw.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["id"], "op-1");

    match &gw.backend.calls()[0] {
        (Operation::CreateWithdrawal(w), account) => {
            assert_eq!(w.address, "0xabc");
            assert_eq!(w.network.as_deref(), Some("ETH"));
            assert_eq!(account.subaccount, None);
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn tampered_body_is_invalid_signature() {
    let gw = gateway();
    let req = gw.signed(
        "POST",
        "/v1/exchanges/okx/withdrawal",
        r#"{"address":"0xabc","symbol":"USDT","network":"ETH","amount":"5"}"#,
        None,
    );
    let (parts, _) = req.into_parts();
    let tampered = Request::from_parts(
        parts,
        Body::from(r#"{"address":"0xevil","symbol":"USDT","network":"ETH","amount":"5"}"#),
    );

    let (status, body) = gw.send(tampered).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid signature");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn replayed_signature_with_new_sub_account_is_rejected() {
    let gw = gateway();
    let body = r#"{"symbol":"USDT","amount":"5","to_type":"trading"}"#;
    let mut req = gw.signed("POST", "/v1/exchanges/okx/account-transfer", body, None);
    req.headers_mut()
        .insert("sub-account", "desk-a".parse().unwrap());

    let (status, resp) = gw.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "missing sub-account in signature input");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn transfer_resolves_aliases() {
    let gw = gateway();
    let body = r#"{"symbol":"USDT","amount":"5","from":"desk-a","to":"1002"}"#;
    let req = gw.signed("POST", "/v1/exchanges/okx/account-transfer", body, Some("desk-a"));
    let (status, _) = gw.send(req).await;
    assert_eq!(status, StatusCode::OK);

    match &gw.backend.calls()[0] {
        (Operation::AccountTransfer(t), account) => {
            assert_eq!(t.from.as_deref(), Some("1001"));
            assert_eq!(t.to.as_deref(), Some("1002"));
            assert_eq!(account.subaccount.as_ref().unwrap().id, "1001");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn transfer_validation() {
    let gw = gateway();
    let cases = [
        (r#"{"amount":"5","to_type":"trading"}"#, "symbol is required"),
        (r#"{"symbol":"USDT","to_type":"trading"}"#, "amount is required"),
        (r#"{"symbol":"USDT","amount":"0","to_type":"trading"}"#, "amount must be greater than 0"),
        (r#"{"symbol":"USDT","amount":"5"}"#, "must specify at least one of to, from, from_type, to_type"),
        (r#"{"symbol":"USDT","amount":"5","to":"desk-z"}"#, "invalid to account"),
        ("not json", ""),
    ];

    for (body, message) in cases {
        let req = gw.signed("POST", "/v1/exchanges/okx/account-transfer", body, None);
        let (status, resp) = gw.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        if !message.is_empty() {
            assert_eq!(resp["message"], message);
        }
    }
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn withdrawal_validation() {
    let gw = gateway();
    let cases = [
        (r#"{"symbol":"USDT","network":"ETH","amount":"5"}"#, "to address is required"),
        (r#"{"address":"0xabc","network":"ETH","amount":"5"}"#, "symbol is required"),
        (r#"{"address":"0xabc","symbol":"USDT","amount":"5"}"#, "network is required"),
        (r#"{"address":"0xabc","symbol":"USDT","network":"ETH","amount":"five"}"#, "invalid amount: five"),
    ];

    for (body, message) in cases {
        let req = gw.signed("POST", "/v1/exchanges/okx/withdrawal", body, None);
        let (status, resp) = gw.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(resp["message"], message);
    }
}

#[tokio::test]
async fn deposit_address_and_history_queries() {
    let gw = gateway_with(true, false);

    let (status, resp) = gw
        .send(get("/v1/exchanges/okx/deposit-address?symbol=USDT"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "network is required");

    let (status, _) = gw
        .send(get("/v1/exchanges/okx/deposit-address?symbol=USDT&network=TRX"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = gw
        .send(get("/v1/exchanges/okx/withdrawal-history?limit=0"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "invalid limit parameter: must be greater than 0");

    let (status, _) = gw
        .send(get("/v1/exchanges/okx/withdrawal-history?limit=10&page_token=abc"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let calls = gw.backend.calls();
    assert_eq!(
        calls[0].0,
        Operation::GetDepositAddress {
            symbol: "USDT".into(),
            network: "TRX".into()
        }
    );
    assert_eq!(
        calls[1].0,
        Operation::ListWithdrawalHistory {
            limit: Some(10),
            page_token: Some("abc".into())
        }
    );
}

#[tokio::test]
async fn unknown_exchange_and_sub_account() {
    let gw = gateway_with(true, false);

    let (status, resp) = gw.send(get("/v1/exchanges/kraken/balances")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "exchange not found: kraken");

    let (status, resp) = gw
        .send(get("/v1/exchanges/okx/balances?sub-account=desk-z"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["status"], "NotFound");
}

#[tokio::test]
async fn backend_failures_map_by_route_class() {
    let gw = gateway_with(true, true);

    let (status, resp) = gw.send(get("/v1/exchanges/okx/balances")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["code"], 13);

    let body = r#"{"address":"0xabc","symbol":"USDT","network":"ETH","amount":"5"}"#;
    let req = gw.signed("POST", "/v1/exchanges/okx/withdrawal", body, None);
    let (status, resp) = gw.send(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        resp["message"],
        "failed to create withdrawal: exchange rejected the request"
    );
}
