//! Integration tests for the billing HTTP surface.
//!
//! These tests drive the full router (auth middleware, handlers, error
//! mapping) against the in-memory ledger and mock providers:
//! 1. Authenticated endpoints refuse anonymous callers
//! 2. Provider callbacks settle attempts exactly once
//! 3. Credit debits follow the word-based pricing and refuse overdrafts

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use humanizer_ledger::adapters::ai::MockRewriter;
use humanizer_ledger::adapters::auth::MockSessionValidator;
use humanizer_ledger::adapters::http::{build_router, AuthState, BillingAppState};
use humanizer_ledger::adapters::memory::InMemoryLedger;
use humanizer_ledger::adapters::mpesa::MockPushProvider;
use humanizer_ledger::adapters::stripe::MockCardProvider;
use humanizer_ledger::config::ServerConfig;
use humanizer_ledger::domain::billing::{Entitlement, Plan, PlanCatalog};
use humanizer_ledger::domain::foundation::{Timestamp, UserId};

const WEBHOOK_SECRET: &str = "whsec_test";
const CALLBACK_TOKEN: &str = "cb-secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    ledger: Arc<InMemoryLedger>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_rewriter(MockRewriter::new())
    }

    fn with_rewriter(rewriter: MockRewriter) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let state = BillingAppState {
            entitlements: ledger.clone(),
            attempts: ledger.clone(),
            push_provider: Arc::new(MockPushProvider::new()),
            card_provider: Arc::new(MockCardProvider::new(WEBHOOK_SECRET)),
            rewriter: Arc::new(rewriter),
            catalog: Arc::new(PlanCatalog::new(vec![Plan::premium(
                1000,
                25,
                Some("price_premium".to_string()),
            )])),
            callback_token: CALLBACK_TOKEN.into(),
            rewrite_timeout: Duration::from_secs(5),
        };
        let auth: AuthState = Arc::new(
            MockSessionValidator::new()
                .with_test_user("token-alice", "alice")
                .with_test_user("token-bob", "bob"),
        );

        Self {
            router: build_router(state, auth, &ServerConfig::default()),
            ledger,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn post_webhook(&self, payload: &str, signature: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/payment-callbacks/webhook")
            .header("Content-Type", "application/json")
            .header("Stripe-Signature", signature)
            .body(Body::from(payload.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn provision(&self, token: &str) {
        let (status, _) = self.post("/accounts", Some(token), json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn start_mpesa_payment(&self, token: &str) -> String {
        let (status, body) = self
            .post(
                "/payment-intents",
                Some(token),
                json!({"planId": "premium", "channel": "mpesa", "phoneNumber": "0712345678"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["transactionId"].as_str().unwrap().to_string()
    }

    async fn balance(&self, user: &str) -> Option<i64> {
        self.ledger.balance_of(&UserId::new(user).unwrap()).await
    }
}

fn push_success(checkout_request_id: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": 25.00},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "PhoneNumber", "Value": 254712345678u64}
                    ]
                }
            }
        }
    })
}

fn push_callback_uri() -> String {
    format!("/payment-callbacks/push?token={}", CALLBACK_TOKEN)
}

fn sign(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn checkout_completed(session_id: &str, user: &str) -> String {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": {
            "object": {
                "id": session_id,
                "client_reference_id": user,
                "payment_status": "paid"
            }
        }
    })
    .to_string()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn anonymous_caller_is_refused() {
    let app = TestApp::new();

    let (status, body) = app.get("/account", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHENTICATED");

    let (status, _) = app
        .post("/humanize", None, json!({"text": "hello world"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_token_is_refused() {
    let app = TestApp::new();
    let (status, body) = app.get("/account", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn provisioning_is_idempotent() {
    let app = TestApp::new();
    app.provision("token-alice").await;

    let (status, body) = app.post("/accounts", Some("token-alice"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["plan"], "free");
    assert_eq!(body["user"]["credits"], 10);
}

#[tokio::test]
async fn account_view_before_provisioning_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.get("/account", Some("token-alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "ACCOUNT_NOT_FOUND");
}

// =============================================================================
// M-Pesa Push Flow
// =============================================================================

#[tokio::test]
async fn push_success_upgrades_once() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    let tx = app.start_mpesa_payment("token-alice").await;

    let (status, _) = app
        .get(&format!("/payment-status/{}", tx), Some("token-alice"))
        .await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..2 {
        let (status, body) = app.post(&push_callback_uri(), None, push_success(&tx)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ResultCode"], 0);
    }

    let (_, body) = app.get("/account", Some("token-alice")).await;
    assert_eq!(body["user"]["plan"], "premium");
    assert_eq!(body["user"]["credits"], 1010);

    let (_, body) = app
        .get(&format!("/payment-status/{}", tx), Some("token-alice"))
        .await;
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn concurrent_push_callbacks_grant_once() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    let tx = app.start_mpesa_payment("token-alice").await;

    let uri = push_callback_uri();
    let callbacks = (0..8).map(|_| app.post(&uri, None, push_success(&tx)));
    for (status, _) in futures::future::join_all(callbacks).await {
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.balance("alice").await, Some(1010));
}

#[tokio::test]
async fn push_callback_with_wrong_token_is_unauthorized() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    let tx = app.start_mpesa_payment("token-alice").await;

    let (status, body) = app
        .post("/payment-callbacks/push?token=guess", None, push_success(&tx))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "CALLBACK_UNAUTHORIZED");
    assert_eq!(app.balance("alice").await, Some(10));
}

#[tokio::test]
async fn push_callback_token_is_checked_before_body() {
    let app = TestApp::new();
    let garbage = |uri: &str| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap()
    };

    let (status, body) = app.send(garbage("/payment-callbacks/push?token=guess")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "CALLBACK_UNAUTHORIZED");

    let (status, body) = app.send(garbage(&push_callback_uri())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn push_callback_for_unknown_transaction_is_acked() {
    let app = TestApp::new();
    let (status, body) = app
        .post(&push_callback_uri(), None, push_success("ws_CO_UNKNOWN"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(app.ledger.attempt_count().await, 0);
}

#[tokio::test]
async fn payment_status_is_scoped_to_owner() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    let tx = app.start_mpesa_payment("token-alice").await;

    let (status, body) = app
        .get(&format!("/payment-status/{}", tx), Some("token-bob"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn mpesa_intent_without_phone_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/payment-intents",
            Some("token-alice"),
            json!({"planId": "premium", "channel": "mpesa"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "phoneNumber");
}

#[tokio::test]
async fn payment_history_lists_callers_attempts() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    app.start_mpesa_payment("token-alice").await;
    app.start_mpesa_payment("token-alice").await;

    let (status, body) = app.get("/payments", Some("token-alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/payments", Some("token-bob")).await;
    assert!(body["payments"].as_array().unwrap().is_empty());
}

// =============================================================================
// Card Webhook Flow
// =============================================================================

#[tokio::test]
async fn card_checkout_settles_through_webhook() {
    let app = TestApp::new();
    app.provision("token-alice").await;

    let (status, body) = app
        .post(
            "/payment-intents",
            Some("token-alice"),
            json!({"planId": "premium", "channel": "card"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["checkoutUrl"].as_str().is_some());
    let session = body["transactionId"].as_str().unwrap().to_string();

    let payload = checkout_completed(&session, "alice");
    let (status, body) = app
        .post_webhook(&payload, &sign(&payload, WEBHOOK_SECRET))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(app.balance("alice").await, Some(1010));
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = TestApp::new();
    app.provision("token-alice").await;
    let payload = checkout_completed("cs_test_1", "alice");

    let (status, body) = app
        .post_webhook(&payload, &sign(&payload, "whsec_wrong"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "SIGNATURE_INVALID");
    assert_eq!(app.balance("alice").await, Some(10));
}

// =============================================================================
// Humanize
// =============================================================================

#[tokio::test]
async fn humanize_charges_by_word_count() {
    let app = TestApp::with_rewriter(MockRewriter::new().with_response("Rewritten."));
    app.provision("token-alice").await;
    let text = vec!["word"; 250].join(" ");

    let (status, body) = app
        .post("/humanize", Some("token-alice"), json!({"text": text}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["humanizedText"], "Rewritten.");
    assert_eq!(body["creditsUsed"], 3);
    assert_eq!(body["remainingCredits"], 7);
}

#[tokio::test]
async fn humanize_without_enough_credit_is_payment_required() {
    let app = TestApp::new();
    let mut entitlement = Entitlement::new_free(UserId::new("alice").unwrap(), Timestamp::now());
    entitlement.credits = 2;
    app.ledger.put_entitlement(entitlement).await;
    let text = vec!["word"; 250].join(" ");

    let (status, body) = app
        .post("/humanize", Some("token-alice"), json!({"text": text}))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error_code"], "INSUFFICIENT_CREDIT");
    assert_eq!(body["details"]["required"], 3);
    assert_eq!(body["details"]["available"], 2);
    assert_eq!(app.balance("alice").await, Some(2));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/humanize")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer token-alice")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_REQUEST");
}
