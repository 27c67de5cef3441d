//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to application layer command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    GetAccountHandler, GetAccountQuery, GetPaymentStatusHandler, GetPaymentStatusQuery,
    HandleCardWebhookCommand, HandleCardWebhookHandler, HandlePushCallbackCommand,
    HandlePushCallbackHandler, HumanizeTextCommand, HumanizeTextHandler, InitiatePaymentCommand,
    InitiatePaymentHandler, ListPaymentsHandler, ListPaymentsQuery, ProvisionAccountCommand,
    ProvisionAccountHandler,
};
use crate::domain::billing::{BillingError, PlanCatalog};
use crate::ports::{
    CardPaymentProvider, EntitlementRepository, PaymentAttemptRepository, PushPaymentProvider,
    TextRewriter,
};

use super::super::middleware::RequireAuth;
use super::dto::{
    AccountResponse, CreatePaymentIntentRequest, ErrorResponse, HealthResponse, HumanizeRequest,
    HumanizeResponse, ListPaymentsParams, PaymentIntentResponse, PaymentListResponse,
    PaymentStatusResponse, PushCallbackAck, PushCallbackParams, WebhookAck,
};

const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub attempts: Arc<dyn PaymentAttemptRepository>,
    pub push_provider: Arc<dyn PushPaymentProvider>,
    pub card_provider: Arc<dyn CardPaymentProvider>,
    pub rewriter: Arc<dyn TextRewriter>,
    pub catalog: Arc<PlanCatalog>,
    /// Shared secret expected in the push callback's `token` parameter.
    pub callback_token: Arc<str>,
    /// Deadline for one language model call; must stay under the request timeout.
    pub rewrite_timeout: Duration,
}

impl BillingAppState {
    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.attempts.clone(),
            self.push_provider.clone(),
            self.card_provider.clone(),
            self.catalog.clone(),
        )
    }

    pub fn push_callback_handler(&self) -> HandlePushCallbackHandler {
        HandlePushCallbackHandler::new(self.attempts.clone(), self.callback_token.to_string())
    }

    pub fn card_webhook_handler(&self) -> HandleCardWebhookHandler {
        HandleCardWebhookHandler::new(self.attempts.clone(), self.card_provider.clone())
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.attempts.clone())
    }

    pub fn list_payments_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.attempts.clone())
    }

    pub fn provision_account_handler(&self) -> ProvisionAccountHandler {
        ProvisionAccountHandler::new(self.entitlements.clone())
    }

    pub fn get_account_handler(&self) -> GetAccountHandler {
        GetAccountHandler::new(self.entitlements.clone())
    }

    pub fn humanize_handler(&self) -> HumanizeTextHandler {
        HumanizeTextHandler::new(self.entitlements.clone(), self.rewriter.clone())
            .with_rewrite_timeout(self.rewrite_timeout)
    }
}

/// Unwraps a JSON body, turning extractor rejections into `InvalidRequest`.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, BillingError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| BillingError::invalid_request("body", rejection.body_text()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payment-status/:transaction_id - Status of one of the caller's payments
pub async fn get_payment_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let attempt = state
        .payment_status_handler()
        .handle(GetPaymentStatusQuery {
            user_id: user.id,
            transaction_id,
        })
        .await?;

    Ok(Json(PaymentStatusResponse::from(attempt)))
}

/// GET /payments - Caller's payment history, newest first
pub async fn list_payments(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListPaymentsParams>,
) -> Result<impl IntoResponse, BillingApiError> {
    let attempts = state
        .list_payments_handler()
        .handle(ListPaymentsQuery {
            user_id: user.id,
            limit: params.limit,
        })
        .await?;

    Ok(Json(PaymentListResponse {
        payments: attempts.into_iter().map(PaymentStatusResponse::from).collect(),
    }))
}

/// GET /account - Caller's plan and credit balance
pub async fn get_account(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let entitlement = state
        .get_account_handler()
        .handle(GetAccountQuery { user_id: user.id })
        .await?;

    Ok(Json(AccountResponse::new(entitlement, user.email)))
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment-intents - Start a push or card payment
pub async fn create_payment_intent(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let (plan_id, method) = json_body(payload)?.into_parts()?;

    let result = state
        .initiate_payment_handler()
        .handle(InitiatePaymentCommand {
            user,
            plan_id,
            method,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentIntentResponse::from(result))))
}

/// POST /accounts - Provision the caller's free account (idempotent)
pub async fn provision_account(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .provision_account_handler()
        .handle(ProvisionAccountCommand { user_id: user.id })
        .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AccountResponse::new(result.entitlement, user.email))))
}

/// POST /humanize - Debit credits and rewrite text
pub async fn humanize(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<HumanizeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let request = json_body(payload)?;
    let creativity = request.creativity()?;

    let result = state
        .humanize_handler()
        .handle(HumanizeTextCommand {
            user_id: user.id,
            text: request.text,
            tone: request.tone,
            creativity,
        })
        .await?;

    Ok(Json(HumanizeResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider Callbacks (no bearer auth)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment-callbacks/push?token=... - M-Pesa STK result
pub async fn push_callback(
    State(state): State<BillingAppState>,
    Query(params): Query<PushCallbackParams>,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    state
        .push_callback_handler()
        .handle(HandlePushCallbackCommand {
            token: params.token,
            payload: body.to_vec(),
        })
        .await?;

    Ok(Json(PushCallbackAck::accepted()))
}

/// POST /payment-callbacks/webhook - Stripe checkout events
pub async fn card_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state
        .card_webhook_handler()
        .handle(HandleCardWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    Ok(Json(WebhookAck { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::InvalidRequest { .. } | BillingError::SignatureInvalid(_) => {
                StatusCode::BAD_REQUEST
            }
            BillingError::CallbackUnauthorized => StatusCode::UNAUTHORIZED,
            BillingError::InsufficientCredit { .. } => StatusCode::PAYMENT_REQUIRED,
            BillingError::NotFound(_)
            | BillingError::AccountNotFound(_)
            | BillingError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
            BillingError::AlreadySettled { .. } => StatusCode::CONFLICT,
            BillingError::RewriteFailed(_) => StatusCode::BAD_GATEWAY,
            BillingError::PaymentProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::EntitlementMutationFailed(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Request failed");
        }

        let body = match &self.0 {
            BillingError::InsufficientCredit {
                required,
                available,
            } => ErrorResponse::with_details(
                self.0.code(),
                self.0.message(),
                serde_json::json!({ "required": required, "available": available }),
            ),
            BillingError::InvalidRequest { field, .. } => ErrorResponse::with_details(
                self.0.code(),
                self.0.message(),
                serde_json::json!({ "field": field }),
            ),
            other => ErrorResponse::new(other.code(), other.message()),
        };
        (status, Json(body)).into_response()
    }
}
