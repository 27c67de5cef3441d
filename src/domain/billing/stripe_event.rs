//! Stripe webhook event types.
//!
//! Only the fields needed to settle card checkouts are captured; the rest of
//! Stripe's schema is ignored.

use serde::{Deserialize, Serialize};

use super::settlement::{SettlementOutcome, SettlementRequest};
use crate::domain::foundation::{TransactionId, ValidationError};

/// Stripe webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

/// The `checkout.session` object carried by checkout events.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,

    /// Set to the purchasing user's id at session creation.
    #[serde(default)]
    pub client_reference_id: Option<String>,

    /// "paid", "unpaid" or "no_payment_required".
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl CheckoutSessionObject {
    /// Completed sessions using delayed payment methods report `unpaid` and
    /// settle later through an async payment event.
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            None | Some("paid") | Some("no_payment_required")
        )
    }
}

/// Known Stripe event types that we handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
    /// Anything else; acknowledged and ignored.
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                Self::CheckoutSessionAsyncPaymentSucceeded
            }
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentSucceeded => {
                "checkout.session.async_payment_succeeded"
            }
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::Unknown => "unknown",
        }
    }
}

/// What a verified event asks the ledger to do.
#[derive(Debug, Clone)]
pub enum CardEventAction {
    /// Settle the attempt keyed by the checkout session id.
    Settle {
        request: SettlementRequest,
        client_reference_id: Option<String>,
    },

    /// Nothing to do (unhandled type, or a completed session still awaiting
    /// funds).
    Ignore { reason: &'static str },
}

impl StripeEvent {
    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    /// Maps the event onto a ledger action. `raw` is the verified body,
    /// stored verbatim on the attempt when it settles.
    pub fn card_action(&self, raw: serde_json::Value) -> Result<CardEventAction, ValidationError> {
        let outcome = match self.parsed_type() {
            StripeEventType::Unknown => {
                return Ok(CardEventAction::Ignore {
                    reason: "unhandled event type",
                })
            }
            StripeEventType::CheckoutSessionCompleted
            | StripeEventType::CheckoutSessionAsyncPaymentSucceeded => SettlementOutcome::Succeeded,
            StripeEventType::CheckoutSessionAsyncPaymentFailed
            | StripeEventType::CheckoutSessionExpired => SettlementOutcome::Failed,
        };

        let session: CheckoutSessionObject = self
            .deserialize_object()
            .map_err(|e| ValidationError::invalid_format("data.object", e.to_string()))?;

        if self.parsed_type() == StripeEventType::CheckoutSessionCompleted && !session.is_paid() {
            return Ok(CardEventAction::Ignore {
                reason: "checkout completed but payment still processing",
            });
        }

        Ok(CardEventAction::Settle {
            request: SettlementRequest {
                transaction_id: TransactionId::new(session.id)?,
                outcome,
                raw_payload: raw,
            },
            client_reference_id: session.client_reference_id,
        })
    }
}

/// A signature-checked event together with the JSON body it was read from.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub event: StripeEvent,
    /// Body as received; stored verbatim on the settled attempt.
    pub raw: serde_json::Value,
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: StripeEventData {
                object: self.object,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}
