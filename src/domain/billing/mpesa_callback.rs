//! STK push result callback payload.
//!
//! Daraja posts `{"Body":{"stkCallback":{...}}}` to the callback URL once the
//! payer accepts, declines, or ignores the prompt. Only the fields needed to
//! settle the attempt are typed; the whole body is kept as raw JSON for audit.

use serde::Deserialize;

use super::settlement::{SettlementOutcome, SettlementRequest};
use crate::domain::foundation::{TransactionId, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,

    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,

    pub result_code: i64,

    #[serde(default)]
    pub result_desc: Option<String>,

    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

/// A parsed push callback plus the body it came from.
#[derive(Debug, Clone)]
pub struct PushCallback {
    pub callback: StkCallback,
    pub raw: serde_json::Value,
}

impl PushCallback {
    /// Parses a callback body straight off the wire.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let raw = serde_json::from_slice(body)
            .map_err(|e| ValidationError::invalid_format("body", e.to_string()))?;
        Self::parse(raw)
    }

    /// Parses a callback body.
    ///
    /// Fails when the envelope or `CheckoutRequestID` is missing.
    pub fn parse(raw: serde_json::Value) -> Result<Self, ValidationError> {
        let envelope: StkCallbackEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| ValidationError::invalid_format("stkCallback", e.to_string()))?;
        Ok(Self {
            callback: envelope.body.stk_callback,
            raw,
        })
    }

    pub fn transaction_id(&self) -> Result<TransactionId, ValidationError> {
        TransactionId::new(self.callback.checkout_request_id.clone())
    }

    pub fn outcome(&self) -> SettlementOutcome {
        SettlementOutcome::from_result_code(self.callback.result_code)
    }

    /// M-Pesa receipt number, present on successful payments.
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Amount actually paid, present on successful payments.
    pub fn amount_paid(&self) -> Option<f64> {
        self.metadata_value("Amount").and_then(|v| v.as_f64())
    }

    fn metadata_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback
            .callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    pub fn into_settlement(self) -> Result<SettlementRequest, ValidationError> {
        Ok(SettlementRequest {
            transaction_id: self.transaction_id()?,
            outcome: self.outcome(),
            raw_payload: self.raw,
        })
    }
}

#[cfg(test)]
pub(crate) fn success_callback(checkout_request_id: &str) -> serde_json::Value {
    serde_json::json!({
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
                        {"Name": "TransactionDate", "Value": 20191219102115u64},
                        {"Name": "PhoneNumber", "Value": 254708374149u64}
                    ]
                }
            }
        }
    })
}

#[cfg(test)]
pub(crate) fn cancelled_callback(checkout_request_id: &str) -> serde_json::Value {
    serde_json::json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    })
}
