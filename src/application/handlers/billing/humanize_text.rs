//! HumanizeTextHandler - Command handler for the costed rewrite action.
//!
//! Credits are taken with a single conditional decrement before the language
//! model is called. If the model fails the same amount is put back.
//!
//! The rewrite and any refund run on a detached task under their own deadline,
//! so a caller that drops the request future cannot strand a debit.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{credit_cost, word_count, BillingError, DebitOutcome};
use crate::domain::foundation::UserId;
use crate::ports::{EntitlementRepository, RewriteRequest, TextRewriter};

const DEFAULT_TONE: &str = "neutral";
const DEFAULT_CREATIVITY: u8 = 5;
const MAX_CREATIVITY: u8 = 10;

/// Deadline for one rewrite when none is configured.
pub const DEFAULT_REWRITE_TIMEOUT: Duration = Duration::from_secs(45);

/// Command to rewrite a piece of text.
#[derive(Debug, Clone)]
pub struct HumanizeTextCommand {
    pub user_id: UserId,
    pub text: String,
    pub tone: Option<String>,
    pub creativity: Option<u8>,
}

/// Result of a completed rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanizeTextResult {
    pub humanized_text: String,
    pub credits_used: i64,
    pub remaining_credits: i64,
}

/// Handler that debits, rewrites, and refunds on failure.
pub struct HumanizeTextHandler {
    entitlements: Arc<dyn EntitlementRepository>,
    rewriter: Arc<dyn TextRewriter>,
    rewrite_timeout: Duration,
}

impl HumanizeTextHandler {
    pub fn new(
        entitlements: Arc<dyn EntitlementRepository>,
        rewriter: Arc<dyn TextRewriter>,
    ) -> Self {
        Self {
            entitlements,
            rewriter,
            rewrite_timeout: DEFAULT_REWRITE_TIMEOUT,
        }
    }

    /// Overrides the deadline after which a rewrite counts as failed.
    pub fn with_rewrite_timeout(mut self, timeout: Duration) -> Self {
        self.rewrite_timeout = timeout;
        self
    }

    pub async fn handle(&self, cmd: HumanizeTextCommand) -> Result<HumanizeTextResult, BillingError> {
        let request = validate(&cmd)?;
        let cost = credit_cost(&request.text);

        let remaining = match self.entitlements.try_debit(&cmd.user_id, cost).await? {
            DebitOutcome::Debited { remaining, .. } => remaining,
            DebitOutcome::Insufficient {
                required,
                available,
            } => {
                tracing::info!(
                    user_id = %cmd.user_id,
                    required,
                    available,
                    "Rewrite refused for insufficient credit"
                );
                return Err(BillingError::InsufficientCredit {
                    required,
                    available,
                });
            }
            DebitOutcome::AccountNotFound => {
                return Err(BillingError::AccountNotFound(cmd.user_id));
            }
        };

        tracing::info!(
            user_id = %cmd.user_id,
            words = word_count(&request.text),
            charged = cost,
            remaining,
            "Credits debited for rewrite"
        );

        let entitlements = self.entitlements.clone();
        let rewriter = self.rewriter.clone();
        let deadline = self.rewrite_timeout;
        let user_id = cmd.user_id.clone();

        let task = tokio::spawn(async move {
            let failure = match tokio::time::timeout(deadline, rewriter.rewrite(request)).await {
                Ok(Ok(humanized_text)) => return Ok(humanized_text),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("rewrite exceeded {}s", deadline.as_secs_f32()),
            };
            refund(entitlements.as_ref(), &user_id, cost).await;
            Err(BillingError::RewriteFailed(failure))
        });

        let humanized_text = task.await.map_err(|e| {
            tracing::error!(
                anomaly = "rewrite_task_aborted",
                user_id = %cmd.user_id,
                credits = cost,
                error = %e,
                "Rewrite task ended without a result"
            );
            BillingError::Infrastructure(format!("rewrite task aborted: {}", e))
        })??;

        Ok(HumanizeTextResult {
            humanized_text,
            credits_used: cost,
            remaining_credits: remaining,
        })
    }
}

async fn refund(entitlements: &dyn EntitlementRepository, user_id: &UserId, cost: i64) {
    match entitlements.refund(user_id, cost).await {
        Ok(Some(balance)) => {
            tracing::warn!(
                user_id = %user_id,
                refunded = cost,
                balance,
                "Rewrite failed; debit refunded"
            );
        }
        Ok(None) => {
            tracing::error!(
                anomaly = "refund_account_missing",
                user_id = %user_id,
                credits = cost,
                "Rewrite failed and the account vanished before refund"
            );
        }
        Err(e) => {
            tracing::error!(
                anomaly = "refund_failed",
                user_id = %user_id,
                credits = cost,
                error = %e,
                "Rewrite failed and the debit could not be refunded"
            );
        }
    }
}

fn validate(cmd: &HumanizeTextCommand) -> Result<RewriteRequest, BillingError> {
    if cmd.text.trim().is_empty() {
        return Err(BillingError::invalid_request("text", "text is required"));
    }

    let creativity = cmd.creativity.unwrap_or(DEFAULT_CREATIVITY);
    if creativity > MAX_CREATIVITY {
        return Err(BillingError::invalid_request(
            "creativity",
            format!("must be between 0 and {}", MAX_CREATIVITY),
        ));
    }

    let tone = cmd
        .tone
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TONE)
        .to_string();

    Ok(RewriteRequest {
        text: cmd.text.clone(),
        tone,
        creativity,
    })
}
