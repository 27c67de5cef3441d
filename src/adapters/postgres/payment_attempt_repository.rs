//! PostgreSQL implementation of PaymentAttemptRepository.
//!
//! Settlement runs in one transaction: a conditional `UPDATE ... WHERE
//! status = 'pending'` claims the attempt, and the entitlement grant follows
//! on the same connection. A concurrent settlement of the same attempt blocks
//! on the row lock and then matches zero rows.

use super::entitlement_repository::EntitlementRow;
use crate::domain::billing::{
    Entitlement, PaymentAttempt, PaymentChannel, PaymentStatus, SettlementRequest,
    SettlementResult,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentAttemptId, Timestamp, TransactionId, UserId,
};
use crate::ports::PaymentAttemptRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const TRANSACTION_ID_CONSTRAINT: &str = "payment_attempts_transaction_id_key";

const ATTEMPT_COLUMNS: &str = "id, transaction_id, user_id, plan_id, channel, amount, grant_tier, \
     credit_grant, phone_number, status, raw_response, created_at, updated_at";

pub struct PostgresPaymentAttemptRepository {
    pool: PgPool,
}

impl PostgresPaymentAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentAttemptRow {
    id: Uuid,
    transaction_id: String,
    user_id: String,
    plan_id: String,
    channel: String,
    amount: i64,
    grant_tier: String,
    credit_grant: i64,
    phone_number: Option<String>,
    status: String,
    raw_response: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentAttemptRow> for PaymentAttempt {
    type Error = DomainError;

    fn try_from(row: PaymentAttemptRow) -> Result<Self, Self::Error> {
        let corrupt = |column: &str, e: &dyn std::fmt::Display| {
            DomainError::database(format!("Invalid {} value: {}", column, e))
        };

        Ok(PaymentAttempt {
            id: PaymentAttemptId::from_uuid(row.id),
            transaction_id: TransactionId::new(row.transaction_id)
                .map_err(|e| corrupt("transaction_id", &e))?,
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", &e))?,
            plan_id: row.plan_id,
            channel: row.channel.parse().map_err(|e| corrupt("channel", &e))?,
            amount: row.amount,
            grant_tier: row.grant_tier.parse().map_err(|e| corrupt("grant_tier", &e))?,
            credit_grant: row.credit_grant,
            phone_number: row.phone_number,
            status: row.status.parse().map_err(|e| corrupt("status", &e))?,
            raw_response: row.raw_response,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn rows_to_attempts(rows: Vec<PaymentAttemptRow>) -> Result<Vec<PaymentAttempt>, DomainError> {
    rows.into_iter().map(PaymentAttempt::try_from).collect()
}

#[async_trait]
impl PaymentAttemptRepository for PostgresPaymentAttemptRepository {
    async fn insert_pending(&self, attempt: &PaymentAttempt) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_attempts (
                id, transaction_id, user_id, plan_id, channel, amount, grant_tier,
                credit_grant, phone_number, status, raw_response, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(attempt.id.as_uuid())
        .bind(attempt.transaction_id.as_str())
        .bind(attempt.user_id.as_str())
        .bind(&attempt.plan_id)
        .bind(attempt.channel.as_str())
        .bind(attempt.amount)
        .bind(attempt.grant_tier.as_str())
        .bind(attempt.credit_grant)
        .bind(&attempt.phone_number)
        .bind(attempt.status.as_str())
        .bind(&attempt.raw_response)
        .bind(attempt.created_at.as_datetime())
        .bind(attempt.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(TRANSACTION_ID_CONSTRAINT) {
                    return DomainError::new(
                        ErrorCode::DuplicateTransaction,
                        "Transaction id already recorded",
                    )
                    .with_detail("transaction_id", attempt.transaction_id.as_str());
                }
            }
            DomainError::database(format!("Failed to insert payment attempt: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PaymentAttempt>, DomainError> {
        let row: Option<PaymentAttemptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_attempts WHERE transaction_id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(transaction_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch payment attempt: {}", e)))?;

        row.map(PaymentAttempt::try_from).transpose()
    }

    async fn find_for_user(
        &self,
        transaction_id: &TransactionId,
        user_id: &UserId,
    ) -> Result<Option<PaymentAttempt>, DomainError> {
        let row: Option<PaymentAttemptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_attempts WHERE transaction_id = $1 AND user_id = $2",
            ATTEMPT_COLUMNS
        ))
        .bind(transaction_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch payment attempt: {}", e)))?;

        row.map(PaymentAttempt::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError> {
        let rows: Vec<PaymentAttemptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_attempts WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payment attempts: {}", e)))?;

        rows_to_attempts(rows)
    }

    async fn settle(&self, request: &SettlementRequest) -> Result<SettlementResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let target = request.outcome.target_status();
        let claimed: Option<PaymentAttemptRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_attempts
            SET status = $2, raw_response = $3, updated_at = NOW()
            WHERE transaction_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(request.transaction_id.as_str())
        .bind(target.as_str())
        .bind(&request.raw_payload)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to settle payment attempt: {}", e)))?;

        let attempt = match claimed {
            Some(row) => PaymentAttempt::try_from(row)?,
            None => {
                let current: Option<String> = sqlx::query_scalar(
                    "SELECT status FROM payment_attempts WHERE transaction_id = $1",
                )
                .bind(request.transaction_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to read payment status: {}", e))
                })?;

                // Nothing was written; dropping the transaction rolls it back.
                return match current {
                    Some(status) => Ok(SettlementResult::AlreadySettled {
                        status: status.parse::<PaymentStatus>()?,
                    }),
                    None => Ok(SettlementResult::UnknownTransaction),
                };
            }
        };

        if attempt.status != PaymentStatus::Success {
            tx.commit()
                .await
                .map_err(|e| DomainError::database(format!("Failed to commit settlement: {}", e)))?;
            return Ok(SettlementResult::Settled {
                attempt,
                entitlement: None,
            });
        }

        let granted: Option<EntitlementRow> = sqlx::query_as(
            r#"
            UPDATE entitlements
            SET plan = $2, credits = credits + $3, updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, plan, credits, created_at, updated_at
            "#,
        )
        .bind(attempt.user_id.as_str())
        .bind(attempt.grant_tier.as_str())
        .bind(attempt.credit_grant)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to apply credit grant: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit settlement: {}", e)))?;

        Ok(match granted {
            Some(row) => SettlementResult::Settled {
                attempt,
                entitlement: Some(Entitlement::try_from(row)?),
            },
            None => SettlementResult::EntitlementMissing { attempt },
        })
    }

    async fn list_stale_pending(
        &self,
        channel: PaymentChannel,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<PaymentAttempt>, DomainError> {
        let rows: Vec<PaymentAttemptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_attempts \
             WHERE status = 'pending' AND channel = $1 AND created_at < $2 \
             ORDER BY created_at ASC LIMIT $3",
            ATTEMPT_COLUMNS
        ))
        .bind(channel.as_str())
        .bind(cutoff.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list stale attempts: {}", e)))?;

        rows_to_attempts(rows)
    }
}
