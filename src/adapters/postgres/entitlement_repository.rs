//! PostgreSQL implementation of EntitlementRepository.
//!
//! Balance changes are single conditional statements so the row lock taken by
//! `UPDATE` serializes concurrent debits for the same user.

use crate::domain::billing::{DebitOutcome, Entitlement};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::EntitlementRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an entitlement.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    user_id: String,
    plan: String,
    credits: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            plan: row
                .plan
                .parse()
                .map_err(|e| DomainError::database(format!("Invalid plan value: {}", e)))?,
            credits: row.credits,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn provision(
        &self,
        entitlement: &Entitlement,
    ) -> Result<(Entitlement, bool), DomainError> {
        let inserted: Option<EntitlementRow> = sqlx::query_as(
            r#"
            INSERT INTO entitlements (user_id, plan, credits, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING user_id, plan, credits, created_at, updated_at
            "#,
        )
        .bind(entitlement.user_id.as_str())
        .bind(entitlement.plan.as_str())
        .bind(entitlement.credits)
        .bind(entitlement.created_at.as_datetime())
        .bind(entitlement.updated_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to provision entitlement: {}", e)))?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }

        let existing = self
            .find_by_user_id(&entitlement.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::database("Entitlement conflict reported but row is missing")
            })?;
        Ok((existing, false))
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT user_id, plan, credits, created_at, updated_at
            FROM entitlements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch entitlement: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn try_debit(&self, user_id: &UserId, cost: i64) -> Result<DebitOutcome, DomainError> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE entitlements
            SET credits = credits - $2, updated_at = NOW()
            WHERE user_id = $1 AND credits >= $2
            RETURNING credits
            "#,
        )
        .bind(user_id.as_str())
        .bind(cost)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to debit credits: {}", e)))?;

        if let Some(remaining) = remaining {
            return Ok(DebitOutcome::Debited {
                charged: cost,
                remaining,
            });
        }

        // Distinguish a short balance from a missing row. The balance read
        // here is informational; nothing was written.
        let available: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM entitlements WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to read balance: {}", e)))?;

        Ok(match available {
            Some(available) => DebitOutcome::Insufficient {
                required: cost,
                available,
            },
            None => DebitOutcome::AccountNotFound,
        })
    }

    async fn refund(&self, user_id: &UserId, credits: i64) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar(
            r#"
            UPDATE entitlements
            SET credits = credits + $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING credits
            "#,
        )
        .bind(user_id.as_str())
        .bind(credits)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to refund credits: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanTier;
    use crate::domain::foundation::ErrorCode;

    fn row(plan: &str) -> EntitlementRow {
        let now = Utc::now();
        EntitlementRow {
            user_id: "user-1".to_string(),
            plan: plan.to_string(),
            credits: 42,
            created_at: now,
            updated_at: now,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Row Mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn valid_row_maps_to_entitlement() {
        let entitlement = Entitlement::try_from(row("premium")).unwrap();
        assert_eq!(entitlement.user_id.as_str(), "user-1");
        assert_eq!(entitlement.plan, PlanTier::Premium);
        assert_eq!(entitlement.credits, 42);
    }

    #[test]
    fn unknown_plan_is_a_database_error() {
        let err = Entitlement::try_from(row("platinum")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("plan"));
    }

    #[test]
    fn blank_user_id_is_a_database_error() {
        let mut source = row("free");
        source.user_id = String::new();
        let err = Entitlement::try_from(source).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("user_id"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Live Database (run with DATABASE_URL set and --ignored)
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    #[ignore = "requires a Postgres database"]
    async fn short_balance_debit_leaves_row_untouched() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let repo = PostgresEntitlementRepository::new(pool);

        let user_id = UserId::new(format!("user-{}", uuid::Uuid::new_v4().simple())).unwrap();
        repo.provision(&Entitlement::new_free(user_id.clone(), Timestamp::now()))
            .await
            .unwrap();

        let outcome = repo.try_debit(&user_id, 11).await.unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::Insufficient {
                required: 11,
                available: 10
            }
        );

        let outcome = repo.try_debit(&user_id, 10).await.unwrap();
        assert_eq!(
            outcome,
            DebitOutcome::Debited {
                charged: 10,
                remaining: 0
            }
        );

        let missing = UserId::new("no-such-user").unwrap();
        assert_eq!(
            repo.try_debit(&missing, 1).await.unwrap(),
            DebitOutcome::AccountNotFound
        );
    }
}
