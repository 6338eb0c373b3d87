use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_resolver::SubscriptionRepoTrait,
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan: row.get("plan"),
        status: row.get("status"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan, status, current_period_start, current_period_end,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepoTrait for PostgresPersistence {
    async fn find_latest_entitling(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions
             WHERE user_id = $1 AND status IN ('active', 'cancelled')
             ORDER BY created_at DESC
             LIMIT 1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE subscriptions
               SET status = 'expired', updated_at = NOW()
               WHERE status IN ('active', 'cancelled') AND current_period_end < $1"#,
        )
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
