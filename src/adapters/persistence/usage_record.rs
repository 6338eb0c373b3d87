use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::usage_tracker::UsageRepoTrait,
    domain::entities::{
        billing_period::BillingPeriod,
        usage_record::{UsageKey, UsageRecord},
    },
};

/// Stored subtype of the untyped (total) counter.
const TOTAL_SUBTYPE: &str = "";

fn row_to_record(row: &sqlx::postgres::PgRow) -> UsageRecord {
    let subtype: String = row.get("resource_subtype");
    UsageRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        resource_type: row.get("resource_type"),
        resource_subtype: (!subtype.is_empty()).then_some(subtype),
        usage_count: row.get("usage_count"),
        period: BillingPeriod {
            start: row.get("billing_period_start"),
            end: row.get("billing_period_end"),
        },
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, resource_type, resource_subtype, usage_count,
    billing_period_start, billing_period_end, metadata, created_at, updated_at
"#;

#[async_trait]
impl UsageRepoTrait for PostgresPersistence {
    async fn get(&self, key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM usage_tracking
             WHERE user_id = $1 AND resource_type = $2 AND resource_subtype = $3
               AND billing_period_start = $4 AND billing_period_end = $5",
            SELECT_COLS
        ))
        .bind(key.user_id)
        .bind(key.resource_type)
        .bind(key.stored_subtype())
        .bind(key.period.start)
        .bind(key.period.end)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn increment(
        &self,
        key: &UsageKey,
        metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        // Total and subtype counters move in one statement.
        let mut subtypes = vec![TOTAL_SUBTYPE.to_string()];
        if let Some(subtype) = &key.resource_subtype {
            subtypes.push(subtype.clone());
        }
        let patch = if metadata_patch.is_object() {
            metadata_patch.clone()
        } else {
            serde_json::json!({})
        };

        let rows = sqlx::query(
            r#"INSERT INTO usage_tracking
                   (user_id, resource_type, resource_subtype, usage_count,
                    billing_period_start, billing_period_end, metadata)
               SELECT $1, $2, s.subtype, 1, $4, $5, $6
               FROM UNNEST($3::text[]) AS s(subtype)
               ON CONFLICT (user_id, resource_type, resource_subtype,
                            billing_period_start, billing_period_end)
               DO UPDATE SET usage_count = usage_tracking.usage_count + 1,
                             metadata = usage_tracking.metadata || EXCLUDED.metadata,
                             updated_at = NOW()
               RETURNING resource_subtype, usage_count"#,
        )
        .bind(key.user_id)
        .bind(key.resource_type)
        .bind(&subtypes)
        .bind(key.period.start)
        .bind(key.period.end)
        .bind(patch)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        rows.iter()
            .find(|row| row.get::<String, _>("resource_subtype") == TOTAL_SUBTYPE)
            .map(|row| row.get::<i64, _>("usage_count"))
            .ok_or_else(|| AppError::Storage("increment returned no total row".into()))
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM usage_tracking
             WHERE user_id = $1 AND billing_period_start = $2 AND billing_period_end = $3
             ORDER BY resource_type, resource_subtype",
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}
