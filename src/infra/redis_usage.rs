use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use uuid::Uuid;

use super::error::InfraError;
use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::usage_tracker::UsageRepoTrait,
    domain::entities::{
        billing_period::BillingPeriod,
        resource_type::ResourceType,
        usage_record::{UsageKey, UsageRecord},
    },
};

/// Atomically bumps every counter hash in KEYS[2..] and merges the metadata
/// patch into each. New hashes are registered in the period index KEYS[1].
/// Returns the count of KEYS[2], the untyped total.
///
/// ARGV: metadata patch, now, user id, resource type, period start, then an
/// (id, subtype) pair per counter key.
const INCREMENT_SCRIPT: &str = r#"
local patch = cjson.decode(ARGV[1])
local total = 0
for i = 2, #KEYS do
    local key = KEYS[i]
    local count = redis.call('HINCRBY', key, 'count', 1)
    if count == 1 then
        local slot = 6 + (i - 2) * 2
        redis.call('HSET', key,
            'id', ARGV[slot],
            'subtype', ARGV[slot + 1],
            'user_id', ARGV[3],
            'resource_type', ARGV[4],
            'period_start', ARGV[5],
            'created_at', ARGV[2])
        redis.call('SADD', KEYS[1], key)
    end
    local stored = {}
    local raw = redis.call('HGET', key, 'metadata')
    if raw then
        stored = cjson.decode(raw)
    end
    for k, v in pairs(patch) do
        stored[k] = v
    end
    redis.call('HSET', key, 'metadata', cjson.encode(stored), 'updated_at', ARGV[2])
    if i == 2 then
        total = count
    end
end
return total
"#;

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        tracing::warn!(error = %err, "Redis error");
        AppError::Storage("Redis operation failed".into())
    }
}

/// Usage counters in Redis, one hash per (user, resource, subtype, period).
///
/// Keys share a `{user_id}` hash tag so the increment script touches a
/// single cluster slot.
#[derive(Clone)]
pub struct RedisUsageStore {
    manager: ConnectionManager,
    script: Script,
}

impl RedisUsageStore {
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self {
            manager,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }
}

fn counter_key(key: &UsageKey) -> String {
    format!(
        "usage:{{{}}}:{}:{}:{}",
        key.user_id,
        key.period.start,
        key.resource_type,
        key.stored_subtype()
    )
}

fn index_key(user_id: Uuid, period: BillingPeriod) -> String {
    format!("usage_idx:{{{}}}:{}", user_id, period.start)
}

fn record_from_hash(fields: &HashMap<String, String>) -> AppResult<UsageRecord> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| AppError::Storage(format!("usage hash missing field {name}")))
    };
    let corrupt = |name: &str| AppError::Storage(format!("usage hash field {name} is corrupt"));

    let start: NaiveDate = field("period_start")?
        .parse()
        .map_err(|_| corrupt("period_start"))?;
    let created_at: DateTime<Utc> = field("created_at")?
        .parse()
        .map_err(|_| corrupt("created_at"))?;
    let updated_at: DateTime<Utc> = match fields.get("updated_at") {
        Some(raw) => raw.parse().map_err(|_| corrupt("updated_at"))?,
        None => created_at,
    };
    let subtype = field("subtype")?;
    let metadata = match fields.get("metadata") {
        Some(raw) => serde_json::from_str(raw).map_err(|_| corrupt("metadata"))?,
        None => serde_json::json!({}),
    };

    Ok(UsageRecord {
        id: field("id")?.parse().map_err(|_| corrupt("id"))?,
        user_id: field("user_id")?.parse().map_err(|_| corrupt("user_id"))?,
        resource_type: field("resource_type")?
            .parse::<ResourceType>()
            .map_err(|_| corrupt("resource_type"))?,
        resource_subtype: (!subtype.is_empty()).then(|| subtype.clone()),
        usage_count: field("count")?.parse().map_err(|_| corrupt("count"))?,
        period: BillingPeriod::for_date(start),
        metadata,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl UsageRepoTrait for RedisUsageStore {
    async fn get(&self, key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        let mut conn = self.manager.clone();
        let fields: HashMap<String, String> = conn.hgetall(counter_key(key)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        record_from_hash(&fields).map(Some)
    }

    async fn increment(
        &self,
        key: &UsageKey,
        metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        let mut conn = self.manager.clone();
        let patch = if metadata_patch.is_object() {
            metadata_patch.to_string()
        } else {
            "{}".to_string()
        };

        let total_key = UsageKey::new(key.user_id, key.resource_type, None, key.period);
        let mut counters = vec![total_key];
        if key.resource_subtype.is_some() {
            counters.push(key.clone());
        }

        let mut invocation = self.script.prepare_invoke();
        invocation.key(index_key(key.user_id, key.period));
        for counter in &counters {
            invocation.key(counter_key(counter));
        }
        invocation
            .arg(patch)
            .arg(Utc::now().to_rfc3339())
            .arg(key.user_id.to_string())
            .arg(key.resource_type.as_str())
            .arg(key.period.start.to_string());
        for counter in &counters {
            invocation
                .arg(Uuid::new_v4().to_string())
                .arg(counter.stored_subtype());
        }

        let total: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(total)
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        let mut conn = self.manager.clone();
        let keys: Vec<String> = conn.smembers(index_key(user_id, period)).await?;
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.hgetall(key);
        }
        let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        hashes
            .iter()
            .filter(|fields| !fields.is_empty())
            .map(record_from_hash)
            .collect()
    }
}
