use std::{future::Future, str::FromStr, sync::Arc};

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        clock::Clock,
        ports::deferred_usage::{DeferredUsage, DeferredUsageSink},
        use_cases::{
            plan_catalog::{FeatureLimits, PlanCatalog, PlanFeatures},
            subscription_resolver::{ResolvedPlan, SubscriptionResolver},
            usage_tracker::{ResourceUsage, UsageStats, UsageTracker},
        },
    },
    domain::entities::{
        access::{AccessDecision, DenialReason},
        feature_flag::FeatureFlag,
        plan_tier::PlanTier,
        resource_type::ResourceType,
        usage_record::UsageKey,
    },
};

// ============================================================================
// Types
// ============================================================================

/// Result of recording one unit after the gated action succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// The store confirmed the new count.
    Recorded { count: i64 },
    /// The write failed and was handed off for retry. The action still stands.
    Deferred,
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOverview {
    #[serde(flatten)]
    pub resolved: ResolvedPlan,
    pub display_name: String,
    pub limits: FeatureLimits,
    pub features: PlanFeatures,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub plan: PlanTier,
    pub display_name: String,
    pub usage: Vec<ResourceUsage>,
}

/// Error returned by [`FeatureGate::run_metered`].
#[derive(Debug, thiserror::Error)]
pub enum MeteredError<E> {
    /// Access was refused or could not be decided; the action did not run.
    #[error(transparent)]
    Gate(AppError),
    /// The action itself failed; nothing was recorded.
    #[error("metered action failed")]
    Action(E),
}

// ============================================================================
// Use Cases
// ============================================================================

/// Answers "may this user consume one more unit of X" and records
/// consumption once the action has happened.
#[derive(Clone)]
pub struct FeatureGate {
    resolver: SubscriptionResolver,
    catalog: Arc<PlanCatalog>,
    tracker: UsageTracker,
    deferred: Arc<dyn DeferredUsageSink>,
    clock: Arc<dyn Clock>,
    strict_resource_types: bool,
}

impl FeatureGate {
    pub fn new(
        resolver: SubscriptionResolver,
        catalog: Arc<PlanCatalog>,
        tracker: UsageTracker,
        deferred: Arc<dyn DeferredUsageSink>,
        clock: Arc<dyn Clock>,
        strict_resource_types: bool,
    ) -> Self {
        Self {
            resolver,
            catalog,
            tracker,
            deferred,
            clock,
            strict_resource_types,
        }
    }

    // ========================================================================
    // Access Checks
    // ========================================================================

    /// Pure read: resolves the plan, looks up the limit and the current
    /// count, and returns a decision naming why access was refused.
    ///
    /// Store failures are returned as errors, never as a granted decision.
    #[instrument(skip(self))]
    pub async fn check_access(
        &self,
        user_id: Uuid,
        resource: ResourceType,
    ) -> AppResult<AccessDecision> {
        let plan = self.resolver.resolve(user_id).await?;
        let limit = self.catalog.limit(plan, resource);
        // Read even for zero limits: a downgraded user may already have usage.
        let stats = self.tracker.stats_for(user_id, resource, limit).await?;

        if !limit.grants_access() {
            debug!(%user_id, %resource, %plan, current = stats.current, "Resource not included in plan");
            return Ok(AccessDecision {
                resource: Some(resource),
                can_access: false,
                reason: Some(DenialReason::NoAccess),
                current_usage: stats.current,
                usage_limit: limit,
                remaining: 0,
                plan,
            });
        }

        let can_access = limit.allows_one_more(stats.current);
        let reason = (!can_access).then_some(DenialReason::LimitExceeded);

        debug!(
            %user_id,
            %resource,
            %plan,
            current = stats.current,
            limit = limit.as_i64(),
            can_access,
            "Access checked"
        );

        Ok(AccessDecision {
            resource: Some(resource),
            can_access,
            reason,
            current_usage: stats.current,
            usage_limit: limit,
            remaining: stats.remaining,
            plan,
        })
    }

    /// Check access for a resource name coming from outside the type system.
    ///
    /// Unknown names are a caller bug: with `strict_resource_types` they are
    /// rejected, otherwise they are answered as `no_access`.
    #[instrument(skip(self))]
    pub async fn check_access_by_name(
        &self,
        user_id: Uuid,
        resource_name: &str,
    ) -> AppResult<AccessDecision> {
        match ResourceType::from_str(resource_name) {
            Ok(resource) => self.check_access(user_id, resource).await,
            Err(_) if self.strict_resource_types => {
                Err(AppError::InvalidResourceType(resource_name.to_string()))
            }
            Err(_) => {
                warn!(%user_id, resource_name, "Unknown resource type, denying access");
                let plan = self.resolver.resolve(user_id).await?;
                Ok(AccessDecision::unknown_resource(plan))
            }
        }
    }

    /// Fail-closed boolean form of [`check_access`](Self::check_access).
    pub async fn is_allowed(&self, user_id: Uuid, resource: ResourceType) -> bool {
        match self.check_access(user_id, resource).await {
            Ok(decision) => decision.can_access,
            Err(e) => {
                warn!(%user_id, %resource, error = %e, "Access check failed, denying");
                false
            }
        }
    }

    /// Like [`check_access`](Self::check_access) but turns a denial into an
    /// error carrying the numbers to show the user.
    pub async fn require_access(
        &self,
        user_id: Uuid,
        resource: ResourceType,
    ) -> AppResult<AccessDecision> {
        let decision = self.check_access(user_id, resource).await?;
        match decision.reason {
            None => Ok(decision),
            Some(DenialReason::NoAccess) => Err(AppError::NoAccess {
                resource,
                current_usage: decision.current_usage,
            }),
            Some(DenialReason::LimitExceeded) => Err(AppError::LimitExceeded {
                resource,
                current_usage: decision.current_usage,
                usage_limit: decision.usage_limit,
            }),
        }
    }

    #[instrument(skip(self))]
    pub async fn feature_enabled(&self, user_id: Uuid, flag: FeatureFlag) -> AppResult<bool> {
        let plan = self.resolver.resolve(user_id).await?;
        Ok(self.catalog.features_for(plan).enabled(flag))
    }

    /// Fail-closed boolean capability check.
    pub async fn has_feature(&self, user_id: Uuid, flag: FeatureFlag) -> bool {
        self.feature_enabled(user_id, flag)
            .await
            .unwrap_or_else(|e| {
                warn!(%user_id, %flag, error = %e, "Feature check failed, denying");
                false
            })
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record one unit of `resource`. Call only after the gated action has
    /// actually succeeded.
    ///
    /// Never fails: a store error is logged and the increment is handed to
    /// the deferred sink, because the user already received the benefit.
    #[instrument(skip(self, metadata))]
    pub async fn record_usage(
        &self,
        user_id: Uuid,
        resource: ResourceType,
        subtype: Option<String>,
        metadata: serde_json::Value,
    ) -> RecordOutcome {
        // The key is fixed now so a retry lands in the period the action
        // happened in, even if the month turns in between.
        let key = UsageKey::new(user_id, resource, subtype, self.tracker.current_period());

        match self.tracker.record_key(&key, &metadata).await {
            Ok(count) => RecordOutcome::Recorded { count },
            Err(e) => {
                error!(
                    %user_id,
                    %resource,
                    subtype = ?key.resource_subtype,
                    period = %key.period.label(),
                    error = %e,
                    "Failed to record usage after successful action, deferring"
                );
                self.deferred.defer(DeferredUsage {
                    key,
                    metadata,
                    failed_at: self.clock.now(),
                    last_error: e.to_string(),
                });
                RecordOutcome::Deferred
            }
        }
    }

    /// Check access, run `action`, and record one unit only if it succeeded.
    ///
    /// The check and the record are separate store operations; two
    /// concurrent calls may both pass the check and both record.
    pub async fn run_metered<T, E, F, Fut>(
        &self,
        user_id: Uuid,
        resource: ResourceType,
        subtype: Option<String>,
        metadata: serde_json::Value,
        action: F,
    ) -> Result<(T, RecordOutcome), MeteredError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.require_access(user_id, resource)
            .await
            .map_err(MeteredError::Gate)?;

        let value = action().await.map_err(MeteredError::Action)?;
        let outcome = self
            .record_usage(user_id, resource, subtype, metadata)
            .await;
        Ok((value, outcome))
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn plan_overview(&self, user_id: Uuid) -> AppResult<PlanOverview> {
        let resolved = self.resolver.resolve_detailed(user_id).await?;
        let plan = self.catalog.plan(resolved.tier);
        Ok(PlanOverview {
            display_name: plan.display_name.clone(),
            limits: plan.limits,
            features: plan.features,
            resolved,
        })
    }

    #[instrument(skip(self))]
    pub async fn usage_summary(&self, user_id: Uuid) -> AppResult<UsageSummary> {
        let plan = self.resolver.resolve(user_id).await?;
        let usage = self
            .tracker
            .summary(user_id, self.catalog.limits_for(plan))
            .await?;
        info!(%user_id, %plan, "Usage summary served");
        Ok(UsageSummary {
            plan,
            display_name: self.catalog.display_name(plan).to_string(),
            usage,
        })
    }

    #[instrument(skip(self))]
    pub async fn usage_for(
        &self,
        user_id: Uuid,
        resource: ResourceType,
    ) -> AppResult<UsageStats> {
        let plan = self.resolver.resolve(user_id).await?;
        self.tracker
            .stats_for(user_id, resource, self.catalog.limit(plan, resource))
            .await
    }
}
