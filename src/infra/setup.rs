use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        clock::{Clock, SystemClock},
        ports::deferred_usage::DeferredUsage,
        use_cases::{
            feature_gate::FeatureGate,
            plan_catalog::PlanCatalog,
            subscription_resolver::{SubscriptionRepoTrait, SubscriptionResolver},
            usage_tracker::{UsageRepoTrait, UsageTracker},
        },
    },
    infra::{
        config::{AppConfig, LogFormat, UsageBackend},
        error::InfraError,
        postgres_persistence,
        redis_usage::RedisUsageStore,
        usage_reconciler::{RetryPolicy, usage_reconcile_channel},
    },
};

/// Everything the binary needs besides the router: the shared state plus the
/// pieces the background workers run on.
pub struct AppRuntime {
    pub app_state: AppState,
    pub subscription_repo: Arc<dyn SubscriptionRepoTrait>,
    pub clock: Arc<dyn Clock>,
    pub usage_tracker: UsageTracker,
    pub reconcile_rx: mpsc::Receiver<DeferredUsage>,
    pub retry_policy: RetryPolicy,
}

pub async fn init_app_runtime(config: AppConfig) -> Result<AppRuntime, InfraError> {
    let catalog = match &config.plan_catalog_path {
        Some(path) => {
            info!(path = %path.display(), "Loading plan catalog");
            PlanCatalog::from_path(path)?
        }
        None => PlanCatalog::builtin(),
    };

    let postgres_arc = Arc::new(
        postgres_persistence(
            &config.database_url,
            config.db_max_connections,
            config.store_timeout,
        )
        .await?,
    );

    let usage_repo: Arc<dyn UsageRepoTrait> = match config.usage_backend {
        UsageBackend::Postgres => postgres_arc.clone() as Arc<dyn UsageRepoTrait>,
        UsageBackend::Redis => {
            info!("Using Redis usage store");
            Arc::new(RedisUsageStore::new(&config.redis_url).await?)
        }
    };
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepoTrait>;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let resolver =
        SubscriptionResolver::new(subscription_repo.clone(), clock.clone(), config.store_timeout);
    let usage_tracker = UsageTracker::new(usage_repo, clock.clone(), config.store_timeout);
    let (sink, reconcile_rx) = usage_reconcile_channel();

    let feature_gate = FeatureGate::new(
        resolver,
        Arc::new(catalog),
        usage_tracker.clone(),
        Arc::new(sink),
        clock.clone(),
        config.strict_resource_types,
    );

    let retry_policy = RetryPolicy {
        max_attempts: config.reconcile_max_attempts,
        base_delay: config.reconcile_base_delay,
    };

    Ok(AppRuntime {
        app_state: AppState {
            config: Arc::new(config),
            feature_gate: Arc::new(feature_gate),
        },
        subscription_repo,
        clock,
        usage_tracker,
        reconcile_rx,
        retry_policy,
    })
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quota_gate=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false) // don’t show target (module path)
                    .with_level(true)
                    .pretty(),
            )
            .try_init()
            .ok(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok(),
    };
}
