//! Builders that wire use cases and `AppState` over in-memory mocks.

use std::sync::Arc;

use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        use_cases::{
            feature_gate::FeatureGate,
            plan_catalog::PlanCatalog,
            subscription_resolver::{SubscriptionRepoTrait, SubscriptionResolver},
            usage_tracker::{UsageRepoTrait, UsageTracker},
        },
    },
    domain::entities::subscription::Subscription,
    infra::config::AppConfig,
    test_utils::{FixedClock, InMemorySubscriptionRepo, InMemoryUsageRepo, RecordingSink, test_now},
};

const TEST_STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
const TEST_JWT_SECRET: &str = "test-jwt-secret-for-route-tests";

// ============================================================================
// FeatureGateFixture
// ============================================================================

/// Builds a `FeatureGate` over in-memory stores and a fixed clock.
///
/// The in-memory repos stay reachable through the public fields so tests
/// can seed and inspect them.
pub struct FeatureGateFixture {
    pub clock: Arc<FixedClock>,
    pub usage_repo: Arc<InMemoryUsageRepo>,
    pub subscription_repo: Arc<InMemorySubscriptionRepo>,
    pub deferred: Arc<RecordingSink>,
    usage_override: Option<Arc<dyn UsageRepoTrait>>,
    subscription_override: Option<Arc<dyn SubscriptionRepoTrait>>,
    catalog: PlanCatalog,
    strict_resource_types: bool,
}

impl FeatureGateFixture {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(FixedClock::at(test_now())),
            usage_repo: Arc::new(InMemoryUsageRepo::new()),
            subscription_repo: Arc::new(InMemorySubscriptionRepo::new()),
            deferred: Arc::new(RecordingSink::new()),
            usage_override: None,
            subscription_override: None,
            catalog: PlanCatalog::builtin(),
            strict_resource_types: false,
        }
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscription_repo.insert(subscription);
        self
    }

    /// Replace the usage store, e.g. with a failing one.
    pub fn with_usage_repo(mut self, repo: Arc<dyn UsageRepoTrait>) -> Self {
        self.usage_override = Some(repo);
        self
    }

    pub fn with_subscription_repo(mut self, repo: Arc<dyn SubscriptionRepoTrait>) -> Self {
        self.subscription_override = Some(repo);
        self
    }

    pub fn with_catalog(mut self, catalog: PlanCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_resource_types = true;
        self
    }

    pub fn gate(&self) -> FeatureGate {
        let usage_repo = self
            .usage_override
            .clone()
            .unwrap_or_else(|| self.usage_repo.clone() as Arc<dyn UsageRepoTrait>);
        let subscription_repo = self
            .subscription_override
            .clone()
            .unwrap_or_else(|| self.subscription_repo.clone() as Arc<dyn SubscriptionRepoTrait>);

        FeatureGate::new(
            SubscriptionResolver::new(subscription_repo, self.clock.clone(), TEST_STORE_TIMEOUT),
            Arc::new(self.catalog.clone()),
            UsageTracker::new(usage_repo, self.clock.clone(), TEST_STORE_TIMEOUT),
            self.deferred.clone(),
            self.clock.clone(),
            self.strict_resource_types,
        )
    }
}

impl Default for FeatureGateFixture {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Builder for creating `AppState` with in-memory mocks for route tests.
///
/// # Example
///
/// ```ignore
/// let user_id = Uuid::new_v4();
/// let builder = TestAppStateBuilder::new()
///     .with_subscription(create_test_subscription(user_id, PlanTier::Starter, |_| {}));
/// let token = builder.token_for(user_id);
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    pub fixture: FeatureGateFixture,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            fixture: FeatureGateFixture::new(),
        }
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.fixture = self.fixture.with_subscription(subscription);
        self
    }

    pub fn with_usage_repo(mut self, repo: Arc<dyn UsageRepoTrait>) -> Self {
        self.fixture = self.fixture.with_usage_repo(repo);
        self
    }

    pub fn strict(mut self) -> Self {
        self.fixture = self.fixture.strict();
        self
    }

    /// A valid bearer token for `user_id`, signed with the test secret.
    pub fn token_for(&self, user_id: Uuid) -> String {
        jwt::issue_for_tests(user_id, &SecretString::new(TEST_JWT_SECRET.into()), 3600)
    }

    pub fn build(&self) -> AppState {
        AppState {
            config: Arc::new(AppConfig::for_tests(TEST_JWT_SECRET)),
            feature_gate: Arc::new(self.fixture.gate()),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
