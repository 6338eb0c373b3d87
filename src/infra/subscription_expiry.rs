use std::{sync::Arc, time::Duration};

use tokio::time::interval;
use tracing::{debug, error, info};

use crate::{
    app_error::AppResult,
    application::{
        clock::Clock, store_timeout::with_store_timeout,
        use_cases::subscription_resolver::SubscriptionRepoTrait,
    },
};

/// Marks entitling subscriptions whose period has ended as expired.
///
/// Plan resolution already ignores lapsed rows, so a missed sweep only
/// delays the status change.
pub async fn run_subscription_expiry_loop(
    repo: Arc<dyn SubscriptionRepoTrait>,
    clock: Arc<dyn Clock>,
    every: Duration,
    store_timeout: Duration,
) {
    let mut ticker = interval(every);

    info!(
        "Subscription expiry sweeper started (every {}s)",
        every.as_secs()
    );

    loop {
        ticker.tick().await;

        if let Err(e) = sweep_once(repo.as_ref(), clock.as_ref(), store_timeout).await {
            error!(error = %e, "Subscription expiry sweep failed");
        }
    }
}

pub async fn sweep_once(
    repo: &dyn SubscriptionRepoTrait,
    clock: &dyn Clock,
    store_timeout: Duration,
) -> AppResult<u64> {
    let now = clock.now();
    let expired =
        with_store_timeout(store_timeout, "expire_lapsed", repo.expire_lapsed(now)).await?;
    if expired > 0 {
        info!(expired, "Expired lapsed subscriptions");
    } else {
        debug!("No lapsed subscriptions");
    }
    Ok(expired)
}
