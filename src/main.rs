use dotenvy::dotenv;
use tracing::info;

use quota_gate::infra::{
    app::create_app,
    config::AppConfig,
    error::InfraError,
    setup::{init_app_runtime, init_tracing},
    subscription_expiry::run_subscription_expiry_loop,
    usage_reconciler::run_usage_reconciler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let expiry_interval = config.expiry_sweep_interval;
    let store_timeout = config.store_timeout;
    let runtime = init_app_runtime(config).await?;
    let bind_addr = runtime.app_state.config.bind_addr;

    // Background workers (after tracing is initialized)
    tokio::spawn(run_usage_reconciler(
        runtime.reconcile_rx,
        runtime.usage_tracker,
        runtime.retry_policy,
    ));
    tokio::spawn(run_subscription_expiry_loop(
        runtime.subscription_repo,
        runtime.clock,
        expiry_interval,
        store_timeout,
    ));

    let app = create_app(runtime.app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(InfraError::TcpBind)?;

    info!("Quota gate listening at {}", &listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(InfraError::Server)?;

    Ok(())
}
