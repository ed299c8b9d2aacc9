//! overdue-flagger - batch entry point
//!
//! Runs a single reconciliation pass over the configured project and exits.

use std::sync::Arc;

use overdue_flagger::{build_strategy, config::Config, AsanaClient, Reconciler};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Requests are strictly sequential; one thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overdue_flagger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;
    info!(
        "Loaded configuration: project={}, strategy={}, dry_run={}",
        config.project_gid,
        config.flag.strategy_name(),
        config.dry_run
    );

    let client = Arc::new(AsanaClient::from_config(&config));
    let strategy = build_strategy(&config.flag, client.clone(), config.dry_run);
    let mut reconciler = Reconciler::new(client, strategy, config.dry_run);

    match reconciler.run(&config.project_gid).await {
        Ok(summary) => {
            info!("Summary: {}", summary);
            Ok(())
        }
        Err(e) => {
            match e.status() {
                Some(status) => error!("Run aborted (HTTP {}): {}", status, e),
                None => error!("Run aborted: {}", e),
            }
            Err(e.into())
        }
    }
}
