//! Marketplace API service entry point.
//!
//! # Purpose
//! Wires configuration, observability, and HTTP routers, then starts the main
//! API server, the metrics listener, the rate-limit sweeper, and (optionally)
//! the bootstrap server.
use marketplace_api::app::{
    SERVICE_NAME, build_bootstrap_router, build_router, build_state, spawn_bucket_sweeper,
};
use marketplace_api::config::MarketplaceConfig;
use marketplace_api::observability;
use std::future::Future;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MarketplaceConfig::from_env_or_yaml()?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: MarketplaceConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability(SERVICE_NAME, config.log_json);
    let state = build_state(&config)?;
    tracing::info!(
        backend = state.store.backend_name(),
        policies = state.limiter.policies().len(),
        guard = %state.guard,
        "marketplace state ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));
    let sweeper_task = spawn_bucket_sweeper(state.limiter.clone(), config.rate_limit_sweep);

    let app = build_router(state.clone());

    let bootstrap_task = if config.bootstrap.enabled {
        let bootstrap_addr = config.bootstrap.bind_addr;
        let bootstrap_app = build_bootstrap_router(state.clone());
        Some(tokio::spawn(async move {
            tracing::info!(%bootstrap_addr, "bootstrap listener starting");
            match tokio::net::TcpListener::bind(bootstrap_addr).await {
                Ok(listener) => {
                    let _ = axum::serve(
                        listener,
                        bootstrap_app.into_make_service_with_connect_info::<SocketAddr>(),
                    )
                    .await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to bind bootstrap listener");
                }
            }
        }))
    } else {
        None
    };

    let addr = config.bind_addr;
    tracing::info!(%addr, "marketplace api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    sweeper_task.abort();
    if let Some(task) = &bootstrap_task {
        task.abort();
    }
    let _ = metrics_task.await;
    let _ = sweeper_task.await;
    if let Some(task) = bootstrap_task {
        let _ = task.await;
    }
    Ok(())
}
