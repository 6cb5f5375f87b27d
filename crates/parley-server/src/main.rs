mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use parley_api::{AppState, AppStateInner};
use parley_core::run_account_listener;
use parley_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley_server=debug,parley_api=debug,parley_core=debug,parley_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);

    let state: AppState = Arc::new(AppStateInner::new(
        db,
        config.jwt_secret.clone(),
        config.thread_cache_ttl,
    ));

    // Account cleanup reacts to deletion events from the queue.
    match state.accounts.take_receiver() {
        Some(rx) => {
            tokio::spawn(run_account_listener(rx, state.pipeline.clone()));
        }
        None => warn!("Account listener not started, deletions will run inline"),
    }
    tokio::spawn(run_cache_purge(state.clone(), config.cache_purge_interval));

    let app = parley_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_cache_purge(state: AppState, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let purged = state.cache.purge_expired();
        if purged > 0 {
            info!("Cache purge: dropped {} expired threads", purged);
        }
    }
}
