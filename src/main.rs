//! Tech trend dashboard: binary entrypoint.
//! Loads settings, wires the cached Postgres store into the router and serves it.

use std::sync::Arc;

use tracing::{error, info, warn};

use trend_dashboard::api::{self, AppState};
use trend_dashboard::cache::CachedStore;
use trend_dashboard::config::AppConfig;
use trend_dashboard::metrics::Metrics;
use trend_dashboard::store::{ItemStore, PgStore};
use trend_dashboard::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            // Stop before serving anything; the message names the setting.
            error!(target: "trend_dashboard", error = %e, "configuration error");
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    let host_caption = format!("Using host: {}", cfg.db.summary().host_port());
    info!(target: "trend_dashboard", db = %cfg.db.summary(), "{host_caption}");

    let pg = PgStore::connect_lazy(&cfg.db)?;
    let store: Arc<dyn ItemStore> = if cfg.cache_ttl.is_zero() {
        warn!(target: "trend_dashboard", "QUERY_CACHE_TTL_SECS=0, query cache disabled");
        Arc::new(pg)
    } else {
        Arc::new(CachedStore::with_ttl(pg, cfg.cache_ttl))
    };

    let metrics = Metrics::init(cfg.cache_ttl)?;
    let state = AppState::new(store).with_caption(host_caption);
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    info!(target: "trend_dashboard", addr = %cfg.bind_addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
