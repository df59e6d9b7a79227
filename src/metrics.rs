use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the query cache TTL as a static gauge.
    pub fn init(cache_ttl: Duration) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("store_queries_total", "Queries sent to Postgres, by kind.");
        describe_counter!("query_cache_hits_total", "Query results served from the TTL cache.");
        describe_counter!("query_cache_misses_total", "Query results fetched from the store.");
        describe_counter!("dashboard_page_views_total", "Dashboard page renders.");
        describe_counter!("dashboard_errors_total", "Requests that failed with a store error.");

        // lifetime of a cached query result; 0 means the cache is off
        gauge!("query_cache_ttl_seconds").set(cache_ttl.as_secs_f64());

        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
