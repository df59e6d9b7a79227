// src/store/pg.rs
//! Postgres-backed store. Every query checks out one pooled connection,
//! runs inside a read-only transaction, and returns the connection on drop.

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::time::Duration;
use tracing::{debug, info};

use super::ItemStore;
use crate::config::db::DbConfig;
use crate::filter::SqlParam;
use crate::model::{DayCount, Kpi, SourceCount, TopItem};
use crate::query::{BoundQuery, QueryKind, QueryOutput};

const MAX_CONNECTIONS: u32 = 5;

/// Bind every parameter in placeholder order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut q = $query;
        for p in $params {
            q = match p {
                SqlParam::Int(v) => q.bind(*v),
                SqlParam::Text(s) => q.bind(s.clone()),
                SqlParam::TextArray(v) => q.bind(v.clone()),
            };
        }
        q
    }};
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Pool that opens connections on first use (dashboard startup never
    /// blocks on the database). Connections are pinged before checkout.
    pub fn connect_lazy(db: &DbConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .test_before_acquire(true)
            .connect_lazy(db.url())
            .with_context(|| format!("invalid database url for {}", db.summary()))?;
        info!(target: "store", db = %db.summary(), "postgres pool configured (lazy)");
        Ok(Self { pool })
    }

    /// Build the pool and verify the server answers `SELECT 1` within
    /// `probe_timeout`.
    pub async fn connect(db: &DbConfig, probe_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(probe_timeout)
            .connect_lazy(db.url())
            .with_context(|| format!("invalid database url for {}", db.summary()))?;
        let store = Self { pool };
        store.probe(probe_timeout).await?;
        Ok(store)
    }

    pub async fn probe(&self, timeout: Duration) -> Result<()> {
        let ping = sqlx::query_scalar::<Postgres, i32>("SELECT 1").fetch_one(&self.pool);
        match tokio::time::timeout(timeout, ping).await {
            Ok(Ok(_)) => {
                info!(target: "store", "database connectivity ok");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow!(e).context("database connectivity check failed")),
            Err(_) => Err(anyhow!(
                "database connectivity check timed out after {}s",
                timeout.as_secs()
            )),
        }
    }
}

#[async_trait::async_trait]
impl ItemStore for PgStore {
    async fn run(&self, query: &BoundQuery) -> Result<QueryOutput> {
        let label = query.kind.label();
        counter!("store_queries_total", "kind" => label).increment(1);
        debug!(target: "store", kind = label, params = query.params.len(), "executing");

        let mut tx = self.pool.begin().await.context("begin transaction")?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .context("set read-only")?;
        let sql = query.sql.as_str();
        let params = &query.params;

        let out = match query.kind {
            QueryKind::DistinctSources => {
                let rows = bind_params!(sqlx::query_scalar::<Postgres, String>(sql), params)
                    .fetch_all(&mut *tx)
                    .await
                    .context("distinct sources query")?;
                QueryOutput::Sources(rows)
            }
            QueryKind::Kpi => {
                let row = bind_params!(sqlx::query_as::<Postgres, Kpi>(sql), params)
                    .fetch_one(&mut *tx)
                    .await
                    .context("kpi query")?;
                QueryOutput::Kpi(row)
            }
            QueryKind::TopItems { .. } => {
                let rows = bind_params!(sqlx::query_as::<Postgres, TopItem>(sql), params)
                    .fetch_all(&mut *tx)
                    .await
                    .context("top items query")?;
                QueryOutput::TopItems(rows)
            }
            QueryKind::VolumeBySource { .. } => {
                let rows = bind_params!(sqlx::query_as::<Postgres, SourceCount>(sql), params)
                    .fetch_all(&mut *tx)
                    .await
                    .context("volume by source query")?;
                QueryOutput::BySource(rows)
            }
            QueryKind::VolumeByDay => {
                let rows = bind_params!(sqlx::query_as::<Postgres, DayCount>(sql), params)
                    .fetch_all(&mut *tx)
                    .await
                    .context("volume by day query")?;
                QueryOutput::ByDay(rows)
            }
        };

        tx.commit().await.context("commit transaction")?;
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
