//! Derived queries over `items`, all sharing the WHERE clause of one [`Filter`].
//!
//! Each builder returns a [`BoundQuery`]: SQL text, bound parameters and the
//! filter it came from. Stores execute it; caches key on `(sql, params)`.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::filter::{Filter, SqlParam};
use crate::model::{DayCount, Kpi, SourceCount, TopItem};
use crate::store::ItemStore;

/// Row limit of the dashboard's ranked table.
pub const DASHBOARD_TOP_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKind {
    DistinctSources,
    Kpi,
    TopItems { limit: u32 },
    VolumeBySource { limit: Option<u32> },
    VolumeByDay,
}

impl QueryKind {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::DistinctSources => "sources",
            QueryKind::Kpi => "kpi",
            QueryKind::TopItems { .. } => "top_items",
            QueryKind::VolumeBySource { .. } => "by_source",
            QueryKind::VolumeByDay => "by_day",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub kind: QueryKind,
    pub sql: String,
    pub params: Vec<SqlParam>,
    /// Filter the WHERE clause was built from (`None` for unfiltered queries).
    pub filter: Option<Filter>,
}

impl BoundQuery {
    /// Stable key over the SQL text and parameter values.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        hasher.update([0u8]);
        let params = serde_json::to_vec(&self.params).unwrap_or_default();
        hasher.update(&params);
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

/// Typed result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryOutput {
    Sources(Vec<String>),
    Kpi(Kpi),
    TopItems(Vec<TopItem>),
    BySource(Vec<SourceCount>),
    ByDay(Vec<DayCount>),
}

impl QueryOutput {
    fn variant(&self) -> &'static str {
        match self {
            QueryOutput::Sources(_) => "Sources",
            QueryOutput::Kpi(_) => "Kpi",
            QueryOutput::TopItems(_) => "TopItems",
            QueryOutput::BySource(_) => "BySource",
            QueryOutput::ByDay(_) => "ByDay",
        }
    }
}

fn unexpected<T>(want: &str, got: &QueryOutput) -> Result<T> {
    Err(anyhow!(
        "store returned {} rows for a {} query",
        got.variant(),
        want
    ))
}

pub fn distinct_sources_query() -> BoundQuery {
    BoundQuery {
        kind: QueryKind::DistinctSources,
        sql: "SELECT DISTINCT source FROM items ORDER BY 1".to_string(),
        params: Vec::new(),
        filter: None,
    }
}

pub fn kpi_query(filter: &Filter) -> BoundQuery {
    let w = filter.where_clause();
    BoundQuery {
        kind: QueryKind::Kpi,
        sql: format!(
            "SELECT count(*)::int8 AS n_items, \
             coalesce(round(avg(trend_score)::numeric, 3), 0)::float8 AS avg_score \
             FROM items WHERE {}",
            w.sql
        ),
        params: w.params,
        filter: Some(filter.clone()),
    }
}

/// Ranked rows; ties on score fall back to the newest timestamp first.
pub fn top_items_query(filter: &Filter, limit: u32) -> BoundQuery {
    let w = filter.where_clause();
    BoundQuery {
        kind: QueryKind::TopItems { limit },
        sql: format!(
            "SELECT ts, source, title, url, trend_score::float8 AS trend_score \
             FROM items WHERE {} \
             ORDER BY trend_score DESC, ts DESC \
             LIMIT {limit}",
            w.sql
        ),
        params: w.params,
        filter: Some(filter.clone()),
    }
}

pub fn volume_by_source_query(filter: &Filter, limit: Option<u32>) -> BoundQuery {
    let w = filter.where_clause();
    let mut sql = format!(
        "SELECT source, count(*)::int8 AS n \
         FROM items WHERE {} \
         GROUP BY source ORDER BY n DESC, source",
        w.sql
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
    BoundQuery {
        kind: QueryKind::VolumeBySource { limit },
        sql,
        params: w.params,
        filter: Some(filter.clone()),
    }
}

pub fn volume_by_day_query(filter: &Filter) -> BoundQuery {
    let w = filter.where_clause();
    BoundQuery {
        kind: QueryKind::VolumeByDay,
        sql: format!(
            "SELECT (date_trunc('day', ts AT TIME ZONE 'UTC'))::date AS day, count(*)::int8 AS n \
             FROM items WHERE {} \
             GROUP BY 1 ORDER BY 1",
            w.sql
        ),
        params: w.params,
        filter: Some(filter.clone()),
    }
}

// ---- typed runners ----

pub async fn distinct_sources(store: &dyn ItemStore) -> Result<Vec<String>> {
    match store.run(&distinct_sources_query()).await? {
        QueryOutput::Sources(v) => Ok(v),
        other => unexpected("sources", &other),
    }
}

pub async fn kpi(store: &dyn ItemStore, filter: &Filter) -> Result<Kpi> {
    match store.run(&kpi_query(filter)).await? {
        QueryOutput::Kpi(k) => Ok(k),
        other => unexpected("kpi", &other),
    }
}

pub async fn top_items(store: &dyn ItemStore, filter: &Filter, limit: u32) -> Result<Vec<TopItem>> {
    match store.run(&top_items_query(filter, limit)).await? {
        QueryOutput::TopItems(v) => Ok(v),
        other => unexpected("top_items", &other),
    }
}

pub async fn volume_by_source(
    store: &dyn ItemStore,
    filter: &Filter,
    limit: Option<u32>,
) -> Result<Vec<SourceCount>> {
    match store.run(&volume_by_source_query(filter, limit)).await? {
        QueryOutput::BySource(v) => Ok(v),
        other => unexpected("by_source", &other),
    }
}

pub async fn volume_by_day(store: &dyn ItemStore, filter: &Filter) -> Result<Vec<DayCount>> {
    match store.run(&volume_by_day_query(filter)).await? {
        QueryOutput::ByDay(v) => Ok(v),
        other => unexpected("by_day", &other),
    }
}

/// Everything the dashboard shows for one filter.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub filter: Filter,
    pub kpi: Kpi,
    pub top_items: Vec<TopItem>,
    pub by_source: Vec<SourceCount>,
    pub by_day: Vec<DayCount>,
    pub refreshed_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.kpi.n_items == 0
    }
}

/// Run the four derived queries, one after another, for `filter`.
pub async fn load_snapshot(store: &dyn ItemStore, filter: &Filter) -> Result<DashboardSnapshot> {
    let kpi = kpi(store, filter).await?;
    let top_items = top_items(store, filter, DASHBOARD_TOP_LIMIT).await?;
    let by_source = volume_by_source(store, filter, None).await?;
    let by_day = volume_by_day(store, filter).await?;

    tracing::debug!(
        target: "query",
        n_items = kpi.n_items,
        top = top_items.len(),
        sources = by_source.len(),
        days = by_day.len(),
        "snapshot loaded"
    );

    Ok(DashboardSnapshot {
        filter: filter.clone(),
        kpi,
        top_items,
        by_source,
        by_day,
        refreshed_at: Utc::now(),
    })
}
