// src/store/memory.rs
//! In-process store over a fixed item list. Evaluates the same filter
//! semantics as the SQL so tests and demos can run without Postgres.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ItemStore;
use crate::filter::Filter;
use crate::model::{round3, DayCount, Item, Kpi, SourceCount, TopItem};
use crate::query::{BoundQuery, QueryKind, QueryOutput};

#[derive(Debug)]
pub struct MemoryStore {
    items: Vec<Item>,
    /// Reference "now" for window predicates.
    now: DateTime<Utc>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self::with_now(items, Utc::now())
    }

    pub fn with_now(items: Vec<Item>, now: DateTime<Utc>) -> Self {
        Self {
            items,
            now,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of queries executed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Item> + 'a {
        self.items
            .iter()
            .filter(move |it| filter.matches(it, self.now))
    }
}

fn require_filter(q: &BoundQuery) -> Result<&Filter> {
    q.filter
        .as_ref()
        .ok_or_else(|| anyhow!("{} query carries no filter", q.kind.label()))
}

#[async_trait::async_trait]
impl ItemStore for MemoryStore {
    async fn run(&self, query: &BoundQuery) -> Result<QueryOutput> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let out = match query.kind {
            QueryKind::DistinctSources => {
                let set: BTreeSet<&str> = self.items.iter().map(|it| it.source.as_str()).collect();
                QueryOutput::Sources(set.into_iter().map(str::to_string).collect())
            }
            QueryKind::Kpi => {
                let f = require_filter(query)?;
                let (n, sum) = self
                    .matching(f)
                    .fold((0i64, 0f64), |(n, s), it| (n + 1, s + it.trend_score));
                let avg_score = if n > 0 { round3(sum / n as f64) } else { 0.0 };
                QueryOutput::Kpi(Kpi {
                    n_items: n,
                    avg_score,
                })
            }
            QueryKind::TopItems { limit } => {
                let f = require_filter(query)?;
                let mut rows: Vec<&Item> = self.matching(f).collect();
                rows.sort_by(|a, b| {
                    b.trend_score
                        .total_cmp(&a.trend_score)
                        .then_with(|| b.ts.cmp(&a.ts))
                });
                QueryOutput::TopItems(
                    rows.into_iter()
                        .take(limit as usize)
                        .map(TopItem::from)
                        .collect(),
                )
            }
            QueryKind::VolumeBySource { limit } => {
                let f = require_filter(query)?;
                let mut counts: HashMap<&str, i64> = HashMap::new();
                for it in self.matching(f) {
                    *counts.entry(it.source.as_str()).or_default() += 1;
                }
                let mut rows: Vec<SourceCount> = counts
                    .into_iter()
                    .map(|(source, n)| SourceCount {
                        source: source.to_string(),
                        n,
                    })
                    .collect();
                rows.sort_by(|a, b| b.n.cmp(&a.n).then_with(|| a.source.cmp(&b.source)));
                if let Some(n) = limit {
                    rows.truncate(n as usize);
                }
                QueryOutput::BySource(rows)
            }
            QueryKind::VolumeByDay => {
                let f = require_filter(query)?;
                let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
                for it in self.matching(f) {
                    *days.entry(it.ts.date_naive()).or_default() += 1;
                }
                QueryOutput::ByDay(
                    days.into_iter()
                        .map(|(day, n)| DayCount { day, n })
                        .collect(),
                )
            }
        };
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
