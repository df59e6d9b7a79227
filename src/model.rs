// src/model.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One trend signal row of the `items` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub ts: DateTime<Utc>,
    pub source: String, // e.g. "hn", "reddit"
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub trend_score: f64,
}

/// Row shape of the ranked table (body is not fetched for display).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TopItem {
    pub ts: DateTime<Utc>,
    pub source: String,
    pub title: String,
    pub url: String,
    pub trend_score: f64,
}

impl From<&Item> for TopItem {
    fn from(it: &Item) -> Self {
        Self {
            ts: it.ts,
            source: it.source.clone(),
            title: it.title.clone(),
            url: it.url.clone(),
            trend_score: it.trend_score,
        }
    }
}

/// Item count and average trend score for the current filter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Kpi {
    pub n_items: i64,
    /// Rounded to 3 decimals; 0.0 when nothing matches.
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct SourceCount {
    pub source: String,
    pub n: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct DayCount {
    pub day: NaiveDate, // UTC calendar day
    pub n: i64,
}

/// Round half away from zero to 3 decimals, matching Postgres `round(numeric, 3)`.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
