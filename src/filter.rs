//! # Filter composition
//! Turns the three dashboard inputs (window, source subset, search text) into
//! one parameterized WHERE clause.
//!
//! Only the *presence* of a clause changes the SQL text. Every user value
//! travels as a bound parameter (`$1`, `$2`, ...), never spliced into SQL.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::model::Item;

/// Windows offered by the dashboard control.
pub const ALLOWED_WINDOWS: [u32; 4] = [1, 7, 14, 30];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("window must be one of 1, 7, 14 or 30 days (got {0})")]
    InvalidWindow(u32),
}

/// Trailing window size in days, restricted to [`ALLOWED_WINDOWS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowDays(u32);

impl WindowDays {
    pub const WEEK: WindowDays = WindowDays(7);

    pub fn new(days: u32) -> Result<Self, FilterError> {
        if ALLOWED_WINDOWS.contains(&days) {
            Ok(Self(days))
        } else {
            Err(FilterError::InvalidWindow(days))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Oldest timestamp still inside the window.
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - ChronoDuration::days(i64::from(self.0))
    }
}

impl Default for WindowDays {
    fn default() -> Self {
        Self::WEEK
    }
}

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Int(i32),
    Text(String),
    TextArray(Vec<String>),
}

/// Predicate text (without the `WHERE` keyword) plus its parameters in
/// placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Normalized user selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub days: WindowDays,
    /// `None` means every source (no predicate).
    pub sources: Option<Vec<String>>,
    /// Search text exactly as typed; `None` when the box is blank.
    pub query_text: Option<String>,
}

impl Filter {
    /// Window-only filter (used by the weekly report).
    pub fn window_only(days: WindowDays) -> Self {
        Self {
            days,
            sources: None,
            query_text: None,
        }
    }

    /// Build a filter from raw control values.
    ///
    /// An empty selection, or one covering every known source, collapses to
    /// "all sources" so no source predicate is emitted.
    pub fn new(
        days: WindowDays,
        selected: &[String],
        all_sources: &[String],
        query_text: Option<&str>,
    ) -> Self {
        let picked: BTreeSet<String> = selected
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let covers_all = all_sources.iter().all(|s| picked.contains(s));
        let sources = if picked.is_empty() || covers_all {
            None
        } else {
            Some(picked.into_iter().collect())
        };

        let query_text = query_text
            .filter(|q| !q.trim().is_empty())
            .map(str::to_string);

        Self {
            days,
            sources,
            query_text,
        }
    }

    /// Compose the shared WHERE clause.
    pub fn where_clause(&self) -> WhereClause {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        let mut params: Vec<SqlParam> = Vec::with_capacity(3);

        // Window is always present (days is never "unconstrained").
        params.push(SqlParam::Int(self.days.get() as i32));
        parts.push(format!("ts >= now() - make_interval(days => ${})", params.len()));

        if let Some(sources) = &self.sources {
            params.push(SqlParam::TextArray(sources.clone()));
            parts.push(format!("source = ANY(${})", params.len()));
        }

        if let Some(q) = &self.query_text {
            params.push(SqlParam::Text(like_pattern(&q.to_lowercase())));
            let n = params.len();
            parts.push(format!("(lower(title) LIKE ${n} OR lower(body) LIKE ${n})"));
        }

        WhereClause {
            sql: parts.join(" AND "),
            params,
        }
    }

    /// Same predicate evaluated in-process against one item.
    pub fn matches(&self, item: &Item, now: DateTime<Utc>) -> bool {
        if item.ts < self.days.cutoff(now) {
            return false;
        }
        if let Some(sources) = &self.sources {
            if !sources.iter().any(|s| s == &item.source) {
                return false;
            }
        }
        if let Some(q) = &self.query_text {
            let q = q.to_lowercase();
            let in_title = item.title.to_lowercase().contains(q.as_str());
            let in_body = item
                .body
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(q.as_str()));
            if !(in_title || in_body) {
                return false;
            }
        }
        true
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::window_only(WindowDays::default())
    }
}

/// `%text%` with LIKE wildcards in the user text escaped, so the search stays
/// a literal substring match.
fn like_pattern(q: &str) -> String {
    let mut out = String::with_capacity(q.len() + 2);
    out.push('%');
    for ch in q.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn all() -> Vec<String> {
        vec!["github".into(), "hn".into(), "reddit".into()]
    }

    fn item(source: &str, title: &str, body: Option<&str>, ts: DateTime<Utc>) -> Item {
        Item {
            ts,
            source: source.into(),
            title: title.into(),
            body: body.map(str::to_string),
            url: "https://example.com".into(),
            trend_score: 0.5,
        }
    }

    #[test]
    fn window_rejects_unknown_sizes() {
        assert!(WindowDays::new(7).is_ok());
        assert_eq!(WindowDays::new(3), Err(FilterError::InvalidWindow(3)));
        assert_eq!(WindowDays::new(0), Err(FilterError::InvalidWindow(0)));
    }

    #[test]
    fn default_filter_only_has_window_clause() {
        let f = Filter::new(WindowDays::WEEK, &all(), &all(), Some("   "));
        let w = f.where_clause();
        assert_eq!(w.sql, "ts >= now() - make_interval(days => $1)");
        assert_eq!(w.params, vec![SqlParam::Int(7)]);
    }

    #[test]
    fn empty_selection_means_all_sources() {
        let f = Filter::new(WindowDays::WEEK, &[], &all(), None);
        assert_eq!(f.sources, None);
    }

    #[test]
    fn subset_and_text_add_numbered_placeholders() {
        let f = Filter::new(
            WindowDays::new(14).unwrap(),
            &["hn".to_string(), "reddit".to_string()],
            &all(),
            Some("  Rust "),
        );
        let w = f.where_clause();
        assert_eq!(
            w.sql,
            "ts >= now() - make_interval(days => $1) AND source = ANY($2) AND (lower(title) LIKE $3 OR lower(body) LIKE $3)"
        );
        assert_eq!(
            w.params,
            vec![
                SqlParam::Int(14),
                SqlParam::TextArray(vec!["hn".into(), "reddit".into()]),
                SqlParam::Text("%  rust %".into()),
            ]
        );
        assert_eq!(f.query_text.as_deref(), Some("  Rust "));
    }

    #[test]
    fn leading_space_is_part_of_the_search() {
        let now = Utc.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap();
        let f = Filter::new(WindowDays::WEEK, &[], &all(), Some(" Rust"));
        assert_eq!(
            f.where_clause().params.last(),
            Some(&SqlParam::Text("% rust%".into()))
        );

        let fresh = now - ChronoDuration::hours(1);
        assert!(!f.matches(&item("hn", "In trust we trust", None, fresh), now));
        assert!(f.matches(&item("hn", "Learning rust today", None, fresh), now));
    }

    #[test]
    fn values_never_reach_sql_text() {
        let evil = "x'; drop table items; --";
        let f = Filter::new(WindowDays::WEEK, &["o'brien".to_string()], &all(), Some(evil));
        let w = f.where_clause();
        assert!(!w.sql.contains("drop"));
        assert!(!w.sql.contains("o'brien"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn matches_applies_window_sources_and_text() {
        let now = Utc.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap();
        let f = Filter::new(
            WindowDays::new(1).unwrap(),
            &["hn".to_string()],
            &all(),
            Some("RUST"),
        );

        let fresh = now - ChronoDuration::hours(3);
        assert!(f.matches(&item("hn", "Rust 2.0", None, fresh), now));
        assert!(f.matches(&item("hn", "News", Some("about rust"), fresh), now));
        assert!(!f.matches(&item("hn", "News", None, fresh), now));
        assert!(!f.matches(&item("reddit", "Rust", None, fresh), now));

        let boundary = now - ChronoDuration::days(1);
        assert!(f.matches(&item("hn", "rust", None, boundary), now));
        let stale = boundary - ChronoDuration::seconds(1);
        assert!(!f.matches(&item("hn", "rust", None, stale), now));
    }
}
