// tests/filter_properties.rs
//
// Query semantics over a small fixed fixture, run through the in-memory store.
//
// Fixture (now = 2025-10-10 12:00 UTC):
//   hn      now-1h   "Rust 2.0 released"       0.1
//   reddit  now-2d   "AI chips" (body: rust)   0.9
//   github  now-5d   "New JS framework"        0.5
//   hn      now-9d   "Old rust news"           0.3
//   reddit  now-10d  "Ancient thread"          0.7

use chrono::{DateTime, Duration, TimeZone, Utc};

use trend_dashboard::filter::{Filter, WindowDays};
use trend_dashboard::model::Item;
use trend_dashboard::query::{self, DASHBOARD_TOP_LIMIT};
use trend_dashboard::store::MemoryStore;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap()
}

fn item(source: &str, age: Duration, title: &str, body: Option<&str>, score: f64) -> Item {
    Item {
        ts: now() - age,
        source: source.into(),
        title: title.into(),
        body: body.map(str::to_string),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        trend_score: score,
    }
}

fn fixture() -> MemoryStore {
    MemoryStore::with_now(
        vec![
            item("hn", Duration::hours(1), "Rust 2.0 released", None, 0.1),
            item("reddit", Duration::days(2), "AI chips", Some("Rust in the kernel"), 0.9),
            item("github", Duration::days(5), "New JS framework", None, 0.5),
            item("hn", Duration::days(9), "Old rust news", None, 0.3),
            item("reddit", Duration::days(10), "Ancient thread", None, 0.7),
        ],
        now(),
    )
}

fn all_sources() -> Vec<String> {
    vec!["github".into(), "hn".into(), "reddit".into()]
}

fn filter(days: u32, sources: &[&str], q: Option<&str>) -> Filter {
    let picked: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
    Filter::new(WindowDays::new(days).unwrap(), &picked, &all_sources(), q)
}

#[tokio::test]
async fn window_controls_item_count() {
    let store = fixture();
    for (days, expected) in [(1, 1), (7, 3), (14, 5), (30, 5)] {
        let kpi = query::kpi(&store, &filter(days, &[], None)).await.unwrap();
        assert_eq!(kpi.n_items, expected, "window {days}d");
    }
}

#[tokio::test]
async fn weekly_average_is_rounded_mean() {
    let kpi = query::kpi(&fixture(), &filter(7, &[], None)).await.unwrap();
    assert!((kpi.avg_score - 0.5).abs() < 1e-9, "got {}", kpi.avg_score);
}

#[tokio::test]
async fn source_subset_restricts_and_full_selection_does_not() {
    let store = fixture();
    let hn_only = query::kpi(&store, &filter(30, &["hn"], None)).await.unwrap();
    assert_eq!(hn_only.n_items, 2);

    let every = filter(30, &["github", "hn", "reddit"], None);
    assert_eq!(every.sources, None);
    assert_eq!(query::kpi(&store, &every).await.unwrap().n_items, 5);
}

#[tokio::test]
async fn text_search_is_case_insensitive_over_title_and_body() {
    let store = fixture();
    let rows = query::top_items(&store, &filter(30, &[], Some("RUST")), DASHBOARD_TOP_LIMIT)
        .await
        .unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["AI chips", "Old rust news", "Rust 2.0 released"]);
}

#[tokio::test]
async fn top_items_are_ranked_by_score() {
    let rows = query::top_items(&fixture(), &filter(30, &[], None), DASHBOARD_TOP_LIMIT)
        .await
        .unwrap();
    let scores: Vec<f64> = rows.iter().map(|r| r.trend_score).collect();
    assert_eq!(scores, vec![0.9, 0.7, 0.5, 0.3, 0.1]);
}

#[tokio::test]
async fn score_ties_prefer_newest() {
    let store = MemoryStore::with_now(
        vec![
            item("hn", Duration::days(3), "older", None, 0.4),
            item("hn", Duration::days(1), "newer", None, 0.4),
        ],
        now(),
    );
    let rows = query::top_items(&store, &filter(7, &[], None), 10).await.unwrap();
    assert_eq!(rows[0].title, "newer");
    assert_eq!(rows[1].title, "older");
}

#[tokio::test]
async fn aggregates_agree_with_the_kpi_count() {
    let store = fixture();
    for f in [
        filter(30, &[], None),
        filter(7, &["hn", "reddit"], None),
        filter(14, &[], Some("rust")),
    ] {
        let snap = query::load_snapshot(&store, &f).await.unwrap();
        let by_source: i64 = snap.by_source.iter().map(|s| s.n).sum();
        let by_day: i64 = snap.by_day.iter().map(|d| d.n).sum();
        assert_eq!(snap.top_items.len() as i64, snap.kpi.n_items);
        assert_eq!(by_source, snap.kpi.n_items);
        assert_eq!(by_day, snap.kpi.n_items);
    }
}

#[tokio::test]
async fn daily_volume_covers_only_in_window_utc_days() {
    let rows = query::volume_by_day(&fixture(), &filter(7, &[], None)).await.unwrap();
    let got: Vec<(String, i64)> = rows.iter().map(|d| (d.day.to_string(), d.n)).collect();
    assert_eq!(
        got,
        vec![
            ("2025-10-05".to_string(), 1),
            ("2025-10-08".to_string(), 1),
            ("2025-10-10".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn volume_by_source_sorts_by_count_then_name() {
    let rows = query::volume_by_source(&fixture(), &filter(30, &[], None), None)
        .await
        .unwrap();
    let got: Vec<(&str, i64)> = rows.iter().map(|r| (r.source.as_str(), r.n)).collect();
    assert_eq!(got, vec![("hn", 2), ("reddit", 2), ("github", 1)]);
}

#[tokio::test]
async fn empty_result_reports_zero_average() {
    let snap = query::load_snapshot(&fixture(), &filter(1, &[], Some("no such words")))
        .await
        .unwrap();
    assert!(snap.is_empty());
    assert_eq!(snap.kpi.avg_score, 0.0);
    assert!(snap.top_items.is_empty());
    assert!(snap.by_source.is_empty());
    assert!(snap.by_day.is_empty());
}

#[tokio::test]
async fn distinct_sources_are_sorted() {
    assert_eq!(query::distinct_sources(&fixture()).await.unwrap(), all_sources());
}
