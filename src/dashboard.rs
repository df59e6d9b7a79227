//! Server-rendered dashboard page.
//!
//! The page is a plain GET form (window, sources, search text) followed by
//! the KPI row, the ranked table and two chart images. Chart URLs carry the
//! same filter in their query string so every panel reflects one selection.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write as _;

use crate::filter::{Filter, ALLOWED_WINDOWS};
use crate::query::DashboardSnapshot;

pub const PAGE_TITLE: &str = "Daily Tech Trends";

pub const EMPTY_TOP_ITEMS: &str = "No items match your filters.";
pub const EMPTY_BY_SOURCE: &str = "No data for selected window/sources.";
pub const EMPTY_BY_DAY: &str = "No daily data.";

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
.caption{color:#666;font-size:.9rem}\
.controls{display:flex;gap:2rem;align-items:flex-start;margin:1rem 0}\
.kpis{display:flex;gap:3rem;margin:1.5rem 0}.kpi .v{font-size:1.8rem}\
table{border-collapse:collapse;width:100%}td,th{padding:.3rem .6rem;border-bottom:1px solid #eee;text-align:left}\
.info{background:#eef4fb;padding:.6rem 1rem;border-radius:4px}\
img.chart{max-width:100%}";

/// Query string that reproduces `filter` (`days=7&source=hn&q=rust`).
pub fn filter_query_string(filter: &Filter) -> String {
    let mut out = format!("days={}", filter.days.get());
    for s in filter.sources.iter().flatten() {
        let _ = write!(out, "&source={}", utf8_percent_encode(s, QUERY_VALUE));
    }
    if let Some(q) = &filter.query_text {
        let _ = write!(out, "&q={}", utf8_percent_encode(q, QUERY_VALUE));
    }
    out
}

/// Only absolute web links become anchors; anything else renders as text.
fn is_web_link(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Render the whole page for one snapshot.
///
/// `all_sources` drives the checkbox list; `caption` is the connection line
/// shown under the title (e.g. `Using host: db.example.com:6543`).
pub fn render_page(snap: &DashboardSnapshot, all_sources: &[String], caption: Option<&str>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    let _ = write!(
        html,
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>Tech Trend Dashboard</title><style>{STYLE}</style></head><body>"
    );
    let _ = write!(html, "<h1>{}</h1>", PAGE_TITLE);
    html.push_str("<p class=\"caption\">Interactive view on your trend dataset</p>");
    if let Some(c) = caption {
        let _ = write!(html, "<p class=\"caption\">{}</p>", text(c));
    }

    render_controls(&mut html, &snap.filter, all_sources);
    render_kpis(&mut html, snap);
    render_top_items(&mut html, snap);

    let qs = filter_query_string(&snap.filter);
    html.push_str("<h2>Volume by source</h2>");
    if snap.by_source.is_empty() {
        info(&mut html, EMPTY_BY_SOURCE);
    } else {
        let _ = write!(
            html,
            "<img class=\"chart\" alt=\"Volume by source\" src=\"/charts/sources.png?{}\">",
            attr(&qs)
        );
        html.push_str("<p class=\"caption\">");
        let legend: Vec<String> = snap
            .by_source
            .iter()
            .map(|s| format!("{} ({})", text(&s.source), s.n))
            .collect();
        html.push_str(&legend.join(" · "));
        html.push_str("</p>");
    }

    let _ = write!(html, "<h2>Daily volume (last {}d)</h2>", snap.filter.days.get());
    if snap.by_day.is_empty() {
        info(&mut html, EMPTY_BY_DAY);
    } else {
        let _ = write!(
            html,
            "<img class=\"chart\" alt=\"Daily volume\" src=\"/charts/daily.png?{}\">",
            attr(&qs)
        );
        if let (Some(first), Some(last)) = (snap.by_day.first(), snap.by_day.last()) {
            let _ = write!(
                html,
                "<p class=\"caption\">{} to {}</p>",
                first.day, last.day
            );
        }
    }

    html.push_str("</body></html>");
    html
}

fn info(html: &mut String, msg: &str) {
    let _ = write!(html, "<p class=\"info\">{}</p>", text(msg));
}

fn render_controls(html: &mut String, filter: &Filter, all_sources: &[String]) {
    html.push_str("<form method=\"get\" action=\"/\" class=\"controls\">");

    html.push_str("<label>Window (days)<br><select name=\"days\">");
    for d in ALLOWED_WINDOWS {
        let sel = if d == filter.days.get() { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{d}\"{sel}>{d}</option>");
    }
    html.push_str("</select></label>");

    html.push_str("<fieldset><legend>Sources</legend>");
    for s in all_sources {
        let checked = match &filter.sources {
            None => true,
            Some(picked) => picked.contains(s),
        };
        let _ = write!(
            html,
            "<label><input type=\"checkbox\" name=\"source\" value=\"{}\"{}> {}</label> ",
            attr(s),
            if checked { " checked" } else { "" },
            text(s)
        );
    }
    html.push_str("</fieldset>");

    let _ = write!(
        html,
        "<label>Search in title/body (optional)<br>\
         <input type=\"text\" name=\"q\" value=\"{}\"></label>",
        attr(filter.query_text.as_deref().unwrap_or(""))
    );
    html.push_str("<button type=\"submit\">Apply</button></form>");
}

fn render_kpis(html: &mut String, snap: &DashboardSnapshot) {
    let metrics = [
        ("Items", snap.kpi.n_items.to_string()),
        ("Avg trend score", format!("{}", snap.kpi.avg_score)),
        (
            "Last refresh (UTC)",
            snap.refreshed_at.format("%Y-%m-%d %H:%M").to_string(),
        ),
    ];
    html.push_str("<div class=\"kpis\">");
    for (label, value) in metrics {
        let _ = write!(
            html,
            "<div class=\"kpi\"><div class=\"l\">{label}</div><div class=\"v\">{}</div></div>",
            text(&value)
        );
    }
    html.push_str("</div>");
}

fn render_top_items(html: &mut String, snap: &DashboardSnapshot) {
    html.push_str("<h2>Top items</h2>");
    if snap.top_items.is_empty() {
        info(html, EMPTY_TOP_ITEMS);
        return;
    }
    html.push_str(
        "<table><thead><tr><th>Time (UTC)</th><th>Source</th><th>Title</th>\
         <th>Trend score</th></tr></thead><tbody>",
    );
    for it in &snap.top_items {
        let title = if is_web_link(&it.url) {
            format!(
                "<a href=\"{}\" rel=\"noopener\" target=\"_blank\">{}</a>",
                attr(&it.url),
                text(&it.title)
            )
        } else {
            text(&it.title).into_owned()
        };
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td></tr>",
            it.ts.format("%Y-%m-%d %H:%M"),
            text(&it.source),
            title,
            it.trend_score
        );
    }
    html.push_str("</tbody></table>");
}
