use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::charts;
use crate::dashboard;
use crate::filter::{Filter, WindowDays};
use crate::query::{self, DashboardSnapshot};
use crate::store::ItemStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    /// Connection line shown under the page title.
    pub caption: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", get(index))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/sources", get(api_sources))
        .route("/charts/daily.png", get(chart_daily))
        .route("/charts/sources.png", get(chart_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Request failures: bad control values are the caller's fault, anything
/// from the store is ours.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Store(e) => {
                error!(target: "api", error = ?e, "query failed");
                counter!("dashboard_errors_total").increment(1);
                (StatusCode::INTERNAL_SERVER_ERROR, "query failed").into_response()
            }
        }
    }
}

/// Raw control values from the query string. `source` may repeat.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub days: WindowDays,
    pub sources: Vec<String>,
    pub q: Option<String>,
}

impl Controls {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut out = Controls::default();
        for (k, v) in pairs {
            match k.as_str() {
                "days" => {
                    let n: u32 = v
                        .trim()
                        .parse()
                        .map_err(|_| ApiError::BadRequest(format!("days: '{v}' is not a number")))?;
                    out.days = WindowDays::new(n).map_err(|e| ApiError::BadRequest(e.to_string()))?;
                }
                "source" => out.sources.push(v.clone()),
                "q" => out.q = Some(v.clone()),
                _ => {}
            }
        }
        Ok(out)
    }
}

/// Resolve controls against the live source list.
async fn resolve(
    store: &dyn ItemStore,
    pairs: &[(String, String)],
) -> Result<(Filter, Vec<String>), ApiError> {
    let controls = Controls::from_pairs(pairs)?;
    let all = query::distinct_sources(store).await?;
    let filter = Filter::new(controls.days, &controls.sources, &all, controls.q.as_deref());
    Ok((filter, all))
}

async fn snapshot_for(
    state: &AppState,
    pairs: &[(String, String)],
) -> Result<(DashboardSnapshot, Vec<String>), ApiError> {
    let store = state.store.as_ref();
    let (filter, all) = resolve(store, pairs).await?;
    let snap = query::load_snapshot(store, &filter).await?;
    Ok((snap, all))
}

async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    counter!("dashboard_page_views_total").increment(1);
    let (snap, all) = snapshot_for(&state, &pairs).await?;
    Ok(Html(dashboard::render_page(
        &snap,
        &all,
        state.caption.as_deref(),
    )))
}

async fn api_dashboard(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let (snap, _) = snapshot_for(&state, &pairs).await?;
    Ok(Json(snap))
}

async fn api_sources(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(query::distinct_sources(state.store.as_ref()).await?))
}

fn png(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

async fn chart_daily(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();
    let (filter, _) = resolve(store, &pairs).await?;
    let days = query::volume_by_day(store, &filter).await?;
    let now = Utc::now();
    let caption = format!("Daily volume (last {}d)", filter.days.get());
    let img = charts::line_chart(
        &caption,
        &days,
        filter.days.cutoff(now).date_naive(),
        now.date_naive(),
    )?;
    Ok(png(charts::encode_png(&img)?))
}

async fn chart_sources(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();
    let (filter, _) = resolve(store, &pairs).await?;
    let counts = query::volume_by_source(store, &filter, None).await?;
    let img = charts::bar_chart("Volume by source", &counts)?;
    Ok(png(charts::encode_png(&img)?))
}
