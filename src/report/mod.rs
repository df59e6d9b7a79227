// src/report/mod.rs
//! Weekly report: fixed 7-day window, rendered to PDF, optionally mailed.

pub mod pdf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::filter::{Filter, WindowDays};
use crate::model::{DayCount, Kpi, SourceCount, TopItem};
use crate::notify::{mailer_from_config, Attachment, Mailer, ReportEmail};
use crate::query;
use crate::store::ItemStore;

pub const TOP_SOURCES: u32 = 10;
pub const TOP_ITEMS: u32 = 20;

/// Aggregates behind one weekly report.
#[derive(Debug, Clone)]
pub struct WeeklyReport {
    pub generated_on: NaiveDate,
    pub kpi: Kpi,
    pub by_day: Vec<DayCount>,
    pub by_source: Vec<SourceCount>,
    pub top_items: Vec<TopItem>,
}

impl WeeklyReport {
    pub fn title(&self) -> String {
        title_for(self.generated_on)
    }

    pub fn file_name(&self) -> String {
        file_name_for(self.generated_on)
    }
}

pub fn title_for(date: NaiveDate) -> String {
    format!("Weekly Tech Trends — {}", date.format("%Y-%m-%d"))
}

pub fn file_name_for(date: NaiveDate) -> String {
    format!("weekly_trends_{}.pdf", date.format("%Y-%m-%d"))
}

/// Query the four aggregates for the trailing 7 days.
/// Store errors propagate; there is no retry.
pub async fn collect(store: &dyn ItemStore, generated_on: NaiveDate) -> Result<WeeklyReport> {
    let filter = Filter::window_only(WindowDays::WEEK);
    let kpi = query::kpi(store, &filter).await.context("weekly kpi")?;
    let by_day = query::volume_by_day(store, &filter)
        .await
        .context("weekly daily volume")?;
    let by_source = query::volume_by_source(store, &filter, Some(TOP_SOURCES))
        .await
        .context("weekly top sources")?;
    let top_items = query::top_items(store, &filter, TOP_ITEMS)
        .await
        .context("weekly top items")?;

    Ok(WeeklyReport {
        generated_on,
        kpi,
        by_day,
        by_source,
        top_items,
    })
}

/// Build the email that carries a rendered report.
pub fn email_for(report: &WeeklyReport, pdf_bytes: Vec<u8>) -> ReportEmail {
    ReportEmail {
        subject: report.title(),
        body: "Attached: weekly trend report (PDF).".to_string(),
        attachment: Attachment {
            filename: report.file_name(),
            content_type: "application/pdf",
            bytes: pdf_bytes,
        },
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Skipped,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub path: PathBuf,
    pub delivery: Delivery,
}

/// Collect, render, write `weekly_trends_<date>.pdf` into `out_dir`, then
/// email it when a mailer is configured. A failed email is logged and
/// reported in the outcome; the written file stands.
pub async fn run(
    store: &dyn ItemStore,
    out_dir: &Path,
    mailer: Option<&dyn Mailer>,
    generated_on: NaiveDate,
) -> Result<RunOutcome> {
    let (report, path, bytes) = write(store, out_dir, generated_on).await?;
    let delivery = deliver(&report, bytes, mailer).await;
    Ok(RunOutcome { path, delivery })
}

/// Same as [`run`], with the transport built from `mail` once the file is on
/// disk. A transport that cannot be built counts as a failed delivery.
pub async fn run_with_mail(
    store: &dyn ItemStore,
    out_dir: &Path,
    mail: Option<&MailConfig>,
    generated_on: NaiveDate,
) -> Result<RunOutcome> {
    let (report, path, bytes) = write(store, out_dir, generated_on).await?;
    let delivery = match mailer_from_config(mail) {
        Ok(mailer) => deliver(&report, bytes, mailer.as_deref()).await,
        Err(e) => {
            warn!(target: "email", error = ?e, "mail transport unavailable");
            Delivery::Failed(format!("{e:#}"))
        }
    };
    Ok(RunOutcome { path, delivery })
}

async fn write(
    store: &dyn ItemStore,
    out_dir: &Path,
    generated_on: NaiveDate,
) -> Result<(WeeklyReport, PathBuf, Vec<u8>)> {
    let report = collect(store, generated_on).await?;
    let bytes = pdf::render(&report).context("render pdf")?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("create {}", out_dir.display()))?;
    let path = out_dir.join(report.file_name());
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    info!(target: "report", path = %path.display(), items = report.kpi.n_items, "wrote report");

    Ok((report, path, bytes))
}

async fn deliver(report: &WeeklyReport, bytes: Vec<u8>, mailer: Option<&dyn Mailer>) -> Delivery {
    let Some(m) = mailer else {
        info!(target: "email", "skipped (missing mail api key or addresses)");
        return Delivery::Skipped;
    };
    match m.send(&email_for(report, bytes)).await {
        Ok(()) => {
            info!(target: "email", transport = m.name(), "report sent");
            Delivery::Sent
        }
        Err(e) => {
            warn!(target: "email", transport = m.name(), error = ?e, "report email failed");
            Delivery::Failed(format!("{e:#}"))
        }
    }
}
