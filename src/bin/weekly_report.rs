//! Weekly report job: query the last 7 days, write the PDF, email it if configured.
//!
//! Exit codes: 0 on success (including a failed or skipped email),
//! 2 on a configuration error, 1 on database or rendering failures.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use trend_dashboard::config::AppConfig;
use trend_dashboard::report::{self, Delivery};
use trend_dashboard::store::PgStore;
use trend_dashboard::telemetry;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!(target: "weekly_report", error = %e, "configuration error");
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };
    info!(target: "weekly_report", db = %cfg.db.summary(), "starting weekly report");

    if let Err(e) = run(&cfg).await {
        error!(target: "weekly_report", error = ?e, "weekly report failed");
        eprintln!("weekly report failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: &AppConfig) -> anyhow::Result<()> {
    let store = PgStore::connect(&cfg.db, PROBE_TIMEOUT).await?;
    let outcome = report::run_with_mail(
        &store,
        &cfg.report_dir,
        cfg.mail.as_ref(),
        Utc::now().date_naive(),
    )
    .await?;

    match outcome.delivery {
        Delivery::Sent => {
            info!(target: "weekly_report", path = %outcome.path.display(), "report written and emailed")
        }
        Delivery::Skipped => {
            info!(target: "weekly_report", path = %outcome.path.display(), "report written; email skipped")
        }
        Delivery::Failed(reason) => {
            warn!(target: "weekly_report", path = %outcome.path.display(), %reason, "report written; email failed")
        }
    }
    Ok(())
}
