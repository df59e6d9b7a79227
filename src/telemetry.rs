use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log targets used across the crate, all at info by default; dependencies stay at warn.
pub const DEFAULT_FILTER: &str =
    "trend_dashboard=info,weekly_report=info,api=info,store=info,cache=info,query=info,report=info,email=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=json` switches from compact lines to JSON records.
/// Safe to call twice (the second call is a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
