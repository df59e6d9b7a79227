// src/lib.rs
// Library surface shared by the dashboard server, the weekly report job and the tests.

pub mod api;
pub mod cache;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod query;
pub mod report;
pub mod store;
pub mod telemetry;

// ---- Re-exports for a stable public API ----
pub use crate::api::{router, AppState};
pub use crate::filter::{Filter, WindowDays};
pub use crate::store::{ItemStore, MemoryStore, PgStore};
