// src/store/mod.rs
pub mod memory;
pub mod pg;

use anyhow::Result;

use crate::query::{BoundQuery, QueryOutput};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Read-only access to the `items` table.
///
/// Handlers and the report take `&dyn ItemStore`, so a Postgres pool, a
/// caching wrapper, or an in-memory fixture can stand behind it.
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    async fn run(&self, query: &BoundQuery) -> Result<QueryOutput>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<S: ItemStore + ?Sized> ItemStore for std::sync::Arc<S> {
    async fn run(&self, query: &BoundQuery) -> Result<QueryOutput> {
        (**self).run(query).await
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}
