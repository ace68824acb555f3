pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::Repository;
pub use store::{Collection, DocumentStore, StoreError};

use crate::config::{StoreBackend, StoreConfig};

/// Opens the configured document store
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => Arc::new(PgStore::connect(config).await?),
    };
    info!("Using {} document store", store.backend_name());
    Ok(store)
}
