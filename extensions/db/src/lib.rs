// # packtrack storage
//
// Record stores (memory, SQLite, Postgres, and a primary-with-cache fallback)
// plus the store-backed services built on the core transition pipeline.

pub mod connect;
pub mod error;
pub mod fallback;
pub mod memory;
pub mod node;
pub mod postgres;
pub mod service;
pub mod sqlite;
pub mod store;

// Re-exports for convenience
pub use connect::open_store;
pub use error::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use service::{PackageService, RecordBook};
pub use sqlite::SqliteStore;
pub use store::{RecordStore, SharedStore};

// Prelude module
pub mod prelude {
    pub use crate::error::{ServiceError, ServiceResult, StoreError, StoreResult};
    pub use crate::node::{
        CheckTransition, LookupPackage, MergeUpdate, PersistPackage, StatusRequest,
        StoreResources,
    };
    pub use crate::service::{PackageService, RecordBook};
    pub use crate::store::{RecordStore, SharedStore};
    pub use crate::{open_store, FallbackStore, MemoryStore, PgStore, SqliteStore};
}
