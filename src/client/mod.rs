//! Reconciling client: a locally responsive copy of the store's table.

pub mod api;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod merge;
pub mod render;

pub use api::StoreClient;
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use dashboard::{Dashboard, DashboardEvent, SyncStatus, Toggled};
pub use error::ClientError;
pub use merge::merge;
