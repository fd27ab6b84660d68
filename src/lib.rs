pub mod app;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod sheets;
pub mod state;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod tracker;

pub use app::router;
pub use state::AppState;
pub use tracker::{Tracker, View};
