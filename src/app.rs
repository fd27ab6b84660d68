use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/config", get(handlers::get_config).post(handlers::set_config))
        .route("/api/init", post(handlers::init))
        .route("/api/habits", get(handlers::get_habits))
        .route("/api/week/:week", get(handlers::get_week))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/habits/status", post(handlers::set_status))
        .route("/api/habits/add", post(handlers::add_habit))
        .route("/api/habits/edit", post(handlers::edit_habit))
        .route("/api/habits/delete", post(handlers::delete_habit))
        .route("/api/sync", post(handlers::sync))
        .with_state(state)
}
