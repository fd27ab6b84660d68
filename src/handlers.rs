use crate::config::SheetsConfig;
use crate::errors::{AppError, TrackerError};
use crate::models::{
    AddHabitRequest, ConfigRequest, ConfigResponse, ConfigUpdateResponse, DeleteHabitRequest,
    EditHabitRequest, HealthResponse, InitResponse, MutationResponse, SetStatusRequest,
    SnapshotResponse, StatsResponse, SyncDirection, SyncRequest, WeekResponse,
};
use crate::state::AppState;
use crate::storage::{persist_sheets_config, persist_tracker};
use crate::sync::{connect, pull_from_sheets, push_after_commit, push_to_sheets};
use crate::tracker::{Tracker, View};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info, warn};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let link = state.sheets.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        sheets_connected: link.client.is_some(),
        sheet_id: link.spreadsheet_id.clone(),
    })
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let link = state.sheets.read().await;
    Json(ConfigResponse {
        sheets_connected: link.client.is_some(),
        spreadsheet_id: link.spreadsheet_id.clone(),
        spreadsheet_url: link
            .spreadsheet_id
            .as_deref()
            .map(crate::sheets::spreadsheet_url),
    })
}

pub async fn set_config(
    State(state): State<AppState>,
    Json(payload): Json<ConfigRequest>,
) -> Result<Json<ConfigUpdateResponse>, AppError> {
    let spreadsheet_id = payload.spreadsheet_id.trim();
    if spreadsheet_id.is_empty() {
        return Err(AppError::bad_request("spreadsheet_id is required"));
    }

    let config = SheetsConfig {
        spreadsheet_id: Some(spreadsheet_id.to_string()),
    };
    persist_sheets_config(&state.settings.config_path, &config).await?;

    let client = match connect(&state, spreadsheet_id).await {
        Ok(client) => client,
        Err(err) => {
            let mut link = state.sheets.write().await;
            link.spreadsheet_id = Some(spreadsheet_id.to_string());
            link.client = None;
            return Err(err.into());
        }
    };
    push_to_sheets(&state).await?;

    Ok(Json(ConfigUpdateResponse {
        success: true,
        message: "spreadsheet connected and synced".to_string(),
        spreadsheet_url: Some(client.spreadsheet_url()),
    }))
}

pub async fn init(State(state): State<AppState>) -> Json<InitResponse> {
    let message = match pull_from_sheets(&state).await {
        Ok(true) => "synced from spreadsheet",
        Ok(false) => "loaded from local storage",
        Err(err) => {
            warn!("initial pull from spreadsheet failed: {}", err.message);
            "loaded from local storage"
        }
    };

    Json(InitResponse {
        success: true,
        message: message.to_string(),
        sheets_connected: state.sheets_connected().await,
        spreadsheet_url: state.spreadsheet_url().await,
    })
}

pub async fn get_habits(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, AppError> {
    if let Err(err) = pull_from_sheets(&state).await {
        warn!("serving local data, spreadsheet pull failed: {}", err.message);
    }

    let snapshot = state.tracker.lock().await.snapshot(View::All)?;
    Ok(Json(SnapshotResponse {
        snapshot,
        sheets_connected: state.sheets_connected().await,
        spreadsheet_url: state.spreadsheet_url().await,
    }))
}

pub async fn get_week(
    State(state): State<AppState>,
    Path(week): Path<usize>,
) -> Result<Json<WeekResponse>, AppError> {
    let snapshot = state.tracker.lock().await.snapshot(View::Week(week))?;
    Ok(Json(WeekResponse { week, snapshot }))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let (statistics, total_habits, total_days) = {
        let tracker = state.tracker.lock().await;
        (
            tracker.statistics(),
            tracker.habits.len(),
            tracker.dates.len(),
        )
    };
    Ok(Json(StatsResponse {
        statistics,
        total_habits,
        total_days,
        sheets_connected: state.sheets_connected().await,
    }))
}

pub async fn set_status(
    State(state): State<AppState>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let synced = commit(&state, |tracker| {
        tracker.set_status(&payload.habit_name, &payload.date, payload.status)
    })
    .await?;

    Ok(Json(MutationResponse {
        success: true,
        message: format!("updated {} for {}", payload.habit_name, payload.date),
        synced_to_sheets: synced,
    }))
}

pub async fn add_habit(
    State(state): State<AppState>,
    Json(payload): Json<AddHabitRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let mut name = String::new();
    let synced = commit(&state, |tracker| {
        name = tracker
            .add_habit(&payload.name, payload.emoji.as_deref())?
            .name
            .clone();
        Ok(())
    })
    .await?;

    info!(habit = %name, "added habit");
    Ok(Json(MutationResponse {
        success: true,
        message: format!("added habit: {name}"),
        synced_to_sheets: synced,
    }))
}

pub async fn edit_habit(
    State(state): State<AppState>,
    Json(payload): Json<EditHabitRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let mut name = String::new();
    let synced = commit(&state, |tracker| {
        name = tracker
            .edit_habit(&payload.old_name, &payload.new_name, payload.emoji.as_deref())?
            .name
            .clone();
        Ok(())
    })
    .await?;

    info!(from = %payload.old_name, to = %name, "renamed habit");
    Ok(Json(MutationResponse {
        success: true,
        message: format!("updated habit to: {name}"),
        synced_to_sheets: synced,
    }))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Json(payload): Json<DeleteHabitRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let synced = commit(&state, |tracker| {
        tracker.delete_habit(&payload.habit_name).map(|_| ())
    })
    .await?;

    info!(habit = %payload.habit_name, "deleted habit");
    Ok(Json(MutationResponse {
        success: true,
        message: format!("deleted habit: {}", payload.habit_name),
        synced_to_sheets: synced,
    }))
}

pub async fn sync(
    State(state): State<AppState>,
    payload: Option<Json<SyncRequest>>,
) -> Result<Json<MutationResponse>, AppError> {
    if !state.sheets_connected().await {
        return Err(AppError::bad_request("spreadsheet not connected"));
    }
    let direction = payload.map(|Json(req)| req.direction).unwrap_or_default();

    if matches!(direction, SyncDirection::FromSheets | SyncDirection::Both) {
        pull_from_sheets(&state).await?;
    }
    if matches!(direction, SyncDirection::ToSheets | SyncDirection::Both) {
        push_to_sheets(&state).await?;
    }

    Ok(Json(MutationResponse {
        success: true,
        message: format!("sync completed ({direction:?})"),
        synced_to_sheets: true,
    }))
}

/// Apply `op` to a copy of the table, persist it, then swap it in.
///
/// The lock is held across the disk write and the spreadsheet push, so
/// mutations are serialised and reach the spreadsheet in commit order. A
/// failure before the swap leaves the live table untouched; the push is best
/// effort.
async fn commit<F>(state: &AppState, op: F) -> Result<bool, AppError>
where
    F: FnOnce(&mut Tracker) -> Result<(), TrackerError>,
{
    let mut current = state.tracker.lock().await;
    let mut next = current.clone();
    op(&mut next)?;
    persist_tracker(&state.settings.data_path, &next).await?;
    *current = next;
    let revision = state.revisions.commit();
    debug!(revision, "committed table");
    Ok(push_after_commit(state, &current).await)
}
