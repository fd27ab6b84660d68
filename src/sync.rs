//! Moving the table between the local store and the spreadsheet.
//!
//! Every push and pull runs under the table lock, so the spreadsheet sees
//! commits in the order they were acknowledged and a pull never lands on top
//! of a commit it did not read.

use crate::errors::{AppError, TrackerError};
use crate::sheets::SheetsClient;
use crate::state::AppState;
use crate::storage::persist_tracker;
use crate::tracker::Tracker;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Open the spreadsheet and make it the active backing store.
pub async fn connect(state: &AppState, spreadsheet_id: &str) -> Result<SheetsClient, TrackerError> {
    let settings = &state.settings;
    let client = SheetsClient::new(
        &settings.sheets_api_base,
        spreadsheet_id,
        settings.sheets_token.as_deref(),
    )
    .map_err(|err| TrackerError::BackendUnavailable(err.to_string()))?;

    let title = client
        .fetch_title()
        .await
        .map_err(|err| TrackerError::BackendUnavailable(err.to_string()))?;
    info!(%title, url = %client.spreadsheet_url(), "connected to spreadsheet");

    let mut link = state.sheets.write().await;
    link.spreadsheet_id = Some(spreadsheet_id.to_string());
    link.client = Some(client.clone());
    Ok(client)
}

/// Replace the local table with the spreadsheet's contents.
///
/// Returns `Ok(false)` when no spreadsheet is connected, it holds no rows, or
/// it is missing local commits. In the last case the local table is pushed
/// instead.
pub async fn pull_from_sheets(state: &AppState) -> Result<bool, AppError> {
    let Some(client) = state.sheets_client().await else {
        return Ok(false);
    };

    let mut current = state.tracker.lock().await;
    if state.revisions.sheet_behind() {
        warn!("spreadsheet is missing local changes, pushing before any pull");
        push_locked(state, &current).await?;
        return Ok(false);
    }

    let pulled = client
        .pull()
        .await
        .map_err(|err| TrackerError::BackendUnavailable(err.to_string()))?;
    let Some(tracker) = pulled else {
        return Ok(false);
    };
    persist_tracker(&state.settings.data_path, &tracker).await?;
    *current = tracker;
    info!("synced from spreadsheet");
    Ok(true)
}

/// Write the live table to the spreadsheet. Returns `Ok(false)` when none is
/// connected.
pub async fn push_to_sheets(state: &AppState) -> Result<bool, TrackerError> {
    let current = state.tracker.lock().await;
    push_locked(state, &current).await
}

/// Best-effort push of a table just committed under the caller's lock;
/// failures are logged, not returned.
pub async fn push_after_commit(state: &AppState, tracker: &Tracker) -> bool {
    match push_locked(state, tracker).await {
        Ok(synced) => synced,
        Err(err) => {
            warn!("sync to spreadsheet failed: {err}");
            false
        }
    }
}

/// Callers must hold the table lock and pass the guarded table.
async fn push_locked(state: &AppState, tracker: &Tracker) -> Result<bool, TrackerError> {
    let Some(client) = state.sheets_client().await else {
        return Ok(false);
    };
    let revision = state.revisions.current();
    client
        .push(tracker)
        .await
        .map_err(|err| TrackerError::BackendUnavailable(err.to_string()))?;
    state.revisions.mark_pushed(revision);
    info!(revision, "synced to spreadsheet");
    Ok(true)
}

/// Periodically pull from the connected spreadsheet so edits made there show up.
pub fn spawn_background_sync(state: AppState) -> JoinHandle<()> {
    let period = state.settings.sync_interval;
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = pull_from_sheets(&state).await {
                warn!("background sync failed: {}", err.message);
            }
        }
    })
}
