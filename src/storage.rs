use crate::config::SheetsConfig;
use crate::errors::AppError;
use crate::tracker::Tracker;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

/// Load the table, seeding a fresh one when the file is absent or unreadable.
pub async fn load_tracker(path: &Path, seed_dates: Vec<String>) -> Tracker {
    match load_json::<Tracker>(path).await {
        Some(mut tracker) if !tracker.dates.is_empty() => {
            tracker.normalize();
            info!(
                habits = tracker.habits.len(),
                days = tracker.dates.len(),
                "loaded tracker data"
            );
            tracker
        }
        _ => {
            info!("seeding default tracker data");
            Tracker::seeded(seed_dates)
        }
    }
}

pub async fn persist_tracker(path: &Path, tracker: &Tracker) -> Result<(), AppError> {
    persist_json(path, tracker).await
}

pub async fn load_sheets_config(path: &Path) -> SheetsConfig {
    load_json(path).await.unwrap_or_default()
}

pub async fn persist_sheets_config(path: &Path, config: &SheetsConfig) -> Result<(), AppError> {
    persist_json(path, config).await
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                error!("failed to parse {}: {err}", path.display());
                None
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            None
        }
    }
}

async fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(value).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusSymbol;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("habit_tracker_storage_{}_{nanos}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn missing_file_seeds_defaults() {
        let path = temp_path("tracker.json");
        let tracker = load_tracker(&path, vec!["05 Jan".into()]).await;
        assert_eq!(tracker.dates, vec!["05 Jan".to_string()]);
        assert_eq!(tracker.habits.len(), 10);
    }

    #[tokio::test]
    async fn persisted_tracker_round_trips() {
        let path = temp_path("tracker.json");
        let mut tracker = Tracker::seeded(vec!["05 Jan".into()]);
        tracker
            .set_status("🏃 Running", "05 Jan", StatusSymbol::Completed)
            .unwrap();
        persist_tracker(&path, &tracker).await.unwrap();

        let loaded = load_tracker(&path, Vec::new()).await;
        assert_eq!(loaded, tracker);
    }

    #[tokio::test]
    async fn sheets_config_defaults_to_unset() {
        let path = temp_path("config.json");
        assert_eq!(load_sheets_config(&path).await, SheetsConfig::default());

        let config = SheetsConfig {
            spreadsheet_id: Some("abc".into()),
        };
        persist_sheets_config(&path, &config).await.unwrap();
        assert_eq!(load_sheets_config(&path).await, config);
    }
}
