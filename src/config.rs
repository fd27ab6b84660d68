use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub data_path: PathBuf,
    pub config_path: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sheets_token: Option<String>,
    pub sheets_api_base: String,
    pub sync_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: PathBuf::from("data/tracker.json"),
            config_path: PathBuf::from("data/config.json"),
            start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap_or_default(),
            sheets_token: None,
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            sync_interval: Duration::from_secs(60),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),
            data_path: env::var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            config_path: env::var("APP_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            start: parsed_var("TRACKER_START").unwrap_or(defaults.start),
            end: parsed_var("TRACKER_END").unwrap_or(defaults.end),
            sheets_token: env::var("SHEETS_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            sheets_api_base: env::var("SHEETS_API_BASE").unwrap_or(defaults.sheets_api_base),
            sync_interval: parsed_var("SYNC_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring invalid {name}={value:?}");
            None
        }
    }
}

/// Backing-store configuration persisted next to the data file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
}
