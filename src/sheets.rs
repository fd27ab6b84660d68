//! Spreadsheet backing store.
//!
//! The table is mirrored as one grid: a header row of
//! `Habit, <dates...>, Total ✓, Total ✗, Progress %, Streak 🔥` followed by one
//! row per habit. Pushing rewrites the whole grid; pulling parses it back and
//! ignores the summary columns.

use crate::models::{Habit, StatusSymbol};
use crate::stats::HabitSummary;
use crate::tracker::{DEFAULT_EMOJI, Tracker};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const HABIT_HEADER: &str = "Habit";
pub const SUMMARY_HEADERS: [&str; 4] = ["Total ✓", "Total ✗", "Progress %", "Streak 🔥"];
const SHEET_RANGE: &str = "Sheet1";

pub type Grid = Vec<Vec<String>>;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("no spreadsheet access token configured")]
    MissingToken,

    #[error("spreadsheet request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("spreadsheet service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub fn spreadsheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}")
}

pub fn to_grid(tracker: &Tracker) -> Grid {
    let mut header = Vec::with_capacity(tracker.dates.len() + 5);
    header.push(HABIT_HEADER.to_string());
    header.extend(tracker.dates.iter().cloned());
    header.extend(SUMMARY_HEADERS.iter().map(|title| (*title).to_string()));

    let mut grid = Vec::with_capacity(tracker.habits.len() + 1);
    grid.push(header);
    for habit in &tracker.habits {
        let marks = tracker.dates.iter().map(|date| habit.status(date));
        let summary = HabitSummary::of(marks.clone());

        let mut row = Vec::with_capacity(tracker.dates.len() + 5);
        row.push(habit.name.clone());
        row.extend(marks.map(|mark| mark.as_str().to_string()));
        row.push(summary.completed.to_string());
        row.push(summary.missed.to_string());
        row.push(format!("{}%", summary.progress));
        row.push(summary.current_streak.to_string());
        grid.push(row);
    }
    grid
}

/// Parse a grid back into a table. Returns `None` when the sheet holds no
/// habit rows.
pub fn from_grid(grid: &[Vec<String>]) -> Option<Tracker> {
    let (header, rows) = grid.split_first()?;
    if rows.is_empty() {
        return None;
    }

    let mut date_end = header.len();
    if header.len() > SUMMARY_HEADERS.len()
        && header[header.len() - SUMMARY_HEADERS.len()..]
            .iter()
            .zip(SUMMARY_HEADERS)
            .all(|(cell, title)| cell.trim() == title)
    {
        date_end -= SUMMARY_HEADERS.len();
    }
    let dates: Vec<String> = header
        .get(1..date_end)
        .unwrap_or_default()
        .iter()
        .map(|date| date.trim().to_string())
        .collect();

    let mut tracker = Tracker::new(dates);
    for row in rows {
        let Some(name) = row.first().map(|cell| cell.trim()).filter(|name| !name.is_empty())
        else {
            continue;
        };
        let emoji = name
            .split_once(' ')
            .map(|(emoji, _)| emoji)
            .unwrap_or(DEFAULT_EMOJI);
        let mut habit = Habit::new(name.to_string(), emoji.to_string());

        for (index, date) in tracker.dates.iter().enumerate() {
            let cell = row.get(index + 1).map(String::as_str).unwrap_or_default();
            match cell.parse::<StatusSymbol>() {
                Ok(StatusSymbol::Pending) => {}
                Ok(status) => {
                    habit.daily_status.insert(date.clone(), status);
                }
                Err(err) => warn!(habit = %habit.name, date = %date, "{err}; treating as pending"),
            }
        }
        tracker.habits.push(habit);
    }
    tracker.normalize();
    Some(tracker)
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Debug, Serialize)]
struct ValueUpdate<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'a str,
    values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    properties: SpreadsheetProperties,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

/// HTTP client for the spreadsheet values API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is reference counted.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

impl SheetsClient {
    pub fn new(
        base_url: &str,
        spreadsheet_id: &str,
        token: Option<&str>,
    ) -> Result<Self, SheetsError> {
        let token = token.ok_or(SheetsError::MissingToken)?;
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.to_string(),
        })
    }

    pub fn spreadsheet_url(&self) -> String {
        spreadsheet_url(&self.spreadsheet_id)
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}{}",
            self.base_url, self.spreadsheet_id, suffix
        )
    }

    /// Check the spreadsheet is reachable with our credentials; returns its title.
    pub async fn fetch_title(&self) -> Result<String, SheetsError> {
        let resp = self
            .http
            .get(self.url(""))
            .query(&[("fields", "properties.title")])
            .bearer_auth(&self.token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = checked(resp).await?.json().await?;
        Ok(meta.properties.title)
    }

    pub async fn read_grid(&self) -> Result<Grid, SheetsError> {
        let resp = self
            .http
            .get(self.url(&format!("/values/{SHEET_RANGE}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let range: ValueRange = checked(resp).await?.json().await?;
        Ok(range.values)
    }

    pub async fn write_grid(&self, grid: &[Vec<String>]) -> Result<(), SheetsError> {
        let resp = self
            .http
            .post(self.url(&format!("/values/{SHEET_RANGE}:clear")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        checked(resp).await?;

        let body = ValueUpdate {
            range: SHEET_RANGE,
            major_dimension: "ROWS",
            values: grid,
        };
        let resp = self
            .http
            .put(self.url(&format!("/values/{SHEET_RANGE}")))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        checked(resp).await?;
        Ok(())
    }

    pub async fn pull(&self) -> Result<Option<Tracker>, SheetsError> {
        let grid = self.read_grid().await?;
        debug!(rows = grid.len(), "read spreadsheet grid");
        Ok(from_grid(&grid))
    }

    pub async fn push(&self, tracker: &Tracker) -> Result<(), SheetsError> {
        self.write_grid(&to_grid(tracker)).await
    }
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SheetsError::Status { status, body })
}
