use crate::stats::{self, HabitSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Mark recorded for one (habit, date) cell.
///
/// `Pending` is the absence of a mark. The store never persists it; the
/// client cache may hold it explicitly so a toggle back to pending survives
/// the next merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatusSymbol {
    #[serde(rename = "✓")]
    Completed,
    #[serde(rename = "✗")]
    Missed,
    #[default]
    #[serde(rename = "")]
    Pending,
}

impl StatusSymbol {
    /// Click transition: pending -> completed -> missed -> pending.
    pub fn next(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Missed,
            Self::Missed => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "✓",
            Self::Missed => "✗",
            Self::Pending => "",
        }
    }

    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

impl fmt::Display for StatusSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSymbol(pub String);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status symbol {:?}", self.0)
    }
}

impl std::error::Error for UnknownSymbol {}

impl FromStr for StatusSymbol {
    type Err = UnknownSymbol;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "✓" => Ok(Self::Completed),
            "✗" => Ok(Self::Missed),
            "" => Ok(Self::Pending),
            other => Err(UnknownSymbol(other.to_string())),
        }
    }
}

/// Stored habit: composed display name plus its recorded marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub name: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub daily_status: BTreeMap<String, StatusSymbol>,
}

impl Habit {
    pub fn new(name: String, emoji: String) -> Self {
        Self {
            name,
            emoji,
            daily_status: BTreeMap::new(),
        }
    }

    pub fn status(&self, date: &str) -> StatusSymbol {
        self.daily_status.get(date).copied().unwrap_or_default()
    }
}

/// One habit as seen through a date window, with its derived figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRow {
    pub name: String,
    pub daily_status: BTreeMap<String, StatusSymbol>,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub missed: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub streak: u32,
}

impl HabitRow {
    pub fn status(&self, date: &str) -> StatusSymbol {
        self.daily_status.get(date).copied().unwrap_or_default()
    }

    /// Marks in the order of `dates`, pending where nothing is recorded.
    pub fn marks<'a>(
        &'a self,
        dates: &'a [String],
    ) -> impl DoubleEndedIterator<Item = StatusSymbol> + Clone + 'a {
        dates.iter().map(move |date| self.status(date))
    }

    pub fn recompute(&mut self, dates: &[String]) {
        let summary = HabitSummary::of(self.marks(dates));
        self.completed = summary.completed;
        self.missed = summary.missed;
        self.progress = summary.progress;
        self.streak = summary.current_streak;
    }
}

/// Ordered habits restricted to an ordered date window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub habits: Vec<HabitRow>,
    pub dates: Vec<String>,
}

impl TableSnapshot {
    pub fn habit(&self, name: &str) -> Option<&HabitRow> {
        self.habits.iter().find(|habit| habit.name == name)
    }

    pub fn habit_mut(&mut self, name: &str) -> Option<&mut HabitRow> {
        self.habits.iter_mut().find(|habit| habit.name == name)
    }

    pub fn recompute(&mut self) {
        for habit in &mut self.habits {
            habit.recompute(&self.dates);
        }
    }

    pub fn statistics(&self) -> Statistics {
        stats::aggregate(self.habits.iter().map(|habit| habit.marks(&self.dates)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub overall_progress: u32,
    pub best_streak: u32,
    pub total_completed: u32,
    pub total_missed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub habit_name: String,
    pub date: String,
    pub status: StatusSymbol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddHabitRequest {
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditHabitRequest {
    pub old_name: String,
    pub new_name: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteHabitRequest {
    pub habit_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub spreadsheet_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    FromSheets,
    ToSheets,
    #[default]
    Both,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub direction: SyncDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: TableSnapshot,
    pub sheets_connected: bool,
    pub spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekResponse {
    pub week: usize,
    #[serde(flatten)]
    pub snapshot: TableSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub statistics: Statistics,
    pub total_habits: usize,
    pub total_days: usize,
    pub sheets_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub synced_to_sheets: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    pub success: bool,
    pub message: String,
    pub sheets_connected: bool,
    pub spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub sheets_connected: bool,
    pub spreadsheet_id: Option<String>,
    pub spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: String,
    pub spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sheets_connected: bool,
    pub sheet_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_clicks_return_to_start() {
        for start in [
            StatusSymbol::Pending,
            StatusSymbol::Completed,
            StatusSymbol::Missed,
        ] {
            assert_ne!(start.next(), start);
            assert_eq!(start.next().next().next(), start);
        }
        assert_eq!(StatusSymbol::Pending.next(), StatusSymbol::Completed);
        assert_eq!(StatusSymbol::Completed.next(), StatusSymbol::Missed);
        assert_eq!(StatusSymbol::Missed.next(), StatusSymbol::Pending);
    }

    #[test]
    fn symbols_use_wire_glyphs() {
        let json = serde_json::to_string(&StatusSymbol::Completed).unwrap();
        assert_eq!(json, "\"✓\"");
        let pending: StatusSymbol = serde_json::from_str("\"\"").unwrap();
        assert_eq!(pending, StatusSymbol::Pending);
        assert!(serde_json::from_str::<StatusSymbol>("\"done\"").is_err());
        assert!("x".parse::<StatusSymbol>().is_err());
    }

    #[test]
    fn set_status_request_rejects_unknown_status() {
        let body = r#"{"habit_name":"h","date":"05 Jan","status":"yes"}"#;
        assert!(serde_json::from_str::<SetStatusRequest>(body).is_err());
        let body = r#"{"habit_name":"h","date":"05 Jan"}"#;
        assert!(serde_json::from_str::<SetStatusRequest>(body).is_err());
    }

    #[test]
    fn row_recompute_uses_window_only() {
        let dates = vec!["01".to_string(), "02".to_string()];
        let mut row = HabitRow {
            name: "h".into(),
            daily_status: BTreeMap::from([
                ("01".to_string(), StatusSymbol::Completed),
                ("02".to_string(), StatusSymbol::Missed),
                ("03".to_string(), StatusSymbol::Completed),
            ]),
            completed: 0,
            missed: 0,
            progress: 0,
            streak: 0,
        };
        row.recompute(&dates);
        assert_eq!(row.completed, 1);
        assert_eq!(row.missed, 1);
        assert_eq!(row.progress, 50);
        assert_eq!(row.streak, 0);
    }
}
