use super::dashboard::SyncStatus;
use crate::models::{Statistics, StatusSymbol, TableSnapshot};
use std::fmt::Write;

pub fn status_line(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Unknown => "… connecting".to_string(),
        SyncStatus::Connected => "● synced".to_string(),
        SyncStatus::Failed { reason } => format!("○ not synced: {reason}"),
    }
}

fn glyph(status: StatusSymbol) -> &'static str {
    match status {
        StatusSymbol::Completed => "✓",
        StatusSymbol::Missed => "✗",
        StatusSymbol::Pending => "·",
    }
}

pub fn render_stats(stats: &Statistics) -> String {
    format!(
        "progress {}% · best streak {} · ✓ {} · ✗ {}",
        stats.overall_progress, stats.best_streak, stats.total_completed, stats.total_missed
    )
}

/// Plain-text table of the snapshot with a status header and stats footer.
pub fn render_table(snapshot: &TableSnapshot, stats: &Statistics, status: &SyncStatus) -> String {
    let name_width = snapshot
        .habits
        .iter()
        .map(|habit| habit.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Habit".len());
    let cell_width = snapshot
        .dates
        .iter()
        .map(|date| date.chars().count())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    let _ = writeln!(out, "{}", status_line(status));

    let _ = write!(out, "{:<name_width$}", "Habit");
    for date in &snapshot.dates {
        let _ = write!(out, " | {date:^cell_width$}");
    }
    let _ = writeln!(out, " |    %");

    for habit in &snapshot.habits {
        let _ = write!(out, "{:<name_width$}", habit.name);
        for date in &snapshot.dates {
            let _ = write!(out, " | {:^cell_width$}", glyph(habit.status(date)));
        }
        let _ = writeln!(out, " | {:>3}%", habit.progress);
    }

    out.push_str(&render_stats(stats));
    out.push('\n');
    out
}
