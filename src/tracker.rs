//! The canonical habit table and every operation that reads or mutates it.
//!
//! Mutations validate before they write, so a rejected call leaves the table
//! exactly as it was. Derived figures are computed on read and never stored.

use crate::errors::TrackerError;
use crate::models::{Habit, HabitRow, Statistics, StatusSymbol, TableSnapshot};
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

pub const WEEK_LEN: usize = 7;
pub const DEFAULT_EMOJI: &str = "📌";
pub const DATE_LABEL_FORMAT: &str = "%d %b";

const DEFAULT_HABITS: [(&str, &str); 10] = [
    ("🏋️", "Calisthenics"),
    ("💧", "Water (8 glasses)"),
    ("🏃", "Running"),
    ("😴", "Sleep (7+ hours)"),
    ("🐍", "Learning Python"),
    ("🥩", "Protein Intake"),
    ("💼", "Client Finding (1hr)"),
    ("📚", "Reading (30 min)"),
    ("🧘", "Meditation (10 min)"),
    ("📱", "No Social Media (1st hr)"),
];

/// Which slice of the date range a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    All,
    /// 1-based week index into the tracked range.
    Week(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub dates: Vec<String>,
    pub habits: Vec<Habit>,
}

impl Tracker {
    pub fn new(dates: Vec<String>) -> Self {
        Self {
            dates,
            habits: Vec::new(),
        }
    }

    /// Fresh table with the default habit list over `dates`.
    pub fn seeded(dates: Vec<String>) -> Self {
        let habits = DEFAULT_HABITS
            .iter()
            .map(|(emoji, name)| Habit::new(compose_name(emoji, name), (*emoji).to_string()))
            .collect();
        Self { dates, habits }
    }

    pub fn week_count(&self) -> usize {
        self.dates.len().div_ceil(WEEK_LEN)
    }

    pub fn window(&self, view: View) -> Result<&[String], TrackerError> {
        match view {
            View::All => Ok(&self.dates),
            View::Week(week) => {
                let weeks = self.week_count();
                if week == 0 || week > weeks {
                    return Err(TrackerError::InvalidView { week, weeks });
                }
                let start = (week - 1) * WEEK_LEN;
                let end = (start + WEEK_LEN).min(self.dates.len());
                Ok(&self.dates[start..end])
            }
        }
    }

    pub fn snapshot(&self, view: View) -> Result<TableSnapshot, TrackerError> {
        let dates = self.window(view)?.to_vec();
        let habits = self
            .habits
            .iter()
            .map(|habit| {
                let daily_status = dates
                    .iter()
                    .filter_map(|date| {
                        let status = habit.status(date);
                        (!status.is_pending()).then(|| (date.clone(), status))
                    })
                    .collect();
                let mut row = HabitRow {
                    name: habit.name.clone(),
                    daily_status,
                    completed: 0,
                    missed: 0,
                    progress: 0,
                    streak: 0,
                };
                row.recompute(&dates);
                row
            })
            .collect();
        Ok(TableSnapshot { habits, dates })
    }

    pub fn habit(&self, name: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.name == name)
    }

    pub fn set_status(
        &mut self,
        habit_name: &str,
        date: &str,
        status: StatusSymbol,
    ) -> Result<(), TrackerError> {
        if !self.dates.iter().any(|known| known == date) {
            return Err(TrackerError::DateNotFound(date.to_string()));
        }
        let habit = self
            .habits
            .iter_mut()
            .find(|habit| habit.name == habit_name)
            .ok_or_else(|| TrackerError::NotFound(habit_name.to_string()))?;

        if status.is_pending() {
            habit.daily_status.remove(date);
        } else {
            habit.daily_status.insert(date.to_string(), status);
        }
        Ok(())
    }

    pub fn add_habit(&mut self, name: &str, emoji: Option<&str>) -> Result<&Habit, TrackerError> {
        let name = required_name(name, "habit name is required")?;
        let emoji = emoji_or_default(emoji);
        let full_name = compose_name(emoji, name);
        if self.habit(&full_name).is_some() {
            return Err(TrackerError::Duplicate(full_name));
        }

        self.habits.push(Habit::new(full_name, emoji.to_string()));
        let index = self.habits.len() - 1;
        Ok(&self.habits[index])
    }

    pub fn edit_habit(
        &mut self,
        old_name: &str,
        new_name: &str,
        emoji: Option<&str>,
    ) -> Result<&Habit, TrackerError> {
        let new_name = required_name(new_name, "new habit name is required")?;
        let emoji = emoji_or_default(emoji);
        let full_name = compose_name(emoji, new_name);

        let index = self
            .habits
            .iter()
            .position(|habit| habit.name == old_name)
            .ok_or_else(|| TrackerError::NotFound(old_name.to_string()))?;
        let collides = self
            .habits
            .iter()
            .enumerate()
            .any(|(other, habit)| other != index && habit.name == full_name);
        if collides {
            return Err(TrackerError::Duplicate(full_name));
        }

        let habit = &mut self.habits[index];
        habit.name = full_name;
        habit.emoji = emoji.to_string();
        Ok(habit)
    }

    pub fn delete_habit(&mut self, name: &str) -> Result<Habit, TrackerError> {
        let index = self
            .habits
            .iter()
            .position(|habit| habit.name == name)
            .ok_or_else(|| TrackerError::NotFound(name.to_string()))?;
        Ok(self.habits.remove(index))
    }

    /// Aggregate over every habit and every tracked date.
    pub fn statistics(&self) -> Statistics {
        stats::aggregate(
            self.habits
                .iter()
                .map(|habit| self.dates.iter().map(move |date| habit.status(date))),
        )
    }

    /// Restore the table invariants after loading from an outside source:
    /// no stored pending marks and no repeated habit names.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.habits.retain(|habit| {
            let fresh = seen.insert(habit.name.clone());
            if !fresh {
                warn!(habit = %habit.name, "dropping duplicate habit");
            }
            fresh
        });
        for habit in &mut self.habits {
            habit.daily_status.retain(|_, status| !status.is_pending());
        }
    }
}

/// Display name for a habit: `"<emoji> <name>"`.
pub fn compose_name(emoji: &str, name: &str) -> String {
    format!("{emoji} {name}")
}

/// Labels for every day from `start` to `end` inclusive, e.g. `05 Jan`.
pub fn date_labels(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut labels = Vec::new();
    let mut current = Some(start);
    while let Some(date) = current.filter(|date| *date <= end) {
        labels.push(date.format(DATE_LABEL_FORMAT).to_string());
        current = date.succ_opt();
    }
    labels
}

fn required_name<'a>(name: &'a str, message: &str) -> Result<&'a str, TrackerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::InvalidName(message.to_string()));
    }
    Ok(name)
}

fn emoji_or_default(emoji: Option<&str>) -> &str {
    match emoji.map(str::trim) {
        Some(emoji) if !emoji.is_empty() => emoji,
        _ => DEFAULT_EMOJI,
    }
}
