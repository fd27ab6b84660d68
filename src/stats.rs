use crate::models::{Statistics, StatusSymbol};

/// Figures for one habit over one date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HabitSummary {
    pub completed: u32,
    pub missed: u32,
    pub progress: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl HabitSummary {
    /// Summarise marks given in chronological order.
    pub fn of<I>(marks: I) -> Self
    where
        I: DoubleEndedIterator<Item = StatusSymbol> + Clone,
    {
        let mut summary = Self::default();
        for mark in marks.clone() {
            match mark {
                StatusSymbol::Completed => summary.completed += 1,
                StatusSymbol::Missed => summary.missed += 1,
                StatusSymbol::Pending => {}
            }
        }
        summary.longest_streak = longest_streak(marks.clone());
        summary.progress = progress_percent(summary.completed, summary.missed);
        summary.current_streak = current_streak(marks);
        summary
    }
}

/// `round(100 * completed / (completed + missed))`, 0 with no marks.
pub fn progress_percent(completed: u32, missed: u32) -> u32 {
    let total = u64::from(completed) + u64::from(missed);
    if total == 0 {
        return 0;
    }
    let scaled = (200 * u64::from(completed) + total) / (2 * total);
    scaled as u32
}

/// Longest run of completions; a miss resets it and pending days are skipped.
pub fn longest_streak(marks: impl IntoIterator<Item = StatusSymbol>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    for mark in marks {
        match mark {
            StatusSymbol::Completed => {
                run += 1;
                best = best.max(run);
            }
            StatusSymbol::Missed => run = 0,
            StatusSymbol::Pending => {}
        }
    }
    best
}

/// Completions counted back from the newest date until the first miss.
pub fn current_streak<I>(marks: I) -> u32
where
    I: DoubleEndedIterator<Item = StatusSymbol>,
{
    let mut streak = 0;
    for mark in marks.rev() {
        match mark {
            StatusSymbol::Completed => streak += 1,
            StatusSymbol::Missed => break,
            StatusSymbol::Pending => {}
        }
    }
    streak
}

/// Table-wide statistics from each habit's chronological marks.
pub fn aggregate<H, I>(habits: H) -> Statistics
where
    H: IntoIterator<Item = I>,
    I: DoubleEndedIterator<Item = StatusSymbol> + Clone,
{
    let mut stats = Statistics::default();
    for marks in habits {
        let summary = HabitSummary::of(marks);
        stats.total_completed = stats.total_completed.saturating_add(summary.completed);
        stats.total_missed = stats.total_missed.saturating_add(summary.missed);
        stats.best_streak = stats.best_streak.max(summary.longest_streak);
    }
    stats.overall_progress = progress_percent(stats.total_completed, stats.total_missed);
    stats
}
