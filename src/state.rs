use crate::config::Settings;
use crate::sheets::SheetsClient;
use crate::tracker::Tracker;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Connection to the spreadsheet backing store, if one is configured.
#[derive(Debug, Clone, Default)]
pub struct SheetsLink {
    pub spreadsheet_id: Option<String>,
    pub client: Option<SheetsClient>,
}

/// How far the spreadsheet lags the local table.
///
/// Both counters only move while the table lock is held.
#[derive(Debug, Default)]
pub struct Revisions {
    committed: AtomicU64,
    pushed: AtomicU64,
}

impl Revisions {
    /// Record a local commit and return its revision.
    pub fn commit(&self) -> u64 {
        self.committed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn mark_pushed(&self, revision: u64) {
        self.pushed.fetch_max(revision, Ordering::SeqCst);
    }

    /// True while some local commit has not reached the spreadsheet.
    pub fn sheet_behind(&self) -> bool {
        self.pushed.load(Ordering::SeqCst) < self.current()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub tracker: Arc<Mutex<Tracker>>,
    pub sheets: Arc<RwLock<SheetsLink>>,
    pub revisions: Arc<Revisions>,
}

impl AppState {
    pub fn new(settings: Settings, tracker: Tracker) -> Self {
        Self {
            settings: Arc::new(settings),
            tracker: Arc::new(Mutex::new(tracker)),
            sheets: Arc::new(RwLock::new(SheetsLink::default())),
            revisions: Arc::new(Revisions::default()),
        }
    }

    pub async fn sheets_client(&self) -> Option<SheetsClient> {
        self.sheets.read().await.client.clone()
    }

    pub async fn sheets_connected(&self) -> bool {
        self.sheets.read().await.client.is_some()
    }

    pub async fn spreadsheet_url(&self) -> Option<String> {
        self.sheets
            .read()
            .await
            .spreadsheet_id
            .as_deref()
            .map(crate::sheets::spreadsheet_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_catches_up_only_to_pushed_revision() {
        let revisions = Revisions::default();
        assert!(!revisions.sheet_behind());

        let first = revisions.commit();
        let second = revisions.commit();
        assert!(revisions.sheet_behind());

        revisions.mark_pushed(first);
        assert!(revisions.sheet_behind());
        revisions.mark_pushed(second);
        assert!(!revisions.sheet_behind());

        revisions.mark_pushed(first);
        assert!(!revisions.sheet_behind());
    }
}
