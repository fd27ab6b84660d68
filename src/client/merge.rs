//! Reconciling a cached local snapshot over a fresh server snapshot.
//!
//! The server decides which habits and dates exist; the local copy decides
//! the value of every cell it has recorded. Local cells for habits the server
//! no longer has, or for dates outside the server's window, are dropped.

use crate::models::TableSnapshot;
use std::collections::HashSet;

pub fn merge(server: TableSnapshot, local: Option<&TableSnapshot>) -> TableSnapshot {
    let mut merged = server;
    if let Some(local) = local {
        let dates: HashSet<&str> = merged.dates.iter().map(String::as_str).collect();
        for row in &mut merged.habits {
            let Some(local_row) = local.habit(&row.name) else {
                continue;
            };
            for (date, status) in &local_row.daily_status {
                if dates.contains(date.as_str()) {
                    row.daily_status.insert(date.clone(), *status);
                }
            }
        }
    }
    merged.recompute();
    merged
}
