use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::StreamStatus;
use crate::playlist::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub entry: Entry,
    pub status: StreamStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    /// Entries whose URL already appeared earlier in the playlist.
    pub duplicates: usize,
}

/// Outcome of a playlist check, one item per playlist entry in playlist order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub items: Vec<CheckResult>,
}

impl Report {
    pub fn summary(&self) -> Summary {
        let online = self.items.iter().filter(|i| i.status.ok()).count();
        Summary {
            total: self.items.len(),
            online,
            offline: self.items.len() - online,
            duplicates: self.duplicate_indices().len(),
        }
    }

    pub fn online(&self) -> impl Iterator<Item = &CheckResult> {
        self.items.iter().filter(|i| i.status.ok())
    }

    pub fn offline(&self) -> impl Iterator<Item = &CheckResult> {
        self.items.iter().filter(|i| !i.status.ok())
    }

    /// Indices of items whose URL was seen at a lower index.
    pub fn duplicate_indices(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !seen.insert(item.entry.url.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &CheckResult> {
        self.duplicate_indices().into_iter().map(move |i| &self.items[i])
    }
}

/// Pairs each entry with the status computed for it. Both sequences are in playlist order.
pub fn to_report(
    entries: Vec<Entry>,
    statuses: Vec<StreamStatus>,
    started_at: DateTime<Utc>,
    elapsed: Duration,
) -> Report {
    debug_assert_eq!(entries.len(), statuses.len());
    let items = entries
        .into_iter()
        .zip(statuses)
        .map(|(entry, status)| CheckResult { entry, status })
        .collect();
    Report {
        id: Uuid::new_v4(),
        started_at,
        duration_ms: elapsed.as_millis() as u64,
        items,
    }
}
