//! History window.
//!
//! Ordered log of timeline entries in arrival order. Live entries are
//! appended at the tail; back-filled pages are prepended at the head, so the
//! sequence is not necessarily sorted by timestamp.
//!
//! The window itself never decides when to evict. The owning channel calls
//! [`HistoryWindow::retain_latest`] after each mutation when it is not
//! activated.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{ids::Timestamp, timeline::TimelineEntry};

/// Cursor for fetching the page before the current earliest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeforeTime {
    /// Nothing loaded yet; fetch the most recent page.
    Latest,
    /// Fetch entries strictly older than this time.
    Before(Timestamp),
}

/// Ordered, deduplicated log of timeline entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    entries: VecDeque<TimelineEntry>,
    /// Server ids of retained text entries.
    server_ids: HashSet<u64>,
}

impl HistoryWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push entries to the tail. Returns how many were new.
    pub fn append(&mut self, entries: impl IntoIterator<Item = TimelineEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.admit(&entry) {
                self.entries.push_back(entry);
                added += 1;
            }
        }
        added
    }

    /// Insert an older page at the head, keeping the page's own order.
    ///
    /// Returns how many were new.
    pub fn prepend(&mut self, entries: impl IntoIterator<Item = TimelineEntry>) -> usize {
        let page: Vec<_> = entries.into_iter().filter(|entry| self.admit(entry)).collect();
        let added = page.len();
        for entry in page.into_iter().rev() {
            self.entries.push_front(entry);
        }
        added
    }

    /// Drop the oldest entries so at most `cap` remain. Returns `true` if any
    /// entry was dropped.
    pub fn retain_latest(&mut self, cap: usize) -> bool {
        if self.entries.len() <= cap {
            return false;
        }
        let excess = self.entries.len() - cap;
        for entry in self.entries.drain(..excess) {
            if let Some(id) = entry.server_id() {
                self.server_ids.remove(&id);
            }
        }
        true
    }

    /// Cursor for loading the page preceding the earliest entry.
    pub fn before_time(&self) -> BeforeTime {
        self.entries.front().map_or(BeforeTime::Latest, |entry| BeforeTime::Before(entry.timestamp))
    }

    /// Whether an entry with this server id is retained.
    pub fn contains_server_id(&self, id: u64) -> bool {
        self.server_ids.contains(&id)
    }

    /// Entries from oldest to newest in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TimelineEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Entry at a position.
    pub fn get(&self, index: usize) -> Option<&TimelineEntry> {
        self.entries.get(index)
    }

    /// Earliest retained entry.
    pub fn first(&self) -> Option<&TimelineEntry> {
        self.entries.front()
    }

    /// Latest retained entry.
    pub fn last(&self) -> Option<&TimelineEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn admit(&mut self, entry: &TimelineEntry) -> bool {
        match entry.server_id() {
            Some(id) => self.server_ids.insert(id),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ids::{EntryId, User},
        timeline::EntryKind,
    };

    fn text(id: u64, at: u64) -> TimelineEntry {
        TimelineEntry::new(
            EntryId::Server(id),
            Timestamp(at),
            EntryKind::Text { user: User::new(1, "a"), body: format!("m{id}") },
        )
    }

    fn ids(window: &HistoryWindow) -> Vec<EntryId> {
        window.iter().map(|e| e.id).collect()
    }

    #[test]
    fn prepend_keeps_page_order_at_head() {
        let mut window = HistoryWindow::new();
        window.append([text(10, 100)]);
        window.prepend([text(1, 10), text(2, 20)]);

        assert_eq!(ids(&window), [EntryId::Server(1), EntryId::Server(2), EntryId::Server(10)]);
        assert_eq!(window.before_time(), BeforeTime::Before(Timestamp(10)));
    }

    #[test]
    fn empty_window_fetches_latest() {
        assert_eq!(HistoryWindow::new().before_time(), BeforeTime::Latest);
    }

    #[test]
    fn duplicate_server_ids_are_ignored() {
        let mut window = HistoryWindow::new();
        assert_eq!(window.append([text(1, 10), text(1, 10)]), 1);
        assert_eq!(window.prepend([text(1, 10), text(0, 5)]), 1);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn retain_latest_drops_oldest_and_forgets_ids() {
        let mut window = HistoryWindow::new();
        window.append((0..5).map(|i| text(i, i)));

        assert!(window.retain_latest(3));
        assert_eq!(ids(&window), [EntryId::Server(2), EntryId::Server(3), EntryId::Server(4)]);
        assert!(!window.contains_server_id(0));
        assert!(!window.retain_latest(3));

        // Evicted ids can be loaded again.
        assert_eq!(window.prepend([text(1, 1)]), 1);
    }
}
