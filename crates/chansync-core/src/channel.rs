//! Per-channel state machine.
//!
//! [`ChannelState`] combines the presence partition, the history window and
//! the channel-level flags. It only exists while the local user is a member:
//! Joining is tracked by the registry, and Left/Kicked/Banned are represented
//! by removing the state from the registry.
//!
//! Activation is an orthogonal sub-state. It does not affect membership, only
//! retention and unread accounting: an activated channel is never trimmed and
//! never accumulates unread.
//!
//! # Invariants
//!
//! - `has_unread` implies `!activated`.
//! - When not activated, `timeline.len() <= retention` after every mutation.
//! - `has_history == false` only after a page shorter than requested.

use crate::{
    history::{BeforeTime, HistoryWindow},
    ids::{ChannelId, UserId},
    partition::PresencePartition,
    timeline::TimelineEntry,
};

/// State of one joined channel.
#[derive(Debug, Clone)]
pub struct ChannelState {
    id: ChannelId,
    partition: PresencePartition,
    timeline: HistoryWindow,
    owner: Option<UserId>,
    retention: usize,
    loading_history: bool,
    has_history: bool,
    has_loaded_user_list: bool,
    loading_user_list: bool,
    leaving: bool,
    pending_sends: usize,
    activated: bool,
    has_unread: bool,
}

impl ChannelState {
    /// Create a freshly joined channel.
    pub fn new(id: ChannelId, retention: usize) -> Self {
        Self {
            id,
            partition: PresencePartition::new(),
            timeline: HistoryWindow::new(),
            owner: None,
            retention,
            loading_history: false,
            has_history: true,
            has_loaded_user_list: false,
            loading_user_list: false,
            leaving: false,
            pending_sends: 0,
            activated: false,
            has_unread: false,
        }
    }

    /// Channel identity.
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Presence partition.
    pub fn partition(&self) -> &PresencePartition {
        &self.partition
    }

    /// Timeline entries in arrival order.
    pub fn timeline(&self) -> &HistoryWindow {
        &self.timeline
    }

    /// Current owner, if known.
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Retention cap applied while not activated.
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// An older-history page is being fetched.
    pub fn loading_history(&self) -> bool {
        self.loading_history
    }

    /// More history may exist before the earliest entry.
    pub fn has_history(&self) -> bool {
        self.has_history
    }

    /// A member list fetch was issued (or finished).
    pub fn has_loaded_user_list(&self) -> bool {
        self.has_loaded_user_list
    }

    /// A member list fetch is in flight.
    pub fn loading_user_list(&self) -> bool {
        self.loading_user_list
    }

    /// A leave request is in flight.
    pub fn leaving(&self) -> bool {
        self.leaving
    }

    /// Number of messages sent but not yet acknowledged.
    pub fn pending_sends(&self) -> usize {
        self.pending_sends
    }

    /// Channel is in focus.
    pub fn activated(&self) -> bool {
        self.activated
    }

    /// New content arrived while out of focus.
    pub fn has_unread(&self) -> bool {
        self.has_unread
    }

    /// Whether a member list fetch should be skipped.
    ///
    /// Callers check this before issuing `load-user-list`.
    pub fn user_list_requested(&self) -> bool {
        self.has_loaded_user_list || self.loading_user_list
    }

    /// Cursor for the next older-history page.
    pub fn before_time(&self) -> BeforeTime {
        self.timeline.before_time()
    }

    pub(crate) fn partition_mut(&mut self) -> &mut PresencePartition {
        &mut self.partition
    }

    pub(crate) fn set_owner(&mut self, owner: Option<UserId>) {
        if owner.is_some() {
            self.owner = owner;
        }
    }

    /// Append live entries. `counts_as_unread` is false for our own content.
    pub(crate) fn append_live(
        &mut self,
        entries: impl IntoIterator<Item = TimelineEntry>,
        counts_as_unread: bool,
    ) -> usize {
        let added = self.timeline.append(entries);
        if added > 0 && counts_as_unread && !self.activated {
            self.has_unread = true;
        }
        self.enforce_retention();
        added
    }

    /// Append entries that are not new content (e.g. our own join).
    pub(crate) fn append_quiet(&mut self, entries: impl IntoIterator<Item = TimelineEntry>) {
        self.timeline.append(entries);
        self.enforce_retention();
    }

    /// Prepend a page of older history.
    ///
    /// A page shorter than `limit` means the beginning has been reached.
    pub(crate) fn prepend_history(&mut self, entries: Vec<TimelineEntry>, limit: usize) {
        let exhausted = entries.len() < limit;
        self.timeline.prepend(entries);
        if exhausted {
            self.has_history = false;
        }
        self.enforce_retention();
    }

    pub(crate) fn set_loading_history(&mut self, loading: bool) {
        self.loading_history = loading;
    }

    pub(crate) fn begin_user_list(&mut self) {
        self.loading_user_list = true;
        self.has_loaded_user_list = true;
    }

    pub(crate) fn finish_user_list(&mut self) {
        self.loading_user_list = false;
    }

    pub(crate) fn rollback_user_list(&mut self) {
        self.loading_user_list = false;
        self.has_loaded_user_list = false;
    }

    pub(crate) fn set_leaving(&mut self, leaving: bool) {
        self.leaving = leaving;
    }

    pub(crate) fn begin_send(&mut self) {
        self.pending_sends += 1;
    }

    pub(crate) fn finish_send(&mut self) {
        self.pending_sends = self.pending_sends.saturating_sub(1);
    }

    pub(crate) fn activate(&mut self) {
        self.activated = true;
        self.has_unread = false;
    }

    pub(crate) fn deactivate(&mut self) {
        self.activated = false;
        self.enforce_retention();
    }

    /// Trim to the retention cap when out of focus.
    ///
    /// Discarding entries means older history must be assumed available
    /// again.
    fn enforce_retention(&mut self) {
        if !self.activated && self.timeline.retain_latest(self.retention) {
            self.has_history = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ids::{EntryId, Timestamp, User},
        timeline::EntryKind,
    };

    fn text(id: u64) -> TimelineEntry {
        TimelineEntry::new(
            EntryId::Server(id),
            Timestamp(id),
            EntryKind::Text { user: User::new(2, "b"), body: String::new() },
        )
    }

    #[test]
    fn deactivated_channel_is_capped() {
        let mut channel = ChannelState::new("abc".into(), 150);
        for id in 0..200 {
            channel.append_live([text(id)], true);
            assert!(channel.timeline().len() <= 150);
        }

        assert_eq!(channel.timeline().len(), 150);
        assert!(channel.has_history());
        assert!(channel.has_unread());
        assert_eq!(channel.timeline().first().map(|e| e.id), Some(EntryId::Server(50)));
    }

    #[test]
    fn activated_channel_is_never_trimmed() {
        let mut channel = ChannelState::new("abc".into(), 150);
        channel.activate();
        channel.append_live((0..200).map(text), true);

        assert_eq!(channel.timeline().len(), 200);
        assert!(!channel.has_unread());

        // Trimmed on the way out of focus.
        channel.deactivate();
        assert_eq!(channel.timeline().len(), 150);
    }

    #[test]
    fn short_page_exhausts_history() {
        let mut channel = ChannelState::new("abc".into(), 150);
        channel.append_live((100..110).map(text), true);

        channel.prepend_history((0..50).map(text).collect(), 50);
        assert_eq!(channel.timeline().len(), 60);
        assert!(channel.has_history());

        channel.prepend_history(vec![text(60), text(61), text(62)], 50);
        assert!(!channel.has_history());
    }

    #[test]
    fn backfill_does_not_mark_unread() {
        let mut channel = ChannelState::new("abc".into(), 150);
        channel.prepend_history(vec![text(1)], 50);
        assert!(!channel.has_unread());
    }

    #[test]
    fn user_list_rollback_allows_retry() {
        let mut channel = ChannelState::new("abc".into(), 150);
        channel.begin_user_list();
        assert!(channel.user_list_requested());

        channel.rollback_user_list();
        assert!(!channel.user_list_requested());
    }
}
