//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of a registry at a point in time.
//! Invariants operate on snapshots rather than live state so a check never
//! observes a transition half-applied.

use chansync_core::{ChannelId, ChannelState, ChatRegistry, Presence, User};

/// Snapshot of a whole registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Join order as reported by the registry.
    pub order: Vec<ChannelId>,
    /// Every channel held, in join order.
    pub channels: Vec<ChannelView>,
    /// Number of channels held, counted independently of `order`.
    pub held: usize,
}

impl RegistrySnapshot {
    /// Capture a registry.
    pub fn from_registry(registry: &ChatRegistry) -> Self {
        let channels: Vec<_> = registry.channels().map(ChannelView::from_state).collect();
        let held = registry.order().iter().filter(|id| registry.contains(id)).count();
        Self { order: registry.order().to_vec(), channels, held }
    }
}

/// Snapshot of one channel.
#[derive(Debug, Clone)]
pub struct ChannelView {
    /// Channel identity.
    pub id: ChannelId,
    /// Active members in stored order.
    pub active: Vec<User>,
    /// Idle members in stored order.
    pub idle: Vec<User>,
    /// Offline members in stored order.
    pub offline: Vec<User>,
    /// Timeline length.
    pub timeline_len: usize,
    /// Retention cap.
    pub retention: usize,
    /// In focus.
    pub activated: bool,
    /// Unread flag.
    pub has_unread: bool,
    /// More history may exist.
    pub has_history: bool,
}

impl ChannelView {
    /// Capture a channel.
    pub fn from_state(state: &ChannelState) -> Self {
        let partition = state.partition();
        Self {
            id: state.id().clone(),
            active: partition.members(Presence::Active).to_vec(),
            idle: partition.members(Presence::Idle).to_vec(),
            offline: partition.members(Presence::Offline).to_vec(),
            timeline_len: state.timeline().len(),
            retention: state.retention(),
            activated: state.activated(),
            has_unread: state.has_unread(),
            has_history: state.has_history(),
        }
    }

    /// Members of one presence set.
    pub fn members(&self, presence: Presence) -> &[User] {
        match presence {
            Presence::Active => &self.active,
            Presence::Idle => &self.idle,
            Presence::Offline => &self.offline,
        }
    }
}
