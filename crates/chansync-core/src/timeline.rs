//! Timeline entries.

use serde::{Deserialize, Serialize};

use crate::ids::{EntryId, Timestamp, User};

/// Why a member is no longer in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveReason {
    /// Left voluntarily.
    Left,
    /// Removed by a moderator.
    Kicked,
    /// Removed and barred by a moderator.
    Banned,
}

/// Kind-specific content of a timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// The local user joined.
    SelfJoin,
    /// Another user joined.
    Join {
        /// User who joined.
        user: User,
    },
    /// Another user left, was kicked or was banned.
    Leave {
        /// User who is gone.
        user: User,
        /// How they left.
        reason: LeaveReason,
    },
    /// Channel ownership passed to a user.
    NewOwner {
        /// The new owner.
        user: User,
    },
    /// Text message.
    Text {
        /// Author.
        user: User,
        /// Message body.
        body: String,
    },
}

/// A single entry in a channel's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Unique entry id.
    pub id: EntryId,
    /// When the entry happened.
    pub timestamp: Timestamp,
    /// Kind-specific fields.
    pub kind: EntryKind,
}

impl TimelineEntry {
    /// Create an entry.
    pub fn new(id: EntryId, timestamp: Timestamp, kind: EntryKind) -> Self {
        Self { id, timestamp, kind }
    }

    /// Server-assigned message id, if any.
    pub fn server_id(&self) -> Option<u64> {
        match self.id {
            EntryId::Server(id) => Some(id),
            EntryId::Local(_) => None,
        }
    }

    /// Author of a text entry.
    pub fn author(&self) -> Option<&User> {
        match &self.kind {
            EntryKind::Text { user, .. } => Some(user),
            _ => None,
        }
    }
}
