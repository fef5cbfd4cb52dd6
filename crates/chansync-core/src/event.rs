//! Push events.
//!
//! Records delivered over the persistent connection, already decoded by the
//! push-event layer. Each record is addressed to a channel and carries one
//! [`PushKind`]. The set of kinds is closed so the reconciler's match is
//! exhaustive.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, Timestamp, User, UserId};

/// A server-initiated notification about one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Channel the event is about.
    pub channel: ChannelId,
    /// Server time of the event.
    pub at: Timestamp,
    /// Kind-specific payload.
    pub kind: PushKind,
}

impl PushEvent {
    /// Create an event.
    pub fn new(channel: impl Into<ChannelId>, at: Timestamp, kind: PushKind) -> Self {
        Self { channel: channel.into(), at, kind }
    }
}

/// Push event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushKind {
    /// Membership established by the server.
    Init {
        /// Members currently active.
        active: Vec<User>,
        /// Current owner, if known.
        owner: Option<UserId>,
    },
    /// A user joined.
    Join {
        /// User who joined.
        user: User,
    },
    /// A user left.
    Leave {
        /// User who left.
        user: User,
        /// Ownership transferred as a result of the leave.
        new_owner: Option<User>,
    },
    /// A user was kicked.
    Kick {
        /// User removed.
        target: User,
        /// Moderator, if reported.
        by: Option<User>,
    },
    /// A user was banned.
    Ban {
        /// User removed.
        target: User,
        /// Moderator, if reported.
        by: Option<User>,
    },
    /// A text message arrived.
    Message {
        /// Server-assigned id.
        id: u64,
        /// Author.
        user: User,
        /// Message body.
        body: String,
        /// Users mentioned in the body, as decoded by the server.
        mentions: Vec<UserId>,
    },
    /// A user became active.
    UserActive {
        /// User whose presence changed.
        user: User,
    },
    /// A user became idle.
    UserIdle {
        /// User whose presence changed.
        user: User,
    },
    /// A user went offline.
    UserOffline {
        /// User whose presence changed.
        user: User,
    },
}

impl PushKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Kick { .. } => "kick",
            Self::Ban { .. } => "ban",
            Self::Message { .. } => "message",
            Self::UserActive { .. } => "userActive",
            Self::UserIdle { .. } => "userIdle",
            Self::UserOffline { .. } => "userOffline",
        }
    }
}

/// Everything the push-event layer can deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
    /// A channel event.
    Event(PushEvent),
    /// The connection was re-established; all synchronized state is stale.
    ConnectionReset,
}
