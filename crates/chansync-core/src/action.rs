//! Side effects produced by the registry.
//!
//! This module defines [`SyncAction`], descriptions of things the caller may
//! want to react to (notifications, UI feedback) after a transition. None of
//! them is required for the registry's own consistency.

use crate::{
    error::FetchError,
    ids::{ChannelId, EntryId, User},
    lifecycle::{Operation, RequestId},
};

/// Why a channel disappeared from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// The local user left.
    Left,
    /// The local user was kicked.
    Kicked {
        /// Moderator, if reported.
        by: Option<User>,
    },
    /// The local user was banned.
    Banned {
        /// Moderator, if reported.
        by: Option<User>,
    },
}

/// Actions produced by the registry for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A channel was added to the registry.
    ChannelJoined {
        /// Channel added.
        channel: ChannelId,
    },

    /// A channel was removed from the registry.
    ChannelRemoved {
        /// Channel removed.
        channel: ChannelId,
        /// Why it was removed.
        reason: RemovalReason,
    },

    /// The local user was mentioned in a channel that is not in focus.
    Mentioned {
        /// Channel of the message.
        channel: ChannelId,
        /// Entry that mentions the user.
        entry: EntryId,
    },

    /// A request reached its Success or Failure transition.
    RequestSettled {
        /// Request that settled.
        request: RequestId,
        /// Operation kind.
        operation: Operation,
        /// Target channel.
        channel: ChannelId,
        /// `Err` carries the failure for the caller to surface.
        outcome: Result<(), FetchError>,
    },

    /// The registry was cleared after a connection reset.
    Reset,
}
