//! Error types for channel synchronization.
//!
//! Two families: [`FetchError`] is what the request layer hands back when an
//! operation fails on the wire or on the server, and [`SyncError`] is a local
//! precondition violation detected before anything is sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ids::ChannelId, lifecycle::RequestId};

/// Machine-readable business rule violation reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The local user is banned from the channel.
    UserBanned,
    /// No channel with that name exists.
    ChannelNotFound,
    /// Moderation target is not a member.
    TargetNotInChannel,
    /// The channel owner cannot be moderated.
    CannotModerateChannelOwner,
    /// The user already owns the maximum number of channels.
    MaximumOwnedChannels,
    /// The user lacks the required role.
    NotEnoughPermissions,
    /// The resource already exists.
    AlreadyExists,
    /// A code this client does not know.
    Unknown(String),
}

/// Failure category of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// Network failure or timeout. Carries no code.
    Transport,
    /// Server rejected the request.
    Domain(ErrorCode),
}

/// Failure returned by the request layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("request failed ({kind:?}, status {status:?}): {message}")]
pub struct FetchError {
    /// Transport or domain failure.
    pub kind: FetchErrorKind,
    /// HTTP-like status, if the server answered.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl FetchError {
    /// Network-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: FetchErrorKind::Transport, status: None, message: message.into() }
    }

    /// Server-reported failure.
    pub fn domain(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self { kind: FetchErrorKind::Domain(code), status: Some(status), message: message.into() }
    }

    /// Server error code, if any.
    pub fn code(&self) -> Option<&ErrorCode> {
        match &self.kind {
            FetchErrorKind::Domain(code) => Some(code),
            FetchErrorKind::Transport => None,
        }
    }
}

/// Local precondition violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Operation targets a channel the registry does not hold.
    #[error("unknown channel: {channel}")]
    UnknownChannel {
        /// Requested channel.
        channel: ChannelId,
    },

    /// Join requested for a channel already joined.
    #[error("already joined channel {channel}")]
    AlreadyJoined {
        /// Requested channel.
        channel: ChannelId,
    },

    /// Join requested while another join for the channel is in flight.
    #[error("join already in progress for channel {channel}")]
    AlreadyJoining {
        /// Requested channel.
        channel: ChannelId,
    },

    /// Leave requested while another leave is in flight.
    #[error("leave already in progress for channel {channel}")]
    AlreadyLeaving {
        /// Requested channel.
        channel: ChannelId,
    },

    /// Settlement for a request that is not pending.
    #[error("unknown request {request}")]
    UnknownRequest {
        /// Request that was settled.
        request: RequestId,
    },

    /// Response payload does not match the request's operation.
    #[error("unexpected response for request {request}: expected {expected}")]
    UnexpectedResponse {
        /// Request that was settled.
        request: RequestId,
        /// Operation the request was for.
        expected: &'static str,
    },
}
