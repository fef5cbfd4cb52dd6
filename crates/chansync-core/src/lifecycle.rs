//! Request lifecycle bookkeeping.
//!
//! Every user-initiated operation goes through Begin, then exactly one of
//! Success or Failure. The [`RequestTracker`] remembers which requests are in
//! flight so a settlement can be matched to its operation and channel. A
//! canceled request is forgotten; when its settlement arrives anyway it no
//! longer matches and nothing is applied.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    history::BeforeTime,
    ids::{ChannelId, Timestamp, User, UserId},
    timeline::TimelineEntry,
};

/// Identity of an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User-initiated operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Join a channel.
    Join,
    /// Leave a channel.
    Leave,
    /// Send a text message.
    SendMessage,
    /// Load a page of older history.
    LoadHistory {
        /// Requested page size.
        limit: usize,
    },
    /// Load the full member list.
    LoadUserList,
}

impl Operation {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::SendMessage => "send-message",
            Self::LoadHistory { .. } => "load-history",
            Self::LoadUserList => "load-user-list",
        }
    }
}

/// Request handed to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Join a channel by name.
    Join {
        /// Channel to join.
        channel: ChannelId,
    },
    /// Leave a channel.
    Leave {
        /// Channel to leave.
        channel: ChannelId,
    },
    /// Send a text message.
    SendMessage {
        /// Target channel.
        channel: ChannelId,
        /// Message body.
        body: String,
    },
    /// Fetch entries older than `before`.
    LoadHistory {
        /// Target channel.
        channel: ChannelId,
        /// Page cursor.
        before: BeforeTime,
        /// Maximum entries to return.
        limit: usize,
    },
    /// Fetch the channel's member list.
    LoadUserList {
        /// Target channel.
        channel: ChannelId,
    },
}

impl Request {
    /// Channel the request targets.
    pub fn channel(&self) -> &ChannelId {
        match self {
            Self::Join { channel }
            | Self::Leave { channel }
            | Self::SendMessage { channel, .. }
            | Self::LoadHistory { channel, .. }
            | Self::LoadUserList { channel } => channel,
        }
    }

    /// Operation kind of the request.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Join { .. } => Operation::Join,
            Self::Leave { .. } => Operation::Leave,
            Self::SendMessage { .. } => Operation::SendMessage,
            Self::LoadHistory { limit, .. } => Operation::LoadHistory { limit: *limit },
            Self::LoadUserList { .. } => Operation::LoadUserList,
        }
    }
}

/// Initial channel snapshot returned by a join or sent as an `init` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Channel identity as spelled by the server.
    pub channel: ChannelId,
    /// Members currently active.
    pub active: Vec<User>,
    /// Current owner, if known.
    pub owner: Option<UserId>,
    /// Time of the join.
    pub at: Timestamp,
}

/// Message acknowledged by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// Server-assigned id.
    pub id: u64,
    /// Server time of the message.
    pub at: Timestamp,
    /// Body as stored by the server.
    pub body: String,
}

/// Successful response payloads, one per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Join succeeded.
    Joined(ChannelSnapshot),
    /// Leave succeeded.
    Left,
    /// Message accepted.
    MessageSent(SentMessage),
    /// Older entries, oldest first.
    History(Vec<TimelineEntry>),
    /// All members of the channel.
    UserList(Vec<User>),
}

/// A request in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Operation kind.
    pub operation: Operation,
    /// Target channel.
    pub channel: ChannelId,
}

/// Returned by Begin: the id to settle with and the request to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    /// Id for the eventual settlement.
    pub id: RequestId,
    /// Request for the request layer.
    pub request: Request,
}

/// Tracks requests between Begin and settlement.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    next_id: u64,
    pending: HashMap<RequestId, PendingRequest>,
}

impl RequestTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request.
    pub fn begin(&mut self, operation: Operation, channel: ChannelId) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.pending.insert(id, PendingRequest { operation, channel });
        id
    }

    /// Take a request for settlement. `None` if canceled or already settled.
    pub fn settle(&mut self, id: RequestId) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Forget a request so its settlement is never applied.
    pub fn cancel(&mut self, id: RequestId) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Remove every request matching `stale`, oldest first.
    pub fn drain_where(
        &mut self,
        stale: impl Fn(&PendingRequest) -> bool,
    ) -> Vec<(RequestId, PendingRequest)> {
        let mut ids: Vec<_> =
            self.pending.iter().filter(|(_, p)| stale(p)).map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.pending.remove(&id).map(|p| (id, p))).collect()
    }

    /// Look at a pending request.
    pub fn get(&self, id: RequestId) -> Option<&PendingRequest> {
        self.pending.get(&id)
    }

    /// Number of requests in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a request of this kind is in flight for a channel.
    pub fn has_pending(&self, channel: &ChannelId, operation: Operation) -> bool {
        self.pending.values().any(|p| &p.channel == channel && p.operation == operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_consumes_request() {
        let mut tracker = RequestTracker::new();
        let id = tracker.begin(Operation::Leave, ChannelId::new("abc"));

        assert!(tracker.has_pending(&ChannelId::new("ABC"), Operation::Leave));
        assert!(tracker.settle(id).is_some());
        assert!(tracker.settle(id).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn canceled_request_never_settles() {
        let mut tracker = RequestTracker::new();
        let id = tracker.begin(Operation::LoadUserList, ChannelId::new("abc"));

        assert!(tracker.cancel(id).is_some());
        assert!(tracker.settle(id).is_none());
    }

    #[test]
    fn drain_keeps_unmatched_requests() {
        let mut tracker = RequestTracker::new();
        let join = tracker.begin(Operation::Join, ChannelId::new("a"));
        let leave = tracker.begin(Operation::Leave, ChannelId::new("a"));
        let send = tracker.begin(Operation::SendMessage, ChannelId::new("b"));

        let drained = tracker.drain_where(|p| p.operation != Operation::Join);
        let ids: Vec<_> = drained.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [leave, send]);
        assert!(tracker.get(join).is_some());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut tracker = RequestTracker::new();
        let a = tracker.begin(Operation::Join, ChannelId::new("a"));
        let b = tracker.begin(Operation::Join, ChannelId::new("b"));
        assert_ne!(a, b);
        assert_eq!(tracker.len(), 2);
    }
}
