//! Event reconciliation.
//!
//! Push events and request outcomes arrive from different places but mean
//! the same handful of things: a channel was established or destroyed, a
//! member came or went, presence changed, entries arrived, a request
//! finished. This module maps both sources onto one [`Transition`]
//! vocabulary which the registry applies.
//!
//! Self versus other is always decided by comparing [`UserId`]s against the
//! local identity, never by name.

use crate::{
    action::RemovalReason,
    error::{FetchError, SyncError},
    event::{PushEvent, PushKind},
    ids::{ChannelId, EntryId, Timestamp, User, UserId},
    lifecycle::{ChannelSnapshot, Operation, PendingRequest, RequestId, Response},
    partition::Presence,
    timeline::{EntryKind, LeaveReason, TimelineEntry},
};

/// Canonical state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Establish a channel from a server snapshot.
    Seed(ChannelSnapshot),

    /// Remove a channel; the local user is no longer a member.
    Destroy {
        /// Channel to remove.
        channel: ChannelId,
        /// Why.
        reason: RemovalReason,
    },

    /// Another user joined.
    MemberJoined {
        /// Target channel.
        channel: ChannelId,
        /// User who joined.
        user: User,
        /// Event time.
        at: Timestamp,
    },

    /// Another user left, was kicked or was banned.
    MemberLeft {
        /// Target channel.
        channel: ChannelId,
        /// User who is gone.
        user: User,
        /// How they left.
        reason: LeaveReason,
        /// Ownership transferred as a result.
        new_owner: Option<User>,
        /// Event time.
        at: Timestamp,
    },

    /// A member's presence changed. No timeline entry.
    PresenceChanged {
        /// Target channel.
        channel: ChannelId,
        /// User whose presence changed.
        user: User,
        /// New presence.
        presence: Presence,
    },

    /// A live text entry arrived.
    MessageAppended {
        /// Target channel.
        channel: ChannelId,
        /// The entry.
        entry: TimelineEntry,
        /// The local user authored it.
        from_self: bool,
        /// The local user is mentioned.
        mentions_self: bool,
    },

    /// A page of older history arrived.
    HistoryLoaded {
        /// Target channel.
        channel: ChannelId,
        /// Entries, oldest first.
        entries: Vec<TimelineEntry>,
        /// Page size that was requested.
        limit: usize,
    },

    /// The full member list arrived.
    UserListLoaded {
        /// Target channel.
        channel: ChannelId,
        /// All members.
        users: Vec<User>,
    },

    /// A request finished; clear the flag its Begin set.
    Finish {
        /// Request that finished.
        request: RequestId,
        /// Operation kind.
        operation: Operation,
        /// Target channel.
        channel: ChannelId,
        /// Outcome reported to the caller.
        outcome: Result<(), FetchError>,
    },
}

impl Transition {
    /// Channel the transition applies to.
    pub fn channel(&self) -> &ChannelId {
        match self {
            Self::Seed(snapshot) => &snapshot.channel,
            Self::Destroy { channel, .. }
            | Self::MemberJoined { channel, .. }
            | Self::MemberLeft { channel, .. }
            | Self::PresenceChanged { channel, .. }
            | Self::MessageAppended { channel, .. }
            | Self::HistoryLoaded { channel, .. }
            | Self::UserListLoaded { channel, .. }
            | Self::Finish { channel, .. } => channel,
        }
    }
}

/// Map a push event onto transitions.
pub fn reconcile_push(event: PushEvent, local: UserId) -> Vec<Transition> {
    let PushEvent { channel, at, kind } = event;
    match kind {
        PushKind::Init { active, owner } => {
            vec![Transition::Seed(ChannelSnapshot { channel, active, owner, at })]
        },
        PushKind::Join { user } if user.id == local => {
            // Our own join is represented by the seed's SelfJoin entry.
            vec![Transition::PresenceChanged { channel, user, presence: Presence::Active }]
        },
        PushKind::Join { user } => vec![Transition::MemberJoined { channel, user, at }],
        PushKind::Leave { user, .. } if user.id == local => {
            vec![Transition::Destroy { channel, reason: RemovalReason::Left }]
        },
        PushKind::Leave { user, new_owner } => vec![Transition::MemberLeft {
            channel,
            user,
            reason: LeaveReason::Left,
            new_owner,
            at,
        }],
        PushKind::Kick { target, by } => {
            removal(channel, target, by, at, local, LeaveReason::Kicked)
        },
        PushKind::Ban { target, by } => {
            removal(channel, target, by, at, local, LeaveReason::Banned)
        },
        PushKind::Message { id, user, body, mentions } => {
            let from_self = user.id == local;
            let mentions_self = mentions.contains(&local);
            let entry =
                TimelineEntry::new(EntryId::Server(id), at, EntryKind::Text { user, body });
            vec![Transition::MessageAppended { channel, entry, from_self, mentions_self }]
        },
        PushKind::UserActive { user } => {
            vec![Transition::PresenceChanged { channel, user, presence: Presence::Active }]
        },
        PushKind::UserIdle { user } => {
            vec![Transition::PresenceChanged { channel, user, presence: Presence::Idle }]
        },
        PushKind::UserOffline { user } => {
            vec![Transition::PresenceChanged { channel, user, presence: Presence::Offline }]
        },
    }
}

fn removal(
    channel: ChannelId,
    target: User,
    by: Option<User>,
    at: Timestamp,
    local: UserId,
    reason: LeaveReason,
) -> Vec<Transition> {
    if target.id == local {
        let reason = match reason {
            LeaveReason::Banned => RemovalReason::Banned { by },
            LeaveReason::Kicked | LeaveReason::Left => RemovalReason::Kicked { by },
        };
        return vec![Transition::Destroy { channel, reason }];
    }
    vec![Transition::MemberLeft { channel, user: target, reason, new_owner: None, at }]
}

/// Map a successful response onto transitions.
///
/// The first transition is always [`Transition::Finish`] so the loading flag
/// is cleared before the operation's effect is applied.
pub fn reconcile_success(
    request: RequestId,
    pending: PendingRequest,
    response: Response,
    local: &User,
) -> Result<Vec<Transition>, SyncError> {
    let PendingRequest { operation, channel } = pending;
    let finish =
        Transition::Finish { request, operation, channel: channel.clone(), outcome: Ok(()) };

    let effect = match (operation, response) {
        (Operation::Join, Response::Joined(snapshot)) => Transition::Seed(snapshot),
        (Operation::Leave, Response::Left) => {
            Transition::Destroy { channel, reason: RemovalReason::Left }
        },
        (Operation::SendMessage, Response::MessageSent(sent)) => {
            let kind = EntryKind::Text { user: local.clone(), body: sent.body };
            Transition::MessageAppended {
                channel,
                entry: TimelineEntry::new(EntryId::Server(sent.id), sent.at, kind),
                from_self: true,
                mentions_self: false,
            }
        },
        (Operation::LoadHistory { limit }, Response::History(entries)) => {
            Transition::HistoryLoaded { channel, entries, limit }
        },
        (Operation::LoadUserList, Response::UserList(users)) => {
            Transition::UserListLoaded { channel, users }
        },
        (operation, _) => {
            return Err(SyncError::UnexpectedResponse { request, expected: operation.name() });
        },
    };

    Ok(vec![finish, effect])
}

/// Map a failed request onto transitions. Only the flag is cleared.
pub fn reconcile_failure(
    request: RequestId,
    pending: PendingRequest,
    error: FetchError,
) -> Vec<Transition> {
    let PendingRequest { operation, channel } = pending;
    vec![Transition::Finish { request, operation, channel, outcome: Err(error) }]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: UserId = UserId(1);

    fn event(kind: PushKind) -> PushEvent {
        PushEvent::new("abc", Timestamp(5), kind)
    }

    #[test]
    fn self_leave_destroys() {
        let leave = PushKind::Leave { user: User::new(1, "me"), new_owner: None };
        let transitions = reconcile_push(event(leave), ME);

        assert!(matches!(transitions.as_slice(), [Transition::Destroy {
            reason: RemovalReason::Left,
            ..
        }]));
    }

    #[test]
    fn other_kick_is_tagged_leave() {
        let transitions = reconcile_push(
            event(PushKind::Kick { target: User::new(2, "b"), by: Some(User::new(3, "mod")) }),
            ME,
        );

        assert!(matches!(transitions.as_slice(), [Transition::MemberLeft {
            reason: LeaveReason::Kicked,
            ..
        }]));
    }

    #[test]
    fn self_ban_destroys_with_moderator() {
        let transitions = reconcile_push(
            event(PushKind::Ban { target: User::new(1, "me"), by: Some(User::new(3, "mod")) }),
            ME,
        );

        match transitions.as_slice() {
            [Transition::Destroy { reason: RemovalReason::Banned { by: Some(by) }, .. }] => {
                assert_eq!(by.id, UserId(3));
            },
            other => panic!("unexpected transitions: {other:?}"),
        }
    }

    #[test]
    fn self_identity_survives_rename() {
        // Same id, different name: still us.
        let transitions = reconcile_push(
            event(PushKind::Leave { user: User::new(1, "renamed"), new_owner: None }),
            ME,
        );
        assert!(matches!(transitions.as_slice(), [Transition::Destroy { .. }]));
    }

    #[test]
    fn message_flags_mentions() {
        let transitions = reconcile_push(
            event(PushKind::Message {
                id: 9,
                user: User::new(2, "b"),
                body: "hi @me".into(),
                mentions: vec![ME],
            }),
            ME,
        );

        assert!(matches!(transitions.as_slice(), [Transition::MessageAppended {
            from_self: false,
            mentions_self: true,
            ..
        }]));
    }

    #[test]
    fn mismatched_response_is_rejected() {
        let pending = PendingRequest { operation: Operation::Leave, channel: "abc".into() };
        let local = User::new(1, "me");
        let result = reconcile_success(RequestId(1), pending, Response::UserList(vec![]), &local);

        assert!(matches!(result, Err(SyncError::UnexpectedResponse { expected: "leave", .. })));
    }

    #[test]
    fn failure_only_finishes() {
        let pending = PendingRequest { operation: Operation::LoadUserList, channel: "abc".into() };
        let transitions =
            reconcile_failure(RequestId(4), pending, FetchError::transport("timeout"));

        assert!(matches!(transitions.as_slice(), [Transition::Finish { outcome: Err(_), .. }]));
    }
}
