//! Push event builders.
//!
//! Tests describe channel activity as a sequence of calls instead of
//! hand-assembling records. Timestamps and message ids increase with every
//! event so builders can be interleaved freely.

use chansync_core::{ChannelId, PushEvent, PushKind, Timestamp, User, UserId};

/// Builds push events for one channel.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    channel: ChannelId,
    clock: u64,
    next_message: u64,
}

impl ChannelEvents {
    /// Start a builder for `channel`. The clock starts at 1.
    pub fn new(channel: impl Into<ChannelId>) -> Self {
        Self { channel: channel.into(), clock: 0, next_message: 1 }
    }

    /// Channel events are addressed to.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Timestamp of the last built event.
    pub fn now(&self) -> Timestamp {
        Timestamp(self.clock)
    }

    /// Advance the clock without emitting anything.
    pub fn advance(&mut self, by: u64) {
        self.clock += by;
    }

    /// Membership established with the given active members.
    pub fn init(&mut self, active: Vec<User>, owner: Option<UserId>) -> PushEvent {
        self.event(PushKind::Init { active, owner })
    }

    /// `user` joined.
    pub fn join(&mut self, user: &User) -> PushEvent {
        self.event(PushKind::Join { user: user.clone() })
    }

    /// `user` left.
    pub fn leave(&mut self, user: &User) -> PushEvent {
        self.event(PushKind::Leave { user: user.clone(), new_owner: None })
    }

    /// `user` left and ownership moved to `new_owner`.
    pub fn leave_with_owner(&mut self, user: &User, new_owner: &User) -> PushEvent {
        self.event(PushKind::Leave { user: user.clone(), new_owner: Some(new_owner.clone()) })
    }

    /// `target` was kicked.
    pub fn kick(&mut self, target: &User, by: Option<&User>) -> PushEvent {
        self.event(PushKind::Kick { target: target.clone(), by: by.cloned() })
    }

    /// `target` was banned.
    pub fn ban(&mut self, target: &User, by: Option<&User>) -> PushEvent {
        self.event(PushKind::Ban { target: target.clone(), by: by.cloned() })
    }

    /// Text message from `user` with a fresh server id.
    pub fn message(&mut self, user: &User, body: &str) -> PushEvent {
        self.mention(user, body, &[])
    }

    /// Text message from `user` mentioning `mentions`.
    pub fn mention(&mut self, user: &User, body: &str, mentions: &[UserId]) -> PushEvent {
        let id = self.next_message;
        self.next_message += 1;
        self.event(PushKind::Message {
            id,
            user: user.clone(),
            body: body.to_owned(),
            mentions: mentions.to_vec(),
        })
    }

    /// Redelivery of a message id already built.
    pub fn redeliver(&mut self, id: u64, user: &User, body: &str) -> PushEvent {
        self.event(PushKind::Message {
            id,
            user: user.clone(),
            body: body.to_owned(),
            mentions: Vec::new(),
        })
    }

    /// `user` became active.
    pub fn active(&mut self, user: &User) -> PushEvent {
        self.event(PushKind::UserActive { user: user.clone() })
    }

    /// `user` went idle.
    pub fn idle(&mut self, user: &User) -> PushEvent {
        self.event(PushKind::UserIdle { user: user.clone() })
    }

    /// `user` went offline.
    pub fn offline(&mut self, user: &User) -> PushEvent {
        self.event(PushKind::UserOffline { user: user.clone() })
    }

    fn event(&mut self, kind: PushKind) -> PushEvent {
        self.clock += 1;
        PushEvent::new(self.channel.clone(), Timestamp(self.clock), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_and_ids_advance() {
        let mut events = ChannelEvents::new("abc");
        let b = User::new(2, "b");

        let first = events.message(&b, "one");
        let second = events.message(&b, "two");

        assert!(first.at < second.at);
        match (first.kind, second.kind) {
            (PushKind::Message { id: a, .. }, PushKind::Message { id: b, .. }) => assert!(a < b),
            other => panic!("unexpected kinds: {other:?}"),
        }
    }
}
