//! Ordered presence partition.
//!
//! A channel's known members are split into three disjoint, sorted sets:
//! `active`, `idle` and `offline`. Which set a member is in is implied by
//! membership alone, so every move searches all three sets before inserting.
//!
//! # Invariants
//!
//! - A [`UserId`] appears in at most one set.
//! - Each set is sorted by [`compare_members`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::{User, UserId};

/// Presence state of a channel member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    /// Currently active.
    Active,
    /// Connected but idle.
    Idle,
    /// Member of the channel but not connected.
    Offline,
}

impl Presence {
    /// All presence states in display order.
    pub const ALL: [Presence; 3] = [Presence::Active, Presence::Idle, Presence::Offline];
}

/// Member ordering: case-folded display name, then raw name, then id.
pub fn compare_members(a: &User, b: &User) -> Ordering {
    let folded = a.name.as_str().to_lowercase().cmp(&b.name.as_str().to_lowercase());
    folded.then_with(|| a.name.as_str().cmp(b.name.as_str())).then_with(|| a.id.cmp(&b.id))
}

/// Three disjoint sorted member sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresencePartition {
    active: Vec<User>,
    idle: Vec<User>,
    offline: Vec<User>,
}

impl PresencePartition {
    /// Create an empty partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Members in the given set, in sort order.
    pub fn members(&self, presence: Presence) -> &[User] {
        match presence {
            Presence::Active => &self.active,
            Presence::Idle => &self.idle,
            Presence::Offline => &self.offline,
        }
    }

    /// Ids in the given set, in sort order.
    pub fn ids(&self, presence: Presence) -> impl Iterator<Item = UserId> + '_ {
        self.members(presence).iter().map(|u| u.id)
    }

    /// Which set a user is in. `None` if unknown to the channel.
    pub fn presence_of(&self, user_id: UserId) -> Option<Presence> {
        Presence::ALL
            .into_iter()
            .find(|presence| self.members(*presence).iter().any(|u| u.id == user_id))
    }

    /// Total number of known members.
    pub fn len(&self) -> usize {
        self.active.len() + self.idle.len() + self.offline.len()
    }

    /// Whether no members are known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert into a set, preserving order.
    ///
    /// No-op if the user is already in that exact set. Does not look at the
    /// other sets; use [`Self::move_user`] when the user may be elsewhere.
    pub fn insert(&mut self, presence: Presence, user: User) -> bool {
        let set = self.set_mut(presence);
        if set.iter().any(|u| u.id == user.id) {
            return false;
        }
        let index =
            set.binary_search_by(|member| compare_members(member, &user)).unwrap_or_else(|i| i);
        set.insert(index, user);
        true
    }

    /// Move a user into `to`, removing it from whichever set holds it.
    ///
    /// A user not previously known is simply inserted.
    pub fn move_user(&mut self, user: User, to: Presence) {
        if self.presence_of(user.id) == Some(to) {
            // Refresh the record in place in case the display name changed.
            self.remove_from(to, &user);
        } else {
            self.remove_everywhere(&user);
        }
        self.insert(to, user);
    }

    /// Remove a user from all three sets. Returns the set it was in.
    pub fn remove_everywhere(&mut self, user: &User) -> Option<Presence> {
        Presence::ALL.into_iter().find(|presence| self.remove_from(*presence, user))
    }

    /// Add a fetched member list to `offline`, skipping anyone already known.
    pub fn seed_offline(&mut self, users: impl IntoIterator<Item = User>) {
        for user in users {
            if self.presence_of(user.id).is_none() {
                self.insert(Presence::Offline, user);
            }
        }
    }

    fn remove_from(&mut self, presence: Presence, user: &User) -> bool {
        let set = self.set_mut(presence);
        let found = match set.binary_search_by(|member| compare_members(member, user)) {
            Ok(index) => Some(index),
            // Stored name may be stale after a rename; identity decides.
            Err(_) => set.iter().position(|u| u.id == user.id),
        };
        match found {
            Some(index) => {
                set.remove(index);
                true
            },
            None => false,
        }
    }

    fn set_mut(&mut self, presence: Presence) -> &mut Vec<User> {
        match presence {
            Presence::Active => &mut self.active,
            Presence::Idle => &mut self.idle,
            Presence::Offline => &mut self.offline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(partition: &PresencePartition, presence: Presence) -> Vec<&str> {
        partition.members(presence).iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn insert_keeps_alphabetical_order() {
        let mut partition = PresencePartition::new();
        partition.insert(Presence::Active, User::new(2, "B"));
        partition.insert(Presence::Active, User::new(1, "A"));
        partition.insert(Presence::Active, User::new(3, "c"));

        assert_eq!(names(&partition, Presence::Active), ["A", "B", "c"]);
    }

    #[test]
    fn insert_twice_is_noop() {
        let mut partition = PresencePartition::new();
        assert!(partition.insert(Presence::Idle, User::new(1, "A")));
        assert!(!partition.insert(Presence::Idle, User::new(1, "A")));
        assert_eq!(partition.len(), 1);
    }

    #[test]
    fn ties_broken_by_id() {
        let mut partition = PresencePartition::new();
        partition.insert(Presence::Active, User::new(9, "same"));
        partition.insert(Presence::Active, User::new(3, "same"));

        let ids: Vec<_> = partition.ids(Presence::Active).collect();
        assert_eq!(ids, [UserId(3), UserId(9)]);
    }

    #[test]
    fn move_unknown_user_inserts() {
        let mut partition = PresencePartition::new();
        partition.move_user(User::new(7, "U"), Presence::Idle);

        assert_eq!(partition.presence_of(UserId(7)), Some(Presence::Idle));
        assert_eq!(partition.len(), 1);
    }

    #[test]
    fn move_removes_from_previous_set() {
        let mut partition = PresencePartition::new();
        partition.insert(Presence::Active, User::new(1, "A"));
        partition.move_user(User::new(1, "A"), Presence::Offline);

        assert!(partition.members(Presence::Active).is_empty());
        assert_eq!(partition.presence_of(UserId(1)), Some(Presence::Offline));
    }

    #[test]
    fn rename_is_removed_by_identity() {
        let mut partition = PresencePartition::new();
        partition.insert(Presence::Active, User::new(1, "old"));
        partition.insert(Presence::Active, User::new(2, "zed"));

        assert_eq!(partition.remove_everywhere(&User::new(1, "new")), Some(Presence::Active));
        assert_eq!(names(&partition, Presence::Active), ["zed"]);
    }

    #[test]
    fn seed_offline_skips_known_members() {
        let mut partition = PresencePartition::new();
        partition.insert(Presence::Active, User::new(1, "A"));
        partition.insert(Presence::Idle, User::new(2, "B"));
        partition.seed_offline([User::new(1, "A"), User::new(2, "B"), User::new(3, "C")]);

        assert_eq!(names(&partition, Presence::Offline), ["C"]);
        assert_eq!(partition.len(), 3);
    }
}
