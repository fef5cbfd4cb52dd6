//! Standard channel invariants.

use std::{cmp::Ordering, collections::HashSet};

use chansync_core::{Presence, compare_members};

use super::{ChannelInvariant, ChannelView};

/// A user appears in at most one of active, idle and offline.
pub struct PartitionDisjoint;

impl ChannelInvariant for PartitionDisjoint {
    fn name(&self) -> &'static str {
        "partition_disjoint"
    }

    fn check(&self, channel: &ChannelView) -> Result<(), String> {
        let mut seen = HashSet::new();
        for presence in Presence::ALL {
            if let Some(user) = channel.members(presence).iter().find(|u| !seen.insert(u.id)) {
                return Err(format!("user {} appears again in {presence:?}", user.id));
            }
        }
        Ok(())
    }
}

/// Each presence set is strictly ordered by the member comparator.
pub struct PartitionSorted;

impl ChannelInvariant for PartitionSorted {
    fn name(&self) -> &'static str {
        "partition_sorted"
    }

    fn check(&self, channel: &ChannelView) -> Result<(), String> {
        for presence in Presence::ALL {
            let members = channel.members(presence);
            let unsorted = members.windows(2).find(|pair| {
                compare_members(&pair[0], &pair[1]) != Ordering::Less
            });
            if let Some([a, b]) = unsorted {
                return Err(format!(
                    "{presence:?}: {} ({}) not before {} ({})",
                    a.name, a.id, b.name, b.id
                ));
            }
        }
        Ok(())
    }
}

/// Out-of-focus timelines never exceed the retention cap.
pub struct HistoryCap;

impl ChannelInvariant for HistoryCap {
    fn name(&self) -> &'static str {
        "history_cap"
    }

    fn check(&self, channel: &ChannelView) -> Result<(), String> {
        if !channel.activated && channel.timeline_len > channel.retention {
            return Err(format!(
                "{} entries exceeds cap {} while not activated",
                channel.timeline_len, channel.retention
            ));
        }
        Ok(())
    }
}

/// Only out-of-focus channels can have unread content.
pub struct UnreadOutOfFocus;

impl ChannelInvariant for UnreadOutOfFocus {
    fn name(&self) -> &'static str {
        "unread_out_of_focus"
    }

    fn check(&self, channel: &ChannelView) -> Result<(), String> {
        if channel.activated && channel.has_unread {
            return Err("unread while activated".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chansync_core::{ChannelId, User};

    use super::*;

    fn channel() -> ChannelView {
        ChannelView {
            id: ChannelId::new("abc"),
            active: Vec::new(),
            idle: Vec::new(),
            offline: Vec::new(),
            timeline_len: 0,
            retention: 150,
            activated: false,
            has_unread: false,
            has_history: true,
        }
    }

    #[test]
    fn detects_user_in_two_sets() {
        let mut c = channel();
        c.active.push(User::new(1, "a"));
        c.offline.push(User::new(1, "a"));
        assert_eq!(PartitionDisjoint.check(&c), Err("user 1 appears again in Offline".into()));
    }

    #[test]
    fn detects_unsorted_set() {
        let mut c = channel();
        c.idle = vec![User::new(1, "b"), User::new(2, "a")];
        assert!(PartitionSorted.check(&c).is_err());

        c.idle.reverse();
        assert!(PartitionSorted.check(&c).is_ok());
    }

    #[test]
    fn cap_only_applies_out_of_focus() {
        let mut c = channel();
        c.timeline_len = 151;
        assert!(HistoryCap.check(&c).is_err());

        c.activated = true;
        assert!(HistoryCap.check(&c).is_ok());
    }

    #[test]
    fn detects_unread_in_focus() {
        let mut c = channel();
        c.has_unread = true;
        assert!(UnreadOutOfFocus.check(&c).is_ok());

        c.activated = true;
        assert!(UnreadOutOfFocus.check(&c).is_err());
    }
}
