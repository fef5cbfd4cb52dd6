//! Invariant checking for registry tests.
//!
//! Most properties of the sync engine hold per channel: the presence
//! partition, the retention cap and the unread flag are all local to one
//! [`ChannelView`]. Those are expressed as [`ChannelInvariant`]s and run by
//! [`SyncInvariants`] over every held channel, so each violation names the
//! channel it was found in. The one registry-wide property, that the join
//! order lists exactly the held channels, is checked by [`SyncInvariants`]
//! itself.
//!
//! # Usage
//!
//! ```ignore
//! let invariants = SyncInvariants::standard();
//! invariants.assert_holds(&registry, "after join");
//! ```

mod checks;
mod snapshot;

use std::{collections::HashSet, fmt};

use chansync_core::{ChannelId, ChatRegistry};

pub use checks::{HistoryCap, PartitionDisjoint, PartitionSorted, UnreadOutOfFocus};
pub use snapshot::{ChannelView, RegistrySnapshot};

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Channel the violation was found in; `None` for the join order.
    pub channel: Option<ChannelId>,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{} in {channel}: {}", self.invariant, self.message),
            None => write!(f, "{}: {}", self.invariant, self.message),
        }
    }
}

/// A property every held channel must satisfy after every transition.
pub trait ChannelInvariant: Send + Sync {
    /// Name used in violations.
    fn name(&self) -> &'static str;

    /// Check one channel, describing the problem on failure.
    fn check(&self, channel: &ChannelView) -> Result<(), String>;
}

/// The set of invariants checked against a registry.
pub struct SyncInvariants {
    channel: Vec<Box<dyn ChannelInvariant>>,
}

impl SyncInvariants {
    /// The standard set:
    ///
    /// - [`PartitionDisjoint`]: a user is in at most one presence set
    /// - [`PartitionSorted`]: each presence set is in comparator order
    /// - [`HistoryCap`]: out-of-focus timelines respect the retention cap
    /// - [`UnreadOutOfFocus`]: only out-of-focus channels have unread
    ///
    /// plus join-order consistency.
    pub fn standard() -> Self {
        Self {
            channel: vec![
                Box::new(PartitionDisjoint),
                Box::new(PartitionSorted),
                Box::new(HistoryCap),
                Box::new(UnreadOutOfFocus),
            ],
        }
    }

    /// Add a channel invariant.
    #[must_use]
    pub fn with(mut self, invariant: impl ChannelInvariant + 'static) -> Self {
        self.channel.push(Box::new(invariant));
        self
    }

    /// Every violation in a snapshot, join order first, then channels in
    /// join order.
    pub fn violations(&self, state: &RegistrySnapshot) -> Vec<Violation> {
        let mut violations: Vec<_> = order_violation(state).into_iter().collect();
        for view in &state.channels {
            violations.extend(self.channel.iter().filter_map(|invariant| {
                invariant.check(view).err().map(|message| Violation {
                    invariant: invariant.name(),
                    channel: Some(view.id.clone()),
                    message,
                })
            }));
        }
        violations
    }

    /// Check a registry.
    ///
    /// # Errors
    ///
    /// Every violation found.
    pub fn check(&self, registry: &ChatRegistry) -> Result<(), Vec<Violation>> {
        let violations = self.violations(&RegistrySnapshot::from_registry(registry));
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check a registry, panicking with every violation and the step that
    /// produced the state.
    #[allow(clippy::panic, reason = "test helper")]
    pub fn assert_holds(&self, registry: &ChatRegistry, step: &str) {
        if let Err(violations) = self.check(registry) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("invariants violated after {step}:\n  {}", messages.join("\n  "));
        }
    }
}

/// The join order lists every held channel exactly once.
fn order_violation(state: &RegistrySnapshot) -> Option<Violation> {
    let message = {
        let unique: HashSet<_> = state.order.iter().collect();
        if unique.len() != state.order.len() {
            format!("duplicate channel in order {:?}", state.order)
        } else if state.held != state.order.len() || state.channels.len() != state.order.len() {
            format!(
                "order lists {} channels but {} are held",
                state.order.len(),
                state.channels.len()
            )
        } else {
            return None;
        }
    };
    Some(Violation { invariant: "order_consistency", channel: None, message })
}

#[cfg(test)]
mod tests {
    use chansync_core::{PushEvent, PushKind, SyncConfig, Timestamp, User};

    use super::*;

    fn view(id: &str) -> ChannelView {
        ChannelView {
            id: ChannelId::new(id),
            active: Vec::new(),
            idle: Vec::new(),
            offline: Vec::new(),
            timeline_len: 1,
            retention: 150,
            activated: false,
            has_unread: false,
            has_history: true,
        }
    }

    #[test]
    fn violations_name_the_channel() {
        let mut bad = view("Def");
        bad.activated = true;
        bad.has_unread = true;
        let state = RegistrySnapshot {
            order: vec![ChannelId::new("abc"), ChannelId::new("def")],
            channels: vec![view("abc"), bad],
            held: 2,
        };

        let violations = SyncInvariants::standard().violations(&state);
        assert_eq!(violations, [Violation {
            invariant: "unread_out_of_focus",
            channel: Some(ChannelId::new("DEF")),
            message: "unread while activated".into(),
        }]);
        assert_eq!(violations[0].to_string(), "unread_out_of_focus in Def: unread while activated");
    }

    #[test]
    fn order_is_checked_once_per_registry() {
        let state = RegistrySnapshot {
            order: vec![ChannelId::new("abc"), ChannelId::new("ABC")],
            channels: vec![view("abc")],
            held: 2,
        };

        let violations = SyncInvariants::standard().violations(&state);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].channel, None);
        assert_eq!(violations[0].invariant, "order_consistency");
    }

    #[test]
    fn added_invariant_runs_per_channel() {
        struct NeverExhausted;

        impl ChannelInvariant for NeverExhausted {
            fn name(&self) -> &'static str {
                "never_exhausted"
            }

            fn check(&self, channel: &ChannelView) -> Result<(), String> {
                if channel.has_history { Ok(()) } else { Err("history exhausted".into()) }
            }
        }

        let mut exhausted = view("def");
        exhausted.has_history = false;
        let state = RegistrySnapshot {
            order: vec![ChannelId::new("abc"), ChannelId::new("def")],
            channels: vec![view("abc"), exhausted],
            held: 2,
        };

        let violations = SyncInvariants::standard().with(NeverExhausted).violations(&state);
        let channels: Vec<_> = violations.iter().map(|v| v.channel.clone()).collect();
        assert_eq!(channels, [Some(ChannelId::new("def"))]);
    }

    #[test]
    fn seeded_registry_holds() {
        let mut registry = ChatRegistry::new(User::new(1, "me"), SyncConfig::default());
        registry.apply_push(PushEvent::new("abc", Timestamp(1), PushKind::Init {
            active: vec![User::new(3, "carol"), User::new(2, "Bob")],
            owner: None,
        }));

        assert_eq!(SyncInvariants::standard().check(&registry), Ok(()));
    }
}
