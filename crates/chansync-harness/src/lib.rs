//! Test harness for channel synchronization.
//!
//! Deterministic stand-ins for the two external collaborators of the sync
//! engine, plus behavioral invariants.
//!
//! # Components
//!
//! - [`ChannelEvents`]: builds push events for one channel with a monotonic
//!   clock and message ids
//! - [`ScriptedRequestLayer`]: a [`chansync_engine::RequestLayer`] that
//!   replies from a script, optionally holding replies behind a [`Gate`]
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies WHAT must be true after every transition,
//! not specific scenarios. Use [`SyncInvariants::standard()`] for the
//! partition, retention, unread and ordering invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod events;
pub mod invariants;
pub mod scripted;

pub use events::ChannelEvents;
pub use invariants::{
    ChannelInvariant, ChannelView, HistoryCap, PartitionDisjoint, PartitionSorted,
    RegistrySnapshot, SyncInvariants, UnreadOutOfFocus, Violation,
};
pub use scripted::{Gate, ScriptedRequestLayer};
