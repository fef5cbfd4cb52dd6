//! Channel presence and history synchronization
//!
//! Sans-IO state machines that keep a client's view of every joined channel
//! consistent while it is mutated by two independent sources: request
//! outcomes for operations the local user initiated, and push events
//! delivered over a persistent connection.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O or suspends. Callers feed request
//! settlements and push events into the [`ChatRegistry`], which applies them
//! atomically and returns [`SyncAction`]s describing side effects for the
//! caller to execute.
//!
//! # Components
//!
//! - [`PresencePartition`]: disjoint, sorted active/idle/offline member sets
//! - [`HistoryWindow`]: ordered, deduplicated timeline with a retention cap
//! - [`RequestTracker`]: Begin/Success/Failure bookkeeping with cancellation
//! - [`reconciler`]: maps push events and responses onto [`Transition`]s
//! - [`ChannelState`]: per-channel aggregate and flags
//! - [`ChatRegistry`]: every joined channel, keyed case-insensitively

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod channel;
mod config;
mod error;
mod event;
mod history;
mod ids;
mod lifecycle;
mod partition;
pub mod reconciler;
mod registry;
mod timeline;

pub use action::{RemovalReason, SyncAction};
pub use channel::ChannelState;
pub use config::{DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_HISTORY_RETENTION, SyncConfig};
pub use error::{ErrorCode, FetchError, FetchErrorKind, SyncError};
pub use event::{Inbound, PushEvent, PushKind};
pub use history::{BeforeTime, HistoryWindow};
pub use ids::{ChannelId, EntryId, Timestamp, User, UserId, Username};
pub use lifecycle::{
    ChannelSnapshot, Operation, PendingRequest, Request, RequestId, RequestTicket,
    RequestTracker, Response, SentMessage,
};
pub use partition::{Presence, PresencePartition, compare_members};
pub use reconciler::Transition;
pub use registry::ChatRegistry;
pub use timeline::{EntryKind, LeaveReason, TimelineEntry};
