//! Caller-facing handles.
//!
//! [`EngineHandle`] is the outbound operation surface used by UI or CLI
//! code. It never touches registry state directly: every operation is sent to
//! the engine loop, which is the only writer. Reads go through immutable
//! snapshots published after each transition.

use std::sync::Arc;

use chansync_core::{ChannelId, ChatRegistry, FetchError, RequestId, SyncAction, SyncError};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// Operation to begin, as sent to the engine loop.
#[derive(Debug)]
pub(crate) enum Begin {
    Join(ChannelId),
    Leave(ChannelId),
    SendMessage(ChannelId, String),
    LoadHistory(ChannelId, Option<usize>),
    LoadUserList(ChannelId),
}

/// Commands processed by the engine loop.
#[derive(Debug)]
pub(crate) enum Command {
    Begin { begin: Begin, reply: oneshot::Sender<Result<RequestHandle, SyncError>> },
    Activate { channel: ChannelId, reply: oneshot::Sender<Result<(), SyncError>> },
    Deactivate { channel: ChannelId, reply: oneshot::Sender<Result<(), SyncError>> },
}

/// An issued request.
///
/// Dropping the handle does not cancel the request; call
/// [`RequestHandle::cancel`] for that.
#[derive(Debug)]
pub struct RequestHandle {
    id: RequestId,
    token: CancellationToken,
    outcome: oneshot::Receiver<Result<(), FetchError>>,
}

impl RequestHandle {
    pub(crate) fn new(
        id: RequestId,
        token: CancellationToken,
        outcome: oneshot::Receiver<Result<(), FetchError>>,
    ) -> Self {
        Self { id, token, outcome }
    }

    /// Request id, as reported in [`SyncAction::RequestSettled`].
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Cancel the request. Its Success/Failure transition will not be
    /// applied.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token observed by the request layer for this request.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for settlement.
    ///
    /// `None` if the request was canceled or the engine stopped first.
    pub async fn outcome(self) -> Option<Result<(), FetchError>> {
        self.outcome.await.ok()
    }
}

/// Cloneable handle to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<ChatRegistry>>,
    notifications: broadcast::Sender<SyncAction>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        snapshots: watch::Receiver<Arc<ChatRegistry>>,
        notifications: broadcast::Sender<SyncAction>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { commands, snapshots, notifications, shutdown }
    }

    /// Join a channel by name.
    pub async fn join(&self, channel: impl Into<ChannelId>) -> Result<RequestHandle, EngineError> {
        self.begin(Begin::Join(channel.into())).await
    }

    /// Leave a channel.
    pub async fn leave(&self, channel: impl Into<ChannelId>) -> Result<RequestHandle, EngineError> {
        self.begin(Begin::Leave(channel.into())).await
    }

    /// Send a text message.
    pub async fn send_message(
        &self,
        channel: impl Into<ChannelId>,
        body: impl Into<String>,
    ) -> Result<RequestHandle, EngineError> {
        self.begin(Begin::SendMessage(channel.into(), body.into())).await
    }

    /// Load the page of history before the earliest entry.
    ///
    /// `limit` defaults to the configured page size.
    pub async fn load_older_history(
        &self,
        channel: impl Into<ChannelId>,
        limit: Option<usize>,
    ) -> Result<RequestHandle, EngineError> {
        self.begin(Begin::LoadHistory(channel.into(), limit)).await
    }

    /// Load the channel's member list.
    ///
    /// The engine does not coalesce this; check
    /// [`chansync_core::ChannelState::user_list_requested`] on a snapshot
    /// first.
    pub async fn load_user_list(
        &self,
        channel: impl Into<ChannelId>,
    ) -> Result<RequestHandle, EngineError> {
        self.begin(Begin::LoadUserList(channel.into())).await
    }

    /// Put a channel in focus.
    pub async fn activate(&self, channel: impl Into<ChannelId>) -> Result<(), EngineError> {
        let channel = channel.into();
        self.toggle(|reply| Command::Activate { channel, reply }).await
    }

    /// Take a channel out of focus.
    pub async fn deactivate(&self, channel: impl Into<ChannelId>) -> Result<(), EngineError> {
        let channel = channel.into();
        self.toggle(|reply| Command::Deactivate { channel, reply }).await
    }

    /// Latest published registry state.
    pub fn snapshot(&self) -> Arc<ChatRegistry> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Receiver that is notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ChatRegistry>> {
        self.snapshots.clone()
    }

    /// Receiver for side-effect notifications.
    pub fn notifications(&self) -> broadcast::Receiver<SyncAction> {
        self.notifications.subscribe()
    }

    /// Stop the engine loop and cancel all in-flight requests.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn begin(&self, begin: Begin) -> Result<RequestHandle, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Begin { begin, reply }).await.map_err(|_| EngineError::Closed)?;
        Ok(response.await.map_err(|_| EngineError::Closed)??)
    }

    async fn toggle(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<(), SyncError>>) -> Command,
    ) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(command(reply)).await.map_err(|_| EngineError::Closed)?;
        Ok(response.await.map_err(|_| EngineError::Closed)??)
    }
}
