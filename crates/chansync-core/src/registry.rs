//! Channel registry.
//!
//! [`ChatRegistry`] is the top-level collection of every channel the local
//! user is a member of, keyed case-insensitively by [`ChannelId`] and kept in
//! join order. It is the single mutable resource of the subsystem: all
//! request lifecycle steps and push events are applied through it.
//!
//! Channel states are held behind [`Arc`] and mutated with
//! [`Arc::make_mut`], so cloning the registry is cheap and a clone held by an
//! observer is never affected by later transitions.
//!
//! # Responsibilities
//!
//! - Begin/Success/Failure/cancel of user-initiated operations.
//! - Applying push events through the reconciler.
//! - Local focus toggles (`activate` / `deactivate`).
//! - Clearing everything on a connection reset.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    action::{RemovalReason, SyncAction},
    channel::ChannelState,
    config::SyncConfig,
    error::{FetchError, SyncError},
    event::{Inbound, PushEvent},
    ids::{ChannelId, EntryId, Timestamp, User, UserId},
    lifecycle::{
        ChannelSnapshot, Operation, PendingRequest, Request, RequestId, RequestTicket,
        RequestTracker, Response,
    },
    partition::Presence,
    reconciler::{self, Transition},
    timeline::{EntryKind, LeaveReason, TimelineEntry},
};

/// All channels the local user belongs to.
#[derive(Debug, Clone)]
pub struct ChatRegistry {
    /// Authenticated local user.
    local: User,
    config: SyncConfig,
    /// Membership list in join order.
    order: Vec<ChannelId>,
    channels: HashMap<ChannelId, Arc<ChannelState>>,
    /// Channels with a join request in flight.
    joining: HashSet<ChannelId>,
    requests: RequestTracker,
    /// Next id for synthetic timeline entries.
    next_entry: u64,
}

impl ChatRegistry {
    /// Create an empty registry for the given local user.
    pub fn new(local: User, config: SyncConfig) -> Self {
        Self {
            local,
            config,
            order: Vec::new(),
            channels: HashMap::new(),
            joining: HashSet::new(),
            requests: RequestTracker::new(),
            next_entry: 0,
        }
    }

    /// Authenticated local user.
    pub fn local_user(&self) -> &User {
        &self.local
    }

    /// Registry configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// State of a channel. `None` if not a member.
    pub fn get(&self, channel: &ChannelId) -> Option<&ChannelState> {
        self.channels.get(channel).map(Arc::as_ref)
    }

    /// Shared handle to a channel's state.
    pub fn get_shared(&self, channel: &ChannelId) -> Option<Arc<ChannelState>> {
        self.channels.get(channel).cloned()
    }

    /// Whether the local user is a member.
    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.channels.contains_key(channel)
    }

    /// Whether a join is in flight for the channel.
    pub fn is_joining(&self, channel: &ChannelId) -> bool {
        self.joining.contains(channel)
    }

    /// Channel ids in join order.
    pub fn order(&self) -> &[ChannelId] {
        &self.order
    }

    /// Channels in join order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelState> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    /// Channels currently in focus.
    pub fn activated(&self) -> impl Iterator<Item = &ChannelState> {
        self.channels().filter(|c| c.activated())
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no channels are joined.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Requests in flight.
    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    /// Whether an id is the local user.
    pub fn is_local(&self, user: UserId) -> bool {
        self.local.id == user
    }

    /// Begin joining a channel.
    pub fn begin_join(&mut self, channel: ChannelId) -> Result<RequestTicket, SyncError> {
        if self.contains(&channel) {
            return Err(SyncError::AlreadyJoined { channel });
        }
        if !self.joining.insert(channel.clone()) {
            return Err(SyncError::AlreadyJoining { channel });
        }
        let id = self.requests.begin(Operation::Join, channel.clone());
        Ok(RequestTicket { id, request: Request::Join { channel } })
    }

    /// Begin leaving a channel.
    pub fn begin_leave(&mut self, channel: &ChannelId) -> Result<RequestTicket, SyncError> {
        let state = self.channel_mut(channel)?;
        if state.leaving() {
            return Err(SyncError::AlreadyLeaving { channel: channel.clone() });
        }
        state.set_leaving(true);
        let id = self.requests.begin(Operation::Leave, channel.clone());
        Ok(RequestTicket { id, request: Request::Leave { channel: channel.clone() } })
    }

    /// Begin sending a message.
    pub fn begin_send(
        &mut self,
        channel: &ChannelId,
        body: impl Into<String>,
    ) -> Result<RequestTicket, SyncError> {
        self.channel_mut(channel)?.begin_send();
        let id = self.requests.begin(Operation::SendMessage, channel.clone());
        Ok(RequestTicket {
            id,
            request: Request::SendMessage { channel: channel.clone(), body: body.into() },
        })
    }

    /// Begin loading older history before the earliest entry.
    ///
    /// `limit` defaults to the configured page size.
    pub fn begin_load_history(
        &mut self,
        channel: &ChannelId,
        limit: Option<usize>,
    ) -> Result<RequestTicket, SyncError> {
        let limit = limit.unwrap_or(self.config.history_page_size);
        let state = self.channel_mut(channel)?;
        state.set_loading_history(true);
        let before = state.before_time();
        let operation = Operation::LoadHistory { limit };
        let id = self.requests.begin(operation, channel.clone());
        Ok(RequestTicket {
            id,
            request: Request::LoadHistory { channel: channel.clone(), before, limit },
        })
    }

    /// Begin loading the member list.
    ///
    /// Does not deduplicate; callers check
    /// [`ChannelState::user_list_requested`] first.
    pub fn begin_load_user_list(
        &mut self,
        channel: &ChannelId,
    ) -> Result<RequestTicket, SyncError> {
        self.channel_mut(channel)?.begin_user_list();
        let id = self.requests.begin(Operation::LoadUserList, channel.clone());
        Ok(RequestTicket { id, request: Request::LoadUserList { channel: channel.clone() } })
    }

    /// Apply a successful response.
    ///
    /// A payload that does not match the operation settles the request as a
    /// failure; nothing of the payload is applied.
    pub fn succeed(
        &mut self,
        request: RequestId,
        response: Response,
    ) -> Result<Vec<SyncAction>, SyncError> {
        let pending = self.take_pending(request)?;
        let transitions =
            reconciler::reconcile_success(request, pending.clone(), response, &self.local)
                .unwrap_or_else(|e| {
                    tracing::warn!(%request, error = %e, "malformed response");
                    let failure = FetchError::transport(e.to_string());
                    reconciler::reconcile_failure(request, pending, failure)
                });
        Ok(self.apply_all(transitions))
    }

    /// Apply a failed response. Only the Begin flag is cleared.
    pub fn fail(
        &mut self,
        request: RequestId,
        error: FetchError,
    ) -> Result<Vec<SyncAction>, SyncError> {
        let pending = self.take_pending(request)?;
        tracing::warn!(
            %request,
            operation = pending.operation.name(),
            channel = %pending.channel,
            error = %error,
            "request failed"
        );
        Ok(self.apply_all(reconciler::reconcile_failure(request, pending, error)))
    }

    /// Cancel a request. Its settlement will never be applied.
    ///
    /// Rolls back what Begin set so the operation can be issued again.
    pub fn cancel(&mut self, request: RequestId) -> Option<Operation> {
        let PendingRequest { operation, channel } = self.requests.cancel(request)?;
        tracing::debug!(%request, operation = operation.name(), %channel, "request canceled");
        if operation == Operation::Join {
            self.joining.remove(&channel);
            return Some(operation);
        }
        if let Some(state) = self.channels.get_mut(&channel) {
            let state = Arc::make_mut(state);
            match operation {
                Operation::Leave => state.set_leaving(false),
                Operation::SendMessage => state.finish_send(),
                Operation::LoadHistory { .. } => state.set_loading_history(false),
                Operation::LoadUserList => state.rollback_user_list(),
                Operation::Join => {},
            }
        }
        Some(operation)
    }

    /// Apply a push event.
    pub fn apply_push(&mut self, event: PushEvent) -> Vec<SyncAction> {
        tracing::trace!(channel = %event.channel, kind = event.kind.name(), "push event");
        let transitions = reconciler::reconcile_push(event, self.local.id);
        self.apply_all(transitions)
    }

    /// Apply anything the push-event layer delivers.
    pub fn apply_inbound(&mut self, inbound: Inbound) -> Vec<SyncAction> {
        match inbound {
            Inbound::Event(event) => self.apply_push(event),
            Inbound::ConnectionReset => self.reset(),
        }
    }

    /// Put a channel in focus and clear its unread flag.
    pub fn activate(&mut self, channel: &ChannelId) -> Result<(), SyncError> {
        self.channel_mut(channel)?.activate();
        Ok(())
    }

    /// Take a channel out of focus. Retention applies again.
    pub fn deactivate(&mut self, channel: &ChannelId) -> Result<(), SyncError> {
        self.channel_mut(channel)?.deactivate();
        Ok(())
    }

    /// Drop all synchronized channel state.
    ///
    /// Requests against the dropped channels are settled here with a
    /// transport failure; their late responses are unknown to the tracker and
    /// can never touch a channel re-seeded after the reset. Joins stay in
    /// flight: a join response is a fresh snapshot.
    pub fn reset(&mut self) -> Vec<SyncAction> {
        let stale = self.requests.drain_where(|p| p.operation != Operation::Join);
        tracing::info!(
            channels = self.order.len(),
            requests = stale.len(),
            "connection reset, clearing registry"
        );
        self.order.clear();
        self.channels.clear();

        let mut actions = vec![SyncAction::Reset];
        actions.extend(stale.into_iter().map(|(request, PendingRequest { operation, channel })| {
            SyncAction::RequestSettled {
                request,
                operation,
                channel,
                outcome: Err(FetchError::transport("connection reset")),
            }
        }));
        actions
    }

    fn take_pending(&mut self, request: RequestId) -> Result<PendingRequest, SyncError> {
        self.requests.settle(request).ok_or(SyncError::UnknownRequest { request })
    }

    fn channel_mut(&mut self, channel: &ChannelId) -> Result<&mut ChannelState, SyncError> {
        self.channels
            .get_mut(channel)
            .map(Arc::make_mut)
            .ok_or_else(|| SyncError::UnknownChannel { channel: channel.clone() })
    }

    fn apply_all(&mut self, transitions: Vec<Transition>) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        for transition in transitions {
            self.apply(transition, &mut actions);
        }
        actions
    }

    fn apply(&mut self, transition: Transition, actions: &mut Vec<SyncAction>) {
        match transition {
            Transition::Seed(snapshot) => self.seed(snapshot, actions),
            Transition::Destroy { channel, reason } => self.destroy(&channel, reason, actions),
            Transition::Finish { request, operation, channel, outcome } => {
                self.finish(operation, &channel);
                actions.push(SyncAction::RequestSettled { request, operation, channel, outcome });
            },
            Transition::MemberJoined { channel, user, at } => {
                let entry = self.local_entry(at, EntryKind::Join { user: user.clone() });
                let Some(state) = self.live_channel(&channel, "join") else { return };
                state.partition_mut().move_user(user, Presence::Active);
                state.append_live([entry], true);
            },
            Transition::MemberLeft { channel, user, reason, new_owner, at } => {
                self.member_left(&channel, user, reason, new_owner, at);
            },
            Transition::PresenceChanged { channel, user, presence } => {
                let Some(state) = self.live_channel(&channel, "presence") else { return };
                state.partition_mut().move_user(user, presence);
            },
            Transition::MessageAppended { channel, entry, from_self, mentions_self } => {
                let entry_id = entry.id;
                let Some(state) = self.live_channel(&channel, "message") else { return };
                let added = state.append_live([entry], !from_self);
                if added > 0 && mentions_self && !from_self && !state.activated() {
                    actions.push(SyncAction::Mentioned { channel, entry: entry_id });
                }
            },
            Transition::HistoryLoaded { channel, entries, limit } => {
                let Some(state) = self.live_channel(&channel, "history") else { return };
                state.prepend_history(entries, limit);
            },
            Transition::UserListLoaded { channel, users } => {
                let Some(state) = self.live_channel(&channel, "user list") else { return };
                state.partition_mut().seed_offline(users);
            },
        }
    }

    fn seed(&mut self, snapshot: ChannelSnapshot, actions: &mut Vec<SyncAction>) {
        let ChannelSnapshot { channel, active, owner, at } = snapshot;
        if let Some(state) = self.channels.get_mut(&channel) {
            // Already established: refresh presence, keep history.
            let state = Arc::make_mut(state);
            state.set_owner(owner);
            for user in active {
                state.partition_mut().move_user(user, Presence::Active);
            }
            return;
        }

        let entry = self.local_entry(at, EntryKind::SelfJoin);
        let mut state = ChannelState::new(channel.clone(), self.config.history_retention);
        state.set_owner(owner);
        for user in active {
            state.partition_mut().insert(Presence::Active, user);
        }
        state.append_quiet([entry]);

        tracing::info!(%channel, "joined channel");
        self.order.push(channel.clone());
        self.channels.insert(channel.clone(), Arc::new(state));
        actions.push(SyncAction::ChannelJoined { channel });
    }

    fn destroy(
        &mut self,
        channel: &ChannelId,
        reason: RemovalReason,
        actions: &mut Vec<SyncAction>,
    ) {
        let Some(state) = self.channels.remove(channel) else {
            tracing::debug!(%channel, "destroy for unknown channel");
            return;
        };
        self.order.retain(|id| id != channel);
        tracing::info!(%channel, ?reason, "left channel");
        actions.push(SyncAction::ChannelRemoved { channel: state.id().clone(), reason });
    }

    fn finish(&mut self, operation: Operation, channel: &ChannelId) {
        if operation == Operation::Join {
            self.joining.remove(channel);
            return;
        }
        let Some(state) = self.channels.get_mut(channel) else {
            tracing::debug!(
                %channel,
                operation = operation.name(),
                "settlement for unknown channel"
            );
            return;
        };
        let state = Arc::make_mut(state);
        match operation {
            Operation::Leave => state.set_leaving(false),
            Operation::SendMessage => state.finish_send(),
            Operation::LoadHistory { .. } => state.set_loading_history(false),
            Operation::LoadUserList => state.finish_user_list(),
            Operation::Join => {},
        }
    }

    fn member_left(
        &mut self,
        channel: &ChannelId,
        user: User,
        reason: LeaveReason,
        new_owner: Option<User>,
        at: Timestamp,
    ) {
        let mut entries =
            vec![self.local_entry(at, EntryKind::Leave { user: user.clone(), reason })];
        if let Some(owner) = &new_owner {
            entries.push(self.local_entry(at, EntryKind::NewOwner { user: owner.clone() }));
        }
        let Some(state) = self.live_channel(channel, "leave") else { return };
        state.partition_mut().remove_everywhere(&user);
        state.set_owner(new_owner.map(|owner| owner.id));
        state.append_live(entries, true);
    }

    /// Mutable state for an event; events for unknown channels are dropped.
    fn live_channel(&mut self, channel: &ChannelId, what: &str) -> Option<&mut ChannelState> {
        match self.channels.get_mut(channel) {
            Some(state) => Some(Arc::make_mut(state)),
            None => {
                tracing::debug!(%channel, what, "event for unknown channel dropped");
                None
            },
        }
    }

    fn local_entry(&mut self, at: Timestamp, kind: EntryKind) -> TimelineEntry {
        self.next_entry += 1;
        TimelineEntry::new(EntryId::Local(self.next_entry), at, kind)
    }
}
