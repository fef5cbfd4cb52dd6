//! Single-writer engine loop.
//!
//! The [`Engine`] owns the [`ChatRegistry`] and is its only writer. It
//! multiplexes three inputs:
//!
//! - commands from [`EngineHandle`]s (Begin, activate, deactivate)
//! - inbound push traffic (channel events, connection resets)
//! - settlements of requests running on spawned tasks
//!
//! Each input is applied to completion before the next one is taken, so
//! transitions for a channel happen in the order this loop receives them.
//! After every input a fresh snapshot is published; observers only ever see
//! whole transitions.

use std::{collections::HashMap, sync::Arc};

use chansync_core::{
    ChatRegistry, FetchError, Inbound, RequestId, RequestTicket, Response, SyncAction, SyncError,
    User,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::EngineConfig,
    error::EngineError,
    handle::{Begin, Command, EngineHandle, RequestHandle},
    transport::RequestLayer,
};

/// Result of a spawned request task.
#[derive(Debug)]
enum Settlement {
    /// The request layer returned.
    Finished { id: RequestId, result: Result<Response, FetchError> },
    /// The token fired before the request layer returned.
    Canceled { id: RequestId },
}

/// Bookkeeping for a request between Begin and settlement.
struct InFlight {
    token: CancellationToken,
    reply: oneshot::Sender<Result<(), FetchError>>,
}

/// Engine that drives a [`ChatRegistry`] from requests and push events.
///
/// # Type Parameters
///
/// - `R`: request layer used to reach the server
pub struct Engine<R: RequestLayer> {
    registry: ChatRegistry,
    layer: Arc<R>,
    commands: mpsc::Receiver<Command>,
    inbound: mpsc::Receiver<Inbound>,
    inbound_open: bool,
    settlements_tx: mpsc::UnboundedSender<Settlement>,
    settlements_rx: mpsc::UnboundedReceiver<Settlement>,
    in_flight: HashMap<RequestId, InFlight>,
    snapshots: watch::Sender<Arc<ChatRegistry>>,
    notifications: broadcast::Sender<SyncAction>,
    shutdown: CancellationToken,
}

impl<R: RequestLayer> Engine<R> {
    /// Create an engine and a handle to it.
    ///
    /// `inbound` is fed by the push-event layer. The engine does nothing
    /// until [`Engine::run`] is awaited.
    pub fn new(
        local: User,
        config: EngineConfig,
        layer: R,
        inbound: mpsc::Receiver<Inbound>,
    ) -> (Self, EngineHandle) {
        let registry = ChatRegistry::new(local, config.sync);
        let (commands_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (settlements_tx, settlements_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(Arc::new(registry.clone()));
        let (notifications, _) = broadcast::channel(config.notification_buffer.max(1));
        let shutdown = CancellationToken::new();

        let handle =
            EngineHandle::new(commands_tx, snapshot_rx, notifications.clone(), shutdown.clone());
        let engine = Self {
            registry,
            layer: Arc::new(layer),
            commands,
            inbound,
            inbound_open: true,
            settlements_tx,
            settlements_rx,
            in_flight: HashMap::new(),
            snapshots,
            notifications,
            shutdown,
        };
        (engine, handle)
    }

    /// Run the engine loop.
    ///
    /// Returns when every handle has been dropped or
    /// [`EngineHandle::shutdown`] is called. In-flight requests are canceled
    /// on the way out.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for fatal conditions.
    pub async fn run(mut self) -> Result<(), EngineError> {
        tracing::info!(user = %self.registry.local_user().id, "sync engine started");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(settlement) = self.settlements_rx.recv() => self.handle_settlement(settlement),

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },

                inbound = self.inbound.recv(), if self.inbound_open => match inbound {
                    Some(inbound) => self.handle_inbound(inbound),
                    None => {
                        tracing::warn!("push-event layer closed");
                        self.inbound_open = false;
                    },
                },
            }
            self.publish();
        }

        for (_, flight) in self.in_flight.drain() {
            flight.token.cancel();
        }
        tracing::info!("sync engine stopped");
        Ok(())
    }

    /// Current registry state.
    pub fn registry(&self) -> &ChatRegistry {
        &self.registry
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Begin { begin, reply } => {
                let result = self.begin(begin);
                if reply.send(result).is_err() {
                    tracing::debug!("caller dropped before Begin was acknowledged");
                }
            },
            Command::Activate { channel, reply } => {
                let _ = reply.send(self.registry.activate(&channel));
            },
            Command::Deactivate { channel, reply } => {
                let _ = reply.send(self.registry.deactivate(&channel));
            },
        }
    }

    fn begin(&mut self, begin: Begin) -> Result<RequestHandle, SyncError> {
        let ticket = match begin {
            Begin::Join(channel) => self.registry.begin_join(channel)?,
            Begin::Leave(channel) => self.registry.begin_leave(&channel)?,
            Begin::SendMessage(channel, body) => self.registry.begin_send(&channel, body)?,
            Begin::LoadHistory(channel, limit) => {
                self.registry.begin_load_history(&channel, limit)?
            },
            Begin::LoadUserList(channel) => self.registry.begin_load_user_list(&channel)?,
        };

        let id = ticket.id;
        let token = self.shutdown.child_token();
        let (reply, outcome) = oneshot::channel();
        self.in_flight.insert(id, InFlight { token: token.clone(), reply });
        self.spawn_call(ticket, token.clone());

        Ok(RequestHandle::new(id, token, outcome))
    }

    fn spawn_call(&self, ticket: RequestTicket, token: CancellationToken) {
        let RequestTicket { id, request } = ticket;
        let layer = Arc::clone(&self.layer);
        let settlements = self.settlements_tx.clone();

        tracing::debug!(
            request = %id,
            operation = request.operation().name(),
            channel = %request.channel(),
            "request issued"
        );
        tokio::spawn(async move {
            let settlement = tokio::select! {
                () = token.cancelled() => Settlement::Canceled { id },
                result = layer.call(request, token.clone()) => Settlement::Finished { id, result },
            };
            // The engine may already be gone; nothing left to settle then.
            let _ = settlements.send(settlement);
        });
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        match settlement {
            Settlement::Canceled { id } => self.cancel(id),
            Settlement::Finished { id, result } => {
                let Some(flight) = self.in_flight.get(&id) else {
                    tracing::debug!(request = %id, "settlement for unknown request dropped");
                    return;
                };
                if flight.token.is_cancelled() {
                    // Canceled after the layer returned but before we got here.
                    self.cancel(id);
                    return;
                }

                let applied = match result {
                    Ok(response) => self.registry.succeed(id, response),
                    Err(error) => self.registry.fail(id, error),
                };
                match applied {
                    Ok(actions) => self.dispatch(actions),
                    Err(e) => {
                        tracing::warn!(request = %id, error = %e, "settlement rejected");
                        self.in_flight.remove(&id);
                    },
                }
            },
        }
    }

    fn cancel(&mut self, id: RequestId) {
        // Dropping the reply sender resolves the caller's outcome to `None`.
        self.in_flight.remove(&id);
        self.registry.cancel(id);
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        let actions = self.registry.apply_inbound(inbound);
        // A reset settles requests whose calls are still running.
        let stale = actions.iter().filter_map(|action| match action {
            SyncAction::RequestSettled { request, .. } => self.in_flight.get(request),
            _ => None,
        });
        for flight in stale {
            flight.token.cancel();
        }
        self.dispatch(actions);
    }

    /// Resolve the callers of settled requests, then notify subscribers.
    fn dispatch(&mut self, actions: Vec<SyncAction>) {
        for action in &actions {
            let SyncAction::RequestSettled { request, outcome, .. } = action else {
                continue;
            };
            if let Some(flight) = self.in_flight.remove(request) {
                let _ = flight.reply.send(outcome.clone());
            }
        }
        for action in actions {
            // No subscribers is fine.
            let _ = self.notifications.send(action);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(Arc::new(self.registry.clone()));
    }
}
