//! Scripted request layer.
//!
//! [`ScriptedRequestLayer`] stands in for the server in engine tests. Replies
//! are queued per operation kind and consumed in FIFO order. A reply can be
//! held behind a [`Gate`] so a test controls exactly when the settlement
//! reaches the engine, which is how cancellation races are reproduced.
//!
//! Calls without a scripted reply fail with a transport error.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chansync_core::{FetchError, Operation, Request, Response};
use chansync_engine::{CancellationToken, RequestLayer};
use tokio::sync::Notify;

type Reply = Result<Response, FetchError>;

/// Releases a held reply.
#[derive(Debug, Clone)]
pub struct Gate {
    notify: Arc<Notify>,
}

impl Gate {
    fn new() -> Self {
        Self { notify: Arc::new(Notify::new()) }
    }

    /// Let the held reply through. Releasing before the call starts waiting
    /// is fine.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

#[derive(Debug)]
enum Scripted {
    Ready(Reply),
    Held(Gate, Reply),
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<&'static str, VecDeque<Scripted>>,
    calls: Vec<Request>,
    canceled: usize,
}

/// Request layer that replies from a script.
///
/// Cloning shares the script, so a test keeps one clone and hands another to
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRequestLayer {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRequestLayer {
    /// Create a layer with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an immediate reply for the next call of `operation`'s kind.
    pub fn respond(&self, operation: Operation, reply: Reply) {
        self.push(operation, Scripted::Ready(reply));
    }

    /// Queue a reply that is only delivered once the returned gate is
    /// released.
    pub fn hold(&self, operation: Operation, reply: Reply) -> Gate {
        let gate = Gate::new();
        self.push(operation, Scripted::Held(gate.clone(), reply));
        gate
    }

    /// Every request received so far, in call order.
    pub fn calls(&self) -> Vec<Request> {
        self.lock().calls.clone()
    }

    /// Number of held calls that observed cancellation before release.
    pub fn canceled(&self) -> usize {
        self.lock().canceled
    }

    fn push(&self, operation: Operation, scripted: Scripted) {
        self.lock().replies.entry(operation.name()).or_default().push_back(scripted);
    }

    fn next(&self, request: &Request) -> Scripted {
        let mut script = self.lock();
        script.calls.push(request.clone());
        let name = request.operation().name();
        script.replies.get_mut(name).and_then(VecDeque::pop_front).unwrap_or_else(|| {
            Scripted::Ready(Err(FetchError::transport(format!("no scripted reply for {name}"))))
        })
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RequestLayer for ScriptedRequestLayer {
    fn call(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Response, FetchError>> + Send {
        tracing::trace!(
            operation = request.operation().name(),
            channel = %request.channel(),
            "scripted call"
        );
        let scripted = self.next(&request);
        let script = Arc::clone(&self.script);
        async move {
            match scripted {
                Scripted::Ready(reply) => reply,
                Scripted::Held(gate, reply) => {
                    tokio::select! {
                        () = gate.notify.notified() => reply,
                        () = cancel.cancelled() => {
                            script.lock().unwrap_or_else(PoisonError::into_inner).canceled += 1;
                            Err(FetchError::transport("canceled"))
                        },
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chansync_core::ChannelId;

    use super::*;

    fn leave() -> Request {
        Request::Leave { channel: ChannelId::new("abc") }
    }

    #[tokio::test]
    async fn replies_in_fifo_order() {
        let layer = ScriptedRequestLayer::new();
        layer.respond(Operation::Leave, Ok(Response::Left));
        layer.respond(Operation::Leave, Err(FetchError::transport("down")));

        let token = CancellationToken::new();
        assert_eq!(layer.call(leave(), token.clone()).await, Ok(Response::Left));
        assert!(layer.call(leave(), token.clone()).await.is_err());
        assert_eq!(layer.calls().len(), 2);
    }

    #[tokio::test]
    async fn unscripted_call_fails() {
        let layer = ScriptedRequestLayer::new();
        let result = layer.call(leave(), CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn held_reply_waits_for_gate() {
        let layer = ScriptedRequestLayer::new();
        let gate = layer.hold(Operation::Leave, Ok(Response::Left));
        gate.release();

        assert_eq!(layer.call(leave(), CancellationToken::new()).await, Ok(Response::Left));
    }

    #[tokio::test]
    async fn held_reply_observes_cancellation() {
        let layer = ScriptedRequestLayer::new();
        let _gate = layer.hold(Operation::Leave, Ok(Response::Left));
        let token = CancellationToken::new();
        token.cancel();

        assert!(layer.call(leave(), token).await.is_err());
        assert_eq!(layer.canceled(), 1);
    }
}
