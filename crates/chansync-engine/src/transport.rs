//! Request layer abstraction.
//!
//! The [`RequestLayer`] trait is the contract with whatever actually talks to
//! the server (HTTP, a socket RPC, a simulation). The engine never does I/O
//! itself; it hands each [`Request`] to the layer together with a
//! cancellation token and waits for the typed result.

use std::future::Future;

use chansync_core::{FetchError, Request, Response};
use tokio_util::sync::CancellationToken;

/// Issues requests to the server.
///
/// # Implementations
///
/// - **Production**: HTTP or RPC client owned by the embedding application
/// - **Tests**: `ScriptedRequestLayer` from the harness crate
pub trait RequestLayer: Send + Sync + 'static {
    /// Perform a request.
    ///
    /// Implementations should stop work promptly once `cancel` fires. The
    /// engine discards whatever a canceled call eventually returns.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for transport failures and server-reported
    /// rule violations.
    fn call(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Response, FetchError>> + Send;
}
