//! Async engine for channel synchronization
//!
//! Runs the sans-IO [`chansync_core::ChatRegistry`] behind a single-writer
//! loop so request settlements and push events from independent tasks are
//! applied one at a time, each to completion.
//!
//! # Components
//!
//! - [`Engine`]: owns the registry and multiplexes all inputs
//! - [`EngineHandle`]: cloneable operation surface and snapshot reader
//! - [`RequestHandle`]: one in-flight request (outcome, cancellation)
//! - [`RequestLayer`]: trait for the component that talks to the server
//!
//! # Example
//!
//! ```ignore
//! let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(256);
//! let (engine, handle) = Engine::new(me, EngineConfig::default(), layer, inbound_rx);
//! tokio::spawn(engine.run());
//!
//! let join = handle.join("rust").await?;
//! join.outcome().await;
//! let snapshot = handle.snapshot();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod engine;
mod error;
mod handle;
mod transport;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use handle::{EngineHandle, RequestHandle};
pub use tokio_util::sync::CancellationToken;
pub use transport::RequestLayer;
