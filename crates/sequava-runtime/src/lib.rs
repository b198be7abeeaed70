//! `sequava-runtime` — timed dispatch of compiled command timelines.
//!
//! # Architecture
//!
//! ```text
//! Timeline (from sequava-core)
//!     │
//!     ▼
//! Executor        ← single execution slot; start is stop-and-replace
//!     │              spawns one scheduling task per execution
//!     ▼
//! scheduling loop ← sleeps to each distinct offset, releases the due
//!     │              commands as one batch, race-safe with stop
//!     ▼
//! CommandSink     ← transport seam (channel, log; HTTP lives elsewhere)
//!     │              batches serialized in the controller wire format
//!     ▼
//! controller
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use sequava_runtime::{ChannelSink, Executor};
//! use sequava_core::policy::EnginePolicy;
//! use std::sync::Arc;
//!
//! let (sink, mut rx) = ChannelSink::new(32);
//! let executor = Executor::new(Arc::new(sink), EnginePolicy::default());
//! let handle = executor.start(timeline, None).await;
//! let status = handle.wait().await;
//! println!("{:?}: {} released", status.state, status.executed_commands);
//! ```

pub mod error;
pub mod executor;
pub mod sink;
pub mod wire;

pub use error::RuntimeError;
pub use executor::{
    DispatchFailure, ExecutionHandle, ExecutionState, ExecutionStatus, Executor,
};
pub use sink::{ChannelSink, CommandSink, LogSink, ReleasedCommand, SinkError};
pub use wire::{CommandBatch, WireAct, WireCommand};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RuntimeError>;
