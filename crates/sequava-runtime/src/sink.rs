//! The seam between the scheduler and the transport that reaches the
//! controller. The runtime only ever hands a sink whole release batches;
//! transports (HTTP, serial) live outside this crate.

use crate::wire::CommandBatch;
use async_trait::async_trait;
use sequava_core::model::ActionValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

// ─── ReleasedCommand ──────────────────────────────────────────────────────

/// A command the scheduler has released, stamped with the actual release
/// time relative to execution start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedCommand {
    pub command_id: String,
    pub device_id: String,
    #[serde(flatten)]
    pub value: ActionValue,
    pub duration_ms: u64,
    pub released_at_ms: u64,
}

// ─── SinkError ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("sink unreachable: {0}")]
    Unreachable(String),

    #[error("sink rejected batch: {0}")]
    Rejected(String),
}

// ─── CommandSink ──────────────────────────────────────────────────────────

/// Accepts release batches bound for the controller.
///
/// A failed `send` is reported as a dispatch failure for every command in
/// the batch; the scheduler keeps going unless failures are consecutive
/// past the policy budget.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, batch: &CommandBatch) -> Result<(), SinkError>;
}

// ─── ChannelSink ──────────────────────────────────────────────────────────

/// Forwards batches into a Tokio mpsc channel.
///
/// The production transport consumes the receiver end; tests use it to
/// observe exactly what the scheduler released and when.
pub struct ChannelSink {
    tx: mpsc::Sender<CommandBatch>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CommandBatch>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl CommandSink for ChannelSink {
    async fn send(&self, batch: &CommandBatch) -> Result<(), SinkError> {
        self.tx
            .send(batch.clone())
            .await
            .map_err(|_| SinkError::Unreachable("batch receiver dropped".into()))
    }
}

// ─── LogSink ──────────────────────────────────────────────────────────────

/// Logs every batch through `tracing` instead of delivering it anywhere.
/// Used for dry runs.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl CommandSink for LogSink {
    async fn send(&self, batch: &CommandBatch) -> Result<(), SinkError> {
        for cmd in &batch.cmds {
            tracing::info!(
                batch = %batch.id,
                offset_ms = batch.ts,
                dev = %cmd.dev,
                act = ?cmd.act,
                val = cmd.val,
                dur = cmd.dur,
                "release"
            );
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
