//! The scheduling loop and the single-execution slot.
//!
//! One Tokio task per execution wakes at each distinct offset in the
//! compiled timeline and releases the due commands as one batch. Only one
//! execution runs at a time: starting a new task stops the previous run
//! (stop-and-replace). `stop` races safely with the loop's own wake-up —
//! the cancel flag is a watch channel checked both in `select!` and again
//! before every release, so nothing fires after a stop and nothing fires
//! twice. Commands already handed to the sink are never recalled.

use crate::error::RuntimeError;
use crate::sink::{CommandSink, ReleasedCommand};
use crate::wire::CommandBatch;
use sequava_core::policy::EnginePolicy;
use sequava_core::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

// ─── ExecutionState / ExecutionStatus ─────────────────────────────────────

/// Lifecycle of one execution.
///
/// Transitions: `Idle → Running → Completed | Stopped | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Stopped | ExecutionState::Failed
        )
    }
}

/// Snapshot polled by the UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    pub is_running: bool,
    pub total_commands: usize,
    pub executed_commands: usize,
    pub failed_commands: usize,
    /// Offset of the next pending release, `None` once the schedule is done.
    pub next_offset_ms: Option<u64>,
    /// Set when an internal invariant violation aborted the execution.
    pub fault: Option<String>,
}

impl ExecutionStatus {
    fn new(total_commands: usize, next_offset_ms: Option<u64>) -> Self {
        Self {
            state: ExecutionState::Idle,
            is_running: false,
            total_commands,
            executed_commands: 0,
            failed_commands: 0,
            next_offset_ms,
            fault: None,
        }
    }
}

// ─── DispatchFailure ──────────────────────────────────────────────────────

/// One command the sink failed to take. Logged and accumulated; the
/// schedule continues unless failures are consecutive past the budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub command_id: String,
    pub offset_ms: u64,
    pub error: String,
}

// ─── ExecutionHandle ──────────────────────────────────────────────────────

/// Cheap-to-clone handle onto a running (or finished) execution.
#[derive(Clone)]
pub struct ExecutionHandle {
    id: Uuid,
    cancel: Arc<watch::Sender<bool>>,
    status_rx: watch::Receiver<ExecutionStatus>,
    failures: Arc<StdMutex<Vec<DispatchFailure>>>,
}

impl ExecutionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status snapshot. Never blocks the scheduling loop.
    pub fn status(&self) -> ExecutionStatus {
        self.status_rx.borrow().clone()
    }

    /// Request cancellation. Idempotent; pending offsets are never fired
    /// after this returns, but already-released commands stand.
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    /// Accumulated dispatch failures so far.
    pub fn failures(&self) -> Vec<DispatchFailure> {
        self.failures.lock().expect("failure log poisoned").clone()
    }

    /// Wait until the execution reaches a terminal state.
    pub async fn wait(&self) -> ExecutionStatus {
        let mut rx = self.status_rx.clone();
        loop {
            let status = rx.borrow().clone();
            if status.state.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

// ─── Executor ─────────────────────────────────────────────────────────────

/// Owns the system-wide "one execution at a time" slot.
pub struct Executor {
    sink: Arc<dyn CommandSink>,
    policy: EnginePolicy,
    current: Mutex<Option<ExecutionHandle>>,
}

impl Executor {
    pub fn new(sink: Arc<dyn CommandSink>, policy: EnginePolicy) -> Self {
        Self {
            sink,
            policy,
            current: Mutex::new(None),
        }
    }

    /// Start executing a compiled timeline.
    ///
    /// If an execution is already running it is stopped first and replaced
    /// (the slot swap and the cancel happen under the slot lock, so two
    /// concurrent `start` calls cannot both end up running).
    ///
    /// `estimate_hint_ms` is an operator-supplied display figure; the
    /// schedule itself always comes from the timeline.
    pub async fn start(
        &self,
        timeline: Timeline,
        estimate_hint_ms: Option<u64>,
    ) -> ExecutionHandle {
        let mut slot = self.current.lock().await;
        if let Some(prev) = slot.take() {
            tracing::info!(execution = %prev.id(), "stopping previous execution");
            prev.stop();
        }

        if let Some(hint) = estimate_hint_ms {
            tracing::info!(
                task = %timeline.task_name,
                hint_ms = hint,
                compiled_ms = timeline.total_duration_ms,
                "operator duration hint"
            );
        }

        let handle = spawn_execution(timeline, Arc::clone(&self.sink), &self.policy);
        *slot = Some(handle.clone());
        handle
    }

    /// Stop the current execution, if any.
    pub async fn stop(&self) -> Result<ExecutionHandle, RuntimeError> {
        let mut slot = self.current.lock().await;
        match slot.take() {
            Some(handle) => {
                handle.stop();
                Ok(handle)
            }
            None => Err(RuntimeError::NotRunning),
        }
    }

    /// Status of the current execution slot.
    pub async fn status(&self) -> Option<ExecutionStatus> {
        self.current.lock().await.as_ref().map(|h| h.status())
    }
}

// ─── Scheduling loop ──────────────────────────────────────────────────────

fn spawn_execution(
    timeline: Timeline,
    sink: Arc<dyn CommandSink>,
    policy: &EnginePolicy,
) -> ExecutionHandle {
    let batches = timeline.batches();
    let first_offset = batches.first().map(|(off, _)| *off);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (status_tx, status_rx) =
        watch::channel(ExecutionStatus::new(timeline.len(), first_offset));
    let failures = Arc::new(StdMutex::new(Vec::new()));

    let handle = ExecutionHandle {
        id: Uuid::new_v4(),
        cancel: Arc::new(cancel_tx),
        status_rx,
        failures: Arc::clone(&failures),
    };

    let id = handle.id;
    let retry_budget = policy.dispatch_retry_budget;
    tokio::spawn(async move {
        run_schedule(
            id,
            timeline,
            batches,
            sink,
            cancel_rx,
            status_tx,
            failures,
            retry_budget,
        )
        .await;
    });

    handle
}

#[allow(clippy::too_many_arguments)]
async fn run_schedule(
    id: Uuid,
    timeline: Timeline,
    batches: Vec<(u64, std::ops::Range<usize>)>,
    sink: Arc<dyn CommandSink>,
    mut cancel_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<ExecutionStatus>,
    failures: Arc<StdMutex<Vec<DispatchFailure>>>,
    retry_budget: u32,
) {
    let started = Instant::now();
    let mut consecutive_failures = 0u32;
    let mut last_offset: Option<u64> = None;

    status_tx.send_modify(|s| {
        s.state = ExecutionState::Running;
        s.is_running = true;
    });
    tracing::info!(execution = %id, task = %timeline.task_name, commands = timeline.len(), "execution started");

    for (i, (offset, range)) in batches.iter().enumerate() {
        // Offsets out of compile are strictly increasing; a regression here
        // is an internal fault, not a schedulable state.
        if last_offset.is_some_and(|prev| *offset <= prev) {
            let fault = RuntimeError::Fault(format!("non-increasing batch offset {offset}"));
            tracing::error!(execution = %id, error = %fault, "aborting execution");
            status_tx.send_modify(|s| s.fault = Some(fault.to_string()));
            finish(&status_tx, ExecutionState::Failed);
            return;
        }
        last_offset = Some(*offset);

        let due = started + Duration::from_millis(*offset);
        loop {
            tokio::select! {
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        tracing::info!(execution = %id, offset, "stopped before release");
                        finish(&status_tx, ExecutionState::Stopped);
                        return;
                    }
                }
                _ = tokio::time::sleep_until(due) => break,
            }
        }
        // The timer may win the select in the same instant a stop lands;
        // re-check so nothing is released after a stop.
        if *cancel_rx.borrow() {
            finish(&status_tx, ExecutionState::Stopped);
            return;
        }

        let released_at = started.elapsed().as_millis() as u64;
        let released: Vec<ReleasedCommand> = timeline.commands[range.clone()]
            .iter()
            .map(|c| ReleasedCommand {
                command_id: c.command_id.clone(),
                device_id: c.device_id.clone(),
                value: c.value,
                duration_ms: c.duration_ms,
                released_at_ms: released_at,
            })
            .collect();
        let batch = CommandBatch::new(*offset, &released);

        let next_offset = batches.get(i + 1).map(|(off, _)| *off);
        match sink.send(&batch).await {
            Ok(()) => {
                consecutive_failures = 0;
                status_tx.send_modify(|s| {
                    s.executed_commands += released.len();
                    s.next_offset_ms = next_offset;
                });
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(execution = %id, offset, error = %e, "dispatch failure");
                {
                    let mut log = failures.lock().expect("failure log poisoned");
                    for cmd in &released {
                        log.push(DispatchFailure {
                            command_id: cmd.command_id.clone(),
                            offset_ms: *offset,
                            error: e.to_string(),
                        });
                    }
                }
                status_tx.send_modify(|s| {
                    s.failed_commands += released.len();
                    s.next_offset_ms = next_offset;
                });
                if consecutive_failures >= retry_budget {
                    tracing::error!(
                        execution = %id,
                        consecutive_failures,
                        "retry budget exhausted"
                    );
                    finish(&status_tx, ExecutionState::Failed);
                    return;
                }
            }
        }
    }

    tracing::info!(execution = %id, "execution completed");
    finish(&status_tx, ExecutionState::Completed);
}

fn finish(status_tx: &watch::Sender<ExecutionStatus>, state: ExecutionState) {
    status_tx.send_modify(|s| {
        s.state = state;
        s.is_running = false;
        s.next_offset_ms = None;
    });
}

// ─── Tests ────────────────────────────────────────────────────────────────
