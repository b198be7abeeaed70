//! Task tree data model.
//!
//! A `Task` is an ordered list of `Step`s; steps run serially while
//! everything directly inside one step runs in parallel. The leaves are
//! `Action`s (a single timed device command); `DelayAction` gates a parallel
//! bundle behind a pause, and `ParallelLoop` repeats a set of serial
//! `SubStep` lanes.
//!
//! Nodes are created through factory constructors that assign a fresh UUID,
//! and edited by whole-subtree replacement. No node is shared between two
//! parents, so the tree is acyclic by construction.

use crate::device::DeviceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Operator-authored task files may omit ids and timestamps; they are
// assigned at load the same way the factories assign them at creation.
fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// ActionValue
// ---------------------------------------------------------------------------

/// The payload of an action: a power percentage for PWM devices, or an
/// on/off state for digital devices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ActionValue {
    /// Power level in percent, 0..=100.
    Power(u8),
    /// Open/closed (or on/off) state.
    State(bool),
}

impl ActionValue {
    /// The device kind this value is compatible with.
    pub fn device_kind(self) -> DeviceKind {
        match self {
            ActionValue::Power(_) => DeviceKind::Pwm,
            ActionValue::State(_) => DeviceKind::Digital,
        }
    }

    /// Numeric form used on the wire: percent for PWM, 0/1 for digital.
    pub fn as_wire_value(self) -> u8 {
        match self {
            ActionValue::Power(p) => p,
            ActionValue::State(s) => u8::from(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single timed device command: drive `device_id` with `value` for
/// `duration_ms` milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default = "new_id")]
    pub id: String,
    pub device_id: String,
    #[serde(flatten)]
    pub value: ActionValue,
    pub duration_ms: u64,
    #[serde(default)]
    pub label: String,
}

impl Action {
    /// Create a PWM power action.
    pub fn power(device_id: impl Into<String>, percent: u8, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            value: ActionValue::Power(percent),
            duration_ms,
            label: String::new(),
        }
    }

    /// Create a digital state action.
    pub fn state(device_id: impl Into<String>, on: bool, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            value: ActionValue::State(on),
            duration_ms,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

// ---------------------------------------------------------------------------
// DelayAction
// ---------------------------------------------------------------------------

/// A timed gate: after `delay_ms`, all children start simultaneously.
///
/// Children may be further actions, nested delays, or parallel loops.
/// Loops inside a delay must not themselves contain loops; the validator
/// enforces that along with the policy nesting cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayAction {
    #[serde(default = "new_id")]
    pub id: String,
    pub delay_ms: u64,
    #[serde(default)]
    pub actions: Vec<SequenceItem>,
    #[serde(default)]
    pub parallel_loops: Vec<ParallelLoop>,
}

impl DelayAction {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            delay_ms,
            actions: Vec::new(),
            parallel_loops: Vec::new(),
        }
    }

    pub fn with_action(mut self, item: impl Into<SequenceItem>) -> Self {
        self.actions.push(item.into());
        self
    }

    pub fn with_loop(mut self, pl: ParallelLoop) -> Self {
        self.parallel_loops.push(pl);
        self
    }
}

// ---------------------------------------------------------------------------
// SequenceItem
// ---------------------------------------------------------------------------

/// An entry in an action list: either a leaf action or a delay gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceItem {
    Action(Action),
    Delay(DelayAction),
}

impl From<Action> for SequenceItem {
    fn from(a: Action) -> Self {
        SequenceItem::Action(a)
    }
}

impl From<DelayAction> for SequenceItem {
    fn from(d: DelayAction) -> Self {
        SequenceItem::Delay(d)
    }
}

// ---------------------------------------------------------------------------
// SubStep
// ---------------------------------------------------------------------------

/// One serial lane inside a loop iteration: its actions run one after
/// another. Loops cannot nest, so a sub-step never contains a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStep {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub actions: Vec<SequenceItem>,
}

impl SubStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, item: impl Into<SequenceItem>) -> Self {
        self.actions.push(item.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ParallelLoop
// ---------------------------------------------------------------------------

/// A repeated bundle of parallel sub-step lanes.
///
/// The bundle runs `iterations` times with `interval_ms` between repeats
/// only — `iterations = 3` has exactly two gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelLoop {
    #[serde(default = "new_id")]
    pub id: String,
    pub iterations: u32,
    #[serde(default)]
    pub interval_ms: u64,
    #[serde(default)]
    pub sub_steps: Vec<SubStep>,
}

impl ParallelLoop {
    pub fn new(iterations: u32, interval_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            iterations,
            interval_ms,
            sub_steps: Vec::new(),
        }
    }

    pub fn with_sub_step(mut self, sub: SubStep) -> Self {
        self.sub_steps.push(sub);
        self
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One phase of a task. Direct children (actions, delays, loops) all start
/// together; consecutive steps run serially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub actions: Vec<SequenceItem>,
    #[serde(default)]
    pub parallel_loops: Vec<ParallelLoop>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            actions: Vec::new(),
            parallel_loops: Vec::new(),
        }
    }

    pub fn with_action(mut self, item: impl Into<SequenceItem>) -> Self {
        self.actions.push(item.into());
        self
    }

    pub fn with_loop(mut self, pl: ParallelLoop) -> Self {
        self.parallel_loops.push(pl);
        self
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// The top-level, operator-authored command sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Mark the task as edited. Called after any subtree replacement.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
