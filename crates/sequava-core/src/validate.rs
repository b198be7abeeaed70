//! Structural validation and device-conflict detection.
//!
//! Errors block compilation and execution; warnings are advisory and never
//! block. Every problem in the tree is enumerated in one pass so the
//! operator can fix everything at once, each with a machine-readable path
//! such as `steps[2].parallel_loops[0].sub_steps[1]`.

use crate::device::DeviceRegistry;
use crate::model::{Action, DelayAction, ParallelLoop, SequenceItem, Step, SubStep, Task};
use crate::policy::EnginePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// StructuralError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyName,
    UnknownDevice { device_id: String },
    KindMismatch { device_id: String },
    ValueOutOfRange { value: u8 },
    ZeroDuration,
    ZeroDelay,
    ZeroIterations,
}

/// A malformed-task finding. Blocks compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralError {
    /// Location in the task tree, e.g. `steps[0].actions[1]`.
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// ValidationWarning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarningKind {
    EmptyStep,
    EmptySubStep,
    EmptyLoop,
    ExcessiveIterations { iterations: u32 },
    LongDuration { duration_ms: u64 },
    DeepDelayNesting { depth: u32 },
    DeviceConflict {
        step_index: usize,
        device_id: String,
        uses: usize,
    },
}

/// An advisory finding. Surfaced to the operator, never blocks `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub kind: WarningKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<StructuralError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn conflict_warnings(&self) -> impl Iterator<Item = &ValidationWarning> {
        self.warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::DeviceConflict { .. }))
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Validate a task against a device registry with default policy limits.
pub fn validate(task: &Task, devices: &DeviceRegistry) -> ValidationReport {
    validate_with_policy(task, devices, &EnginePolicy::default())
}

/// Validate with explicit policy limits.
pub fn validate_with_policy(
    task: &Task,
    devices: &DeviceRegistry,
    policy: &EnginePolicy,
) -> ValidationReport {
    let mut v = Walker {
        devices,
        policy,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    v.task(task);
    let is_valid = v.errors.is_empty();
    ValidationReport {
        is_valid,
        errors: v.errors,
        warnings: v.warnings,
    }
}

struct Walker<'a> {
    devices: &'a DeviceRegistry,
    policy: &'a EnginePolicy,
    errors: Vec<StructuralError>,
    warnings: Vec<ValidationWarning>,
}

impl Walker<'_> {
    fn error(&mut self, path: String, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(StructuralError {
            path,
            kind,
            message: message.into(),
        });
    }

    fn warn(&mut self, path: String, kind: WarningKind, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path,
            kind,
            message: message.into(),
        });
    }

    fn task(&mut self, task: &Task) {
        if task.name.trim().is_empty() {
            self.error("task".into(), ErrorKind::EmptyName, "task name is empty");
        }
        for (i, step) in task.steps.iter().enumerate() {
            self.step(step, i);
        }
        for (i, step) in task.steps.iter().enumerate() {
            self.step_conflicts(step, i);
        }
    }

    fn step(&mut self, step: &Step, index: usize) {
        let path = format!("steps[{index}]");
        if step.name.trim().is_empty() {
            self.error(
                path.clone(),
                ErrorKind::EmptyName,
                format!("step {index} has an empty name"),
            );
        }
        if step.actions.is_empty() && step.parallel_loops.is_empty() {
            self.warn(
                path.clone(),
                WarningKind::EmptyStep,
                format!("step '{}' contains no work", step.name),
            );
        }
        for (i, item) in step.actions.iter().enumerate() {
            self.item(item, &format!("{path}.actions[{i}]"), 0);
        }
        for (i, pl) in step.parallel_loops.iter().enumerate() {
            self.parallel_loop(pl, &format!("{path}.parallel_loops[{i}]"));
        }
    }

    fn item(&mut self, item: &SequenceItem, path: &str, delay_depth: u32) {
        match item {
            SequenceItem::Action(a) => self.action(a, path),
            SequenceItem::Delay(d) => self.delay(d, path, delay_depth),
        }
    }

    fn action(&mut self, action: &Action, path: &str) {
        match self.devices.get(&action.device_id) {
            None => self.error(
                path.to_string(),
                ErrorKind::UnknownDevice {
                    device_id: action.device_id.clone(),
                },
                format!("unknown device '{}'", action.device_id),
            ),
            Some(device) => {
                if action.value.device_kind() != device.kind {
                    self.error(
                        path.to_string(),
                        ErrorKind::KindMismatch {
                            device_id: action.device_id.clone(),
                        },
                        format!(
                            "{} value sent to {} device '{}'",
                            action.value.device_kind(),
                            device.kind,
                            device.id
                        ),
                    );
                }
            }
        }
        if let crate::model::ActionValue::Power(p) = action.value {
            if p > 100 {
                self.error(
                    path.to_string(),
                    ErrorKind::ValueOutOfRange { value: p },
                    format!("power {p}% is outside 0..=100"),
                );
            }
        }
        if action.duration_ms == 0 {
            self.error(
                path.to_string(),
                ErrorKind::ZeroDuration,
                "action duration must be positive",
            );
        } else if action.duration_ms > self.policy.long_duration_warn_ms {
            self.warn(
                path.to_string(),
                WarningKind::LongDuration {
                    duration_ms: action.duration_ms,
                },
                format!("action runs for {} ms", action.duration_ms),
            );
        }
    }

    fn delay(&mut self, delay: &DelayAction, path: &str, depth: u32) {
        if delay.delay_ms == 0 {
            self.error(
                path.to_string(),
                ErrorKind::ZeroDelay,
                "delay must be positive",
            );
        } else if delay.delay_ms > self.policy.long_duration_warn_ms {
            self.warn(
                path.to_string(),
                WarningKind::LongDuration {
                    duration_ms: delay.delay_ms,
                },
                format!("delay pauses for {} ms", delay.delay_ms),
            );
        }
        let depth = depth + 1;
        if depth > self.policy.max_delay_nesting {
            self.warn(
                path.to_string(),
                WarningKind::DeepDelayNesting { depth },
                format!(
                    "delays nested {depth} deep (policy cap {})",
                    self.policy.max_delay_nesting
                ),
            );
        }
        for (i, item) in delay.actions.iter().enumerate() {
            self.item(item, &format!("{path}.actions[{i}]"), depth);
        }
        for (i, pl) in delay.parallel_loops.iter().enumerate() {
            self.parallel_loop(pl, &format!("{path}.parallel_loops[{i}]"));
        }
    }

    fn parallel_loop(&mut self, pl: &ParallelLoop, path: &str) {
        if pl.iterations == 0 {
            self.error(
                path.to_string(),
                ErrorKind::ZeroIterations,
                "loop must run at least one iteration",
            );
        } else if pl.iterations > self.policy.iteration_warn_threshold {
            self.warn(
                path.to_string(),
                WarningKind::ExcessiveIterations {
                    iterations: pl.iterations,
                },
                format!("loop repeats {} times", pl.iterations),
            );
        }
        if pl.sub_steps.iter().all(|s| s.actions.is_empty()) {
            self.warn(
                path.to_string(),
                WarningKind::EmptyLoop,
                "loop contains no work",
            );
        }
        for (i, sub) in pl.sub_steps.iter().enumerate() {
            self.sub_step(sub, &format!("{path}.sub_steps[{i}]"));
        }
    }

    fn sub_step(&mut self, sub: &SubStep, path: &str) {
        if sub.name.trim().is_empty() {
            self.error(
                path.to_string(),
                ErrorKind::EmptyName,
                "sub-step has an empty name",
            );
        }
        if sub.actions.is_empty() {
            self.warn(
                path.to_string(),
                WarningKind::EmptySubStep,
                format!("sub-step '{}' contains no work", sub.name),
            );
        }
        for (i, item) in sub.actions.iter().enumerate() {
            self.item(item, &format!("{path}.actions[{i}]"), 0);
        }
    }

    // Device double-use within one step. Step children are parallel, so two
    // actions on the same device race; the later dispatch wins. Advisory
    // only: the operator may intend an override via explicit delays.
    fn step_conflicts(&mut self, step: &Step, index: usize) {
        let mut uses: BTreeMap<String, usize> = BTreeMap::new();
        for item in &step.actions {
            collect_device_uses(item, &mut uses);
        }
        for pl in &step.parallel_loops {
            collect_loop_uses(pl, &mut uses);
        }
        for (device_id, count) in uses {
            if count > 1 {
                self.warn(
                    format!("steps[{index}]"),
                    WarningKind::DeviceConflict {
                        step_index: index,
                        device_id: device_id.clone(),
                        uses: count,
                    },
                    format!(
                        "step {index} ('{}') uses device '{device_id}' {count} times in parallel scope",
                        step.name
                    ),
                );
            }
        }
    }
}

fn collect_device_uses(item: &SequenceItem, uses: &mut BTreeMap<String, usize>) {
    match item {
        SequenceItem::Action(a) => {
            *uses.entry(a.device_id.clone()).or_insert(0) += 1;
        }
        SequenceItem::Delay(d) => {
            for child in &d.actions {
                collect_device_uses(child, uses);
            }
            for pl in &d.parallel_loops {
                collect_loop_uses(pl, uses);
            }
        }
    }
}

fn collect_loop_uses(pl: &ParallelLoop, uses: &mut BTreeMap<String, usize>) {
    for sub in &pl.sub_steps {
        for item in &sub.actions {
            collect_device_uses(item, uses);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
