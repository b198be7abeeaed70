//! Flattening a task tree into an absolute-offset command timeline.
//!
//! The compiler performs a depth-first walk carrying a base offset: steps
//! advance it serially by their own duration, parallel children share it,
//! delay gates shift it, sub-step lanes advance a local cursor, and loop
//! iterations stride by per-iteration duration plus interval. Each action
//! becomes exactly one command. Output is sorted by offset ascending with
//! traversal order as the tie-break, so compilation is deterministic.

use crate::device::DeviceRegistry;
use crate::duration::{item_duration, loop_iteration_duration, step_duration, task_duration};
use crate::error::{CoreError, Result};
use crate::model::{ActionValue, DelayAction, ParallelLoop, SequenceItem, SubStep, Task};
use crate::validate::validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ScheduledCommand
// ---------------------------------------------------------------------------

/// One device command pinned to an absolute offset from execution start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    /// Milliseconds from execution start.
    pub offset_ms: u64,
    pub device_id: String,
    #[serde(flatten)]
    pub value: ActionValue,
    /// How long the device holds the value (device-side auto-off).
    pub duration_ms: u64,
    /// Fresh per compilation; not stable across recompiles.
    pub command_id: String,
    /// Traversal order, used as the tie-break at equal offsets.
    pub seq: u64,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// The compiled, offset-ordered command schedule for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub task_id: String,
    pub task_name: String,
    pub total_duration_ms: u64,
    pub commands: Vec<ScheduledCommand>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands grouped into release batches, one per distinct offset.
    /// Returned as `(offset_ms, index range)` over the sorted command list.
    pub fn batches(&self) -> Vec<(u64, std::ops::Range<usize>)> {
        let mut out = Vec::new();
        let mut start = 0;
        while start < self.commands.len() {
            let offset = self.commands[start].offset_ms;
            let mut end = start + 1;
            while end < self.commands.len() && self.commands[end].offset_ms == offset {
                end += 1;
            }
            out.push((offset, start..end));
            start = end;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// compile
// ---------------------------------------------------------------------------

/// Compile a task into a timeline, refusing invalid tasks.
///
/// Returns `CoreError::InvalidTask` carrying the full structural error set
/// (the same list `validate` produces) so a caller that skipped validation
/// still gets the complete picture.
pub fn compile(task: &Task, devices: &DeviceRegistry) -> Result<Timeline> {
    let report = validate(task, devices);
    if !report.is_valid {
        return Err(CoreError::InvalidTask(report.errors));
    }
    Ok(compile_unchecked(task))
}

/// Compile without structural validation. Offsets are still well-defined
/// for any tree shape; callers are expected to have validated already.
pub fn compile_unchecked(task: &Task) -> Timeline {
    let mut c = Compiler {
        commands: Vec::new(),
        seq: 0,
    };
    let mut base = 0u64;
    for step in &task.steps {
        for item in &step.actions {
            c.item(item, base);
        }
        for pl in &step.parallel_loops {
            c.parallel_loop(pl, base);
        }
        base += step_duration(step);
    }
    c.commands.sort_by_key(|cmd| cmd.offset_ms);
    Timeline {
        task_id: task.id.clone(),
        task_name: task.name.clone(),
        total_duration_ms: task_duration(task),
        commands: c.commands,
    }
}

struct Compiler {
    commands: Vec<ScheduledCommand>,
    seq: u64,
}

impl Compiler {
    fn item(&mut self, item: &SequenceItem, offset: u64) {
        match item {
            SequenceItem::Action(a) => {
                self.commands.push(ScheduledCommand {
                    offset_ms: offset,
                    device_id: a.device_id.clone(),
                    value: a.value,
                    duration_ms: a.duration_ms,
                    command_id: Uuid::new_v4().to_string(),
                    seq: self.seq,
                });
                self.seq += 1;
            }
            SequenceItem::Delay(d) => self.delay(d, offset),
        }
    }

    // Everything behind the gate starts together once it opens.
    fn delay(&mut self, delay: &DelayAction, offset: u64) {
        let gate = offset + delay.delay_ms;
        for item in &delay.actions {
            self.item(item, gate);
        }
        for pl in &delay.parallel_loops {
            self.parallel_loop(pl, gate);
        }
    }

    // All lanes of one iteration share that iteration's start offset. The
    // stride uses the summed per-iteration duration so the timeline agrees
    // with the duration estimate.
    fn parallel_loop(&mut self, pl: &ParallelLoop, offset: u64) {
        let stride = loop_iteration_duration(pl) + pl.interval_ms;
        for i in 0..u64::from(pl.iterations) {
            let iter_offset = offset + i * stride;
            for sub in &pl.sub_steps {
                self.sub_step(sub, iter_offset);
            }
        }
    }

    // The one serial spot: each action advances the lane cursor.
    fn sub_step(&mut self, sub: &SubStep, offset: u64) {
        let mut cursor = offset;
        for item in &sub.actions {
            self.item(item, cursor);
            cursor += item_duration(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceKind};
    use crate::model::{Action, DelayAction, ParallelLoop, Step, SubStep, Task};

    fn registry() -> DeviceRegistry {
        DeviceRegistry::from_devices(vec![
            Device::new("pump1", "Inflate pump 1", DeviceKind::Pwm, 5),
            Device::new("pump2", "Inflate pump 2", DeviceKind::Pwm, 6),
            Device::new("valve1", "Valve 1", DeviceKind::Digital, 2),
        ])
    }

    #[test]
    fn empty_task_compiles_to_nothing() {
        let task = Task::new("empty");
        let tl = compile(&task, &registry()).unwrap();
        assert!(tl.is_empty());
        assert_eq!(tl.total_duration_ms, 0);
        assert!(tl.batches().is_empty());
    }

    #[test]
    fn steps_advance_serially() {
        let task = Task::new("t")
            .with_step(Step::new("a").with_action(Action::power("pump1", 30, 3000)))
            .with_step(Step::new("b").with_action(Action::power("pump2", 40, 2000)));
        let tl = compile(&task, &registry()).unwrap();
        assert_eq!(tl.commands[0].offset_ms, 0);
        assert_eq!(tl.commands[1].offset_ms, 3000);
        assert_eq!(tl.total_duration_ms, 5000);
    }

    #[test]
    fn step_children_share_offset() {
        let task = Task::new("t").with_step(
            Step::new("s")
                .with_action(Action::power("pump1", 30, 3000))
                .with_action(Action::state("valve1", true, 1500)),
        );
        let tl = compile(&task, &registry()).unwrap();
        assert_eq!(tl.commands.len(), 2);
        assert!(tl.commands.iter().all(|c| c.offset_ms == 0));
        // Tie broken by traversal order.
        assert_eq!(tl.commands[0].device_id, "pump1");
        assert_eq!(tl.commands[1].device_id, "valve1");
    }

    #[test]
    fn delay_children_start_together_after_gate() {
        let task = Task::new("t").with_step(
            Step::new("s").with_action(
                DelayAction::new(2000)
                    .with_action(Action::power("pump1", 30, 1000))
                    .with_action(Action::power("pump2", 40, 500)),
            ),
        );
        let tl = compile(&task, &registry()).unwrap();
        assert!(tl.commands.iter().all(|c| c.offset_ms == 2000));
    }

    #[test]
    fn sub_step_actions_are_serial() {
        let task = Task::new("t").with_step(
            Step::new("s").with_loop(
                ParallelLoop::new(1, 0).with_sub_step(
                    SubStep::new("lane")
                        .with_action(Action::power("pump1", 30, 1000))
                        .with_action(Action::power("pump2", 40, 2000))
                        .with_action(Action::state("valve1", true, 500)),
                ),
            ),
        );
        let tl = compile(&task, &registry()).unwrap();
        let offsets: Vec<u64> = tl.commands.iter().map(|c| c.offset_ms).collect();
        assert_eq!(offsets, vec![0, 1000, 3000]);
    }

    #[test]
    fn loop_iterations_stride_by_duration_plus_interval() {
        let task = Task::new("t").with_step(
            Step::new("s").with_loop(
                ParallelLoop::new(3, 1000).with_sub_step(
                    SubStep::new("lane").with_action(Action::power("pump1", 30, 2000)),
                ),
            ),
        );
        let tl = compile(&task, &registry()).unwrap();
        let offsets: Vec<u64> = tl.commands.iter().map(|c| c.offset_ms).collect();
        assert_eq!(offsets, vec![0, 3000, 6000]);
    }

    #[test]
    fn end_to_end_scenario_offsets() {
        let lane = SubStep::new("lane")
            .with_action(Action::power("pump2", 40, 2000))
            .with_action(Action::state("valve1", true, 1500));
        let step = Step::new("phase 1")
            .with_action(Action::power("pump1", 30, 3000))
            .with_action(DelayAction::new(2000).with_loop(
                ParallelLoop::new(3, 1000).with_sub_step(lane),
            ));
        let task = Task::new("scenario").with_step(step);

        let tl = compile(&task, &registry()).unwrap();
        assert_eq!(tl.total_duration_ms, 14500);

        let pump1: Vec<u64> = tl
            .commands
            .iter()
            .filter(|c| c.device_id == "pump1")
            .map(|c| c.offset_ms)
            .collect();
        assert_eq!(pump1, vec![0]);

        let pump2: Vec<u64> = tl
            .commands
            .iter()
            .filter(|c| c.device_id == "pump2")
            .map(|c| c.offset_ms)
            .collect();
        assert_eq!(pump2, vec![2000, 6500, 11000]);

        let valve1: Vec<u64> = tl
            .commands
            .iter()
            .filter(|c| c.device_id == "valve1")
            .map(|c| c.offset_ms)
            .collect();
        assert_eq!(valve1, vec![4000, 8500, 13000]);
    }

    #[test]
    fn compile_is_deterministic() {
        let task = Task::new("t").with_step(
            Step::new("s")
                .with_action(Action::power("pump1", 30, 3000))
                .with_action(
                    DelayAction::new(1000).with_action(Action::power("pump2", 40, 2000)),
                ),
        );
        let a = compile(&task, &registry()).unwrap();
        let b = compile(&task, &registry()).unwrap();
        let shape =
            |tl: &Timeline| -> Vec<(u64, String, u64)> {
                tl.commands
                    .iter()
                    .map(|c| (c.offset_ms, c.device_id.clone(), c.seq))
                    .collect()
            };
        assert_eq!(shape(&a), shape(&b));
        // Command ids are regenerated per compile.
        assert_ne!(a.commands[0].command_id, b.commands[0].command_id);
    }

    #[test]
    fn batches_group_equal_offsets() {
        let task = Task::new("t").with_step(
            Step::new("s")
                .with_action(Action::power("pump1", 30, 1000))
                .with_action(Action::power("pump2", 40, 2000))
                .with_action(DelayAction::new(500).with_action(Action::state(
                    "valve1",
                    true,
                    100,
                ))),
        );
        let tl = compile(&task, &registry()).unwrap();
        let batches = tl.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, 0);
        assert_eq!(batches[0].1.len(), 2);
        assert_eq!(batches[1].0, 500);
        assert_eq!(batches[1].1.len(), 1);
    }

    #[test]
    fn compile_refuses_invalid_task() {
        let task = Task::new("t").with_step(
            Step::new("s").with_action(Action::power("pump1", 150, 1000)),
        );
        let err = compile(&task, &registry());
        match err {
            Err(CoreError::InvalidTask(errors)) => {
                assert_eq!(errors.len(), 1);
            }
            other => panic!("expected InvalidTask, got {other:?}"),
        }
    }
}
