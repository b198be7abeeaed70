//! Wall-clock duration of any node in the task tree.
//!
//! Composition rules: parallel children contribute their maximum, serial
//! children their sum. A delay gate adds its pause before the longest
//! branch behind it. All functions are pure and total; empty containers
//! are zero, never an error.

use crate::model::{DelayAction, ParallelLoop, SequenceItem, Step, SubStep, Task};

/// Duration of a single action list entry.
pub fn item_duration(item: &SequenceItem) -> u64 {
    match item {
        SequenceItem::Action(a) => a.duration_ms,
        SequenceItem::Delay(d) => delay_duration(d),
    }
}

/// Gate pause plus the longest parallel branch behind it.
pub fn delay_duration(delay: &DelayAction) -> u64 {
    let longest_action = delay.actions.iter().map(item_duration).max().unwrap_or(0);
    let longest_loop = delay
        .parallel_loops
        .iter()
        .map(loop_duration)
        .max()
        .unwrap_or(0);
    delay.delay_ms + longest_action.max(longest_loop)
}

/// Serial sum of one lane's actions.
pub fn sub_step_duration(sub: &SubStep) -> u64 {
    sub.actions.iter().map(item_duration).sum()
}

/// One iteration of a loop.
///
/// Sub-steps are parallel lanes, but the established estimate sums their
/// durations rather than taking the max. Downstream tooling depends on the
/// summed figure, so it is kept; the compiler uses the same figure as the
/// iteration stride so timelines and estimates agree.
pub fn loop_iteration_duration(pl: &ParallelLoop) -> u64 {
    pl.sub_steps.iter().map(sub_step_duration).sum()
}

/// Full loop: `iterations` repeats with `interval_ms` between repeats only.
pub fn loop_duration(pl: &ParallelLoop) -> u64 {
    if pl.iterations == 0 {
        return 0;
    }
    let iterations = u64::from(pl.iterations);
    loop_iteration_duration(pl) * iterations + pl.interval_ms * (iterations - 1)
}

/// Longest parallel branch of a step.
pub fn step_duration(step: &Step) -> u64 {
    let longest_action = step.actions.iter().map(item_duration).max().unwrap_or(0);
    let longest_loop = step
        .parallel_loops
        .iter()
        .map(loop_duration)
        .max()
        .unwrap_or(0);
    longest_action.max(longest_loop)
}

/// Serial sum over all steps.
pub fn task_duration(task: &Task) -> u64 {
    task.steps.iter().map(step_duration).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
