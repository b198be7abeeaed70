use crate::cmd::load_task;
use crate::output::{self, fmt_ms};
use sequava_core::duration::{step_duration, task_duration};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StepEstimate {
    index: usize,
    name: String,
    duration_ms: u64,
    starts_at_ms: u64,
}

#[derive(Serialize)]
struct Estimate {
    task: String,
    total_ms: u64,
    steps: Vec<StepEstimate>,
}

pub fn run(task_path: &Path, json: bool) -> anyhow::Result<()> {
    let task = load_task(task_path)?;

    let mut cursor = 0u64;
    let steps: Vec<StepEstimate> = task
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let duration_ms = step_duration(step);
            let entry = StepEstimate {
                index,
                name: step.name.clone(),
                duration_ms,
                starts_at_ms: cursor,
            };
            cursor += duration_ms;
            entry
        })
        .collect();

    let estimate = Estimate {
        task: task.name.clone(),
        total_ms: task_duration(&task),
        steps,
    };

    if json {
        output::print_json(&estimate)?;
    } else {
        output::print_table(
            &["#", "STEP", "STARTS", "DURATION"],
            estimate
                .steps
                .iter()
                .map(|s| {
                    vec![
                        s.index.to_string(),
                        s.name.clone(),
                        fmt_ms(s.starts_at_ms),
                        fmt_ms(s.duration_ms),
                    ]
                })
                .collect(),
        );
        println!("\nTotal: {} ({} ms)", fmt_ms(estimate.total_ms), estimate.total_ms);
    }
    Ok(())
}
