use crate::cmd::{load_devices, load_task};
use crate::output;
use anyhow::Context;
use sequava_core::policy::EnginePolicy;
use sequava_core::timeline::compile;
use sequava_core::validate::validate;
use sequava_runtime::{Executor, LogSink};
use std::path::Path;
use std::sync::Arc;

pub fn run(
    task_path: &Path,
    devices_path: &Path,
    hint_ms: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let task = load_task(task_path)?;
    let devices = load_devices(devices_path)?;

    // Conflicts never block, but the operator sees them before anything fires.
    let report = validate(&task, &devices);
    for warning in &report.warnings {
        eprintln!("warning: {} ({})", warning.message, warning.path);
    }

    let timeline = compile(&task, &devices)?;
    tracing::info!(
        task = %timeline.task_name,
        commands = timeline.len(),
        duration_ms = timeline.total_duration_ms,
        "starting execution"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let status = runtime.block_on(async {
        let executor = Executor::new(Arc::new(LogSink), EnginePolicy::default());
        let handle = executor.start(timeline, hint_ms).await;
        handle.wait().await
    });

    if json {
        output::print_json(&status)?;
    } else {
        println!(
            "{:?}: {} released, {} failed",
            status.state, status.executed_commands, status.failed_commands
        );
    }
    Ok(())
}
