use crate::cmd::{load_devices, load_task};
use crate::output;
use sequava_core::validate::validate;
use std::path::Path;

pub fn run(task_path: &Path, devices_path: &Path, json: bool) -> anyhow::Result<()> {
    let task = load_task(task_path)?;
    let devices = load_devices(devices_path)?;
    let report = validate(&task, &devices);

    if json {
        output::print_json(&report)?;
    } else {
        if report.errors.is_empty() && report.warnings.is_empty() {
            println!("Task '{}' is valid.", task.name);
        }
        if !report.errors.is_empty() {
            println!("Errors:");
            output::print_table(
                &["PATH", "MESSAGE"],
                report
                    .errors
                    .iter()
                    .map(|e| vec![e.path.clone(), e.message.clone()])
                    .collect(),
            );
        }
        if !report.warnings.is_empty() {
            if !report.errors.is_empty() {
                println!();
            }
            println!("Warnings:");
            output::print_table(
                &["PATH", "MESSAGE"],
                report
                    .warnings
                    .iter()
                    .map(|w| vec![w.path.clone(), w.message.clone()])
                    .collect(),
            );
        }
    }

    if !report.is_valid {
        anyhow::bail!("task has {} structural error(s)", report.errors.len());
    }
    Ok(())
}
