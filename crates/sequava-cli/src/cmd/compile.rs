use crate::cmd::{load_devices, load_task};
use crate::output::{self, fmt_ms};
use sequava_core::model::ActionValue;
use sequava_core::timeline::compile;
use std::path::Path;

pub fn run(task_path: &Path, devices_path: &Path, json: bool) -> anyhow::Result<()> {
    let task = load_task(task_path)?;
    let devices = load_devices(devices_path)?;
    let timeline = compile(&task, &devices)?;

    if json {
        output::print_json(&timeline)?;
    } else {
        output::print_table(
            &["OFFSET", "DEVICE", "COMMAND", "HOLD"],
            timeline
                .commands
                .iter()
                .map(|c| {
                    let command = match c.value {
                        ActionValue::Power(p) => format!("power {p}%"),
                        ActionValue::State(true) => "on".to_string(),
                        ActionValue::State(false) => "off".to_string(),
                    };
                    vec![
                        fmt_ms(c.offset_ms),
                        c.device_id.clone(),
                        command,
                        fmt_ms(c.duration_ms),
                    ]
                })
                .collect(),
        );
        println!(
            "\n{} command(s), {} total",
            timeline.len(),
            fmt_ms(timeline.total_duration_ms)
        );
    }
    Ok(())
}
