pub mod compile;
pub mod estimate;
pub mod run;
pub mod validate;

use anyhow::Context;
use sequava_core::device::DeviceRegistry;
use sequava_core::model::Task;
use std::path::Path;

/// Load a task file, dispatching on extension (.yaml/.yml/.json).
pub fn load_task(path: &Path) -> anyhow::Result<Task> {
    load_by_extension(path).with_context(|| format!("failed to load task from {}", path.display()))
}

/// Load a device registry file, dispatching on extension.
pub fn load_devices(path: &Path) -> anyhow::Result<DeviceRegistry> {
    load_by_extension(path)
        .with_context(|| format!("failed to load devices from {}", path.display()))
}

fn load_by_extension<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "json" => Ok(serde_json::from_str(&content)?),
        other => anyhow::bail!("unsupported file extension '{other}' (expected yaml or json)"),
    }
}
