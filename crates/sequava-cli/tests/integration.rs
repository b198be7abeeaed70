use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::path::PathBuf;

fn sequava() -> Command {
    Command::cargo_bin("sequava").unwrap()
}

const DEVICES_YAML: &str = "\
devices:
  - id: pump1
    name: Inflate pump 1
    kind: pwm
    pin: 5
  - id: pump2
    name: Inflate pump 2
    kind: pwm
    pin: 6
  - id: valve1
    name: Valve 1
    kind: digital
    pin: 2
";

// The end-to-end scenario: 14500 ms total, pump2/valve1 repeating at
// 2000/6500/11000 behind a 2000 ms gate.
const TASK_YAML: &str = "\
name: inflate cycle
steps:
  - name: phase 1
    actions:
      - type: action
        device_id: pump1
        kind: power
        value: 30
        duration_ms: 3000
      - type: delay
        delay_ms: 2000
        parallel_loops:
          - iterations: 3
            interval_ms: 1000
            sub_steps:
              - name: lane
                actions:
                  - type: action
                    device_id: pump2
                    kind: power
                    value: 40
                    duration_ms: 2000
                  - type: action
                    device_id: valve1
                    kind: state
                    value: true
                    duration_ms: 1500
";

const BAD_TASK_YAML: &str = "\
name: broken
steps:
  - name: phase 1
    actions:
      - type: action
        device_id: pump1
        kind: power
        value: 150
        duration_ms: 3000
";

fn write_fixtures(dir: &TempDir) -> (PathBuf, PathBuf) {
    let task = dir.path().join("task.yaml");
    let devices = dir.path().join("devices.yaml");
    std::fs::write(&task, TASK_YAML).unwrap();
    std::fs::write(&devices, DEVICES_YAML).unwrap();
    (task, devices)
}

// ---------------------------------------------------------------------------
// sequava validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_good_task() {
    let dir = TempDir::new().unwrap();
    let (task, devices) = write_fixtures(&dir);

    sequava()
        .args(["validate", "--task"])
        .arg(&task)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn validate_rejects_out_of_range_value() {
    let dir = TempDir::new().unwrap();
    let (_, devices) = write_fixtures(&dir);
    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, BAD_TASK_YAML).unwrap();

    sequava()
        .args(["validate", "--task"])
        .arg(&bad)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .failure()
        .stdout(predicate::str::contains("150"));
}

#[test]
fn validate_json_reports_validity() {
    let dir = TempDir::new().unwrap();
    let (task, devices) = write_fixtures(&dir);

    sequava()
        .args(["validate", "--json", "--task"])
        .arg(&task)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_valid\": true"));
}

// ---------------------------------------------------------------------------
// sequava estimate
// ---------------------------------------------------------------------------

#[test]
fn estimate_reports_scenario_total() {
    let dir = TempDir::new().unwrap();
    let (task, _) = write_fixtures(&dir);

    sequava()
        .args(["estimate", "--task"])
        .arg(&task)
        .assert()
        .success()
        .stdout(predicate::str::contains("14500 ms"));
}

#[test]
fn estimate_json_has_step_breakdown() {
    let dir = TempDir::new().unwrap();
    let (task, _) = write_fixtures(&dir);

    sequava()
        .args(["estimate", "--json", "--task"])
        .arg(&task)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_ms\": 14500"))
        .stdout(predicate::str::contains("\"name\": \"phase 1\""));
}

// ---------------------------------------------------------------------------
// sequava compile
// ---------------------------------------------------------------------------

#[test]
fn compile_emits_scenario_offsets() {
    let dir = TempDir::new().unwrap();
    let (task, devices) = write_fixtures(&dir);

    sequava()
        .args(["compile", "--json", "--task"])
        .arg(&task)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"offset_ms\": 6500"))
        .stdout(predicate::str::contains("\"offset_ms\": 11000"))
        .stdout(predicate::str::contains("\"total_duration_ms\": 14500"));
}

#[test]
fn compile_refuses_invalid_task() {
    let dir = TempDir::new().unwrap();
    let (_, devices) = write_fixtures(&dir);
    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, BAD_TASK_YAML).unwrap();

    sequava()
        .args(["compile", "--task"])
        .arg(&bad)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .failure()
        .stderr(predicate::str::contains("structural error"));
}

// ---------------------------------------------------------------------------
// sequava run
// ---------------------------------------------------------------------------

#[test]
fn run_executes_short_task_to_completion() {
    let dir = TempDir::new().unwrap();
    let (_, devices) = write_fixtures(&dir);
    // Keep the schedule short so the test finishes quickly.
    let quick = dir.path().join("quick.yaml");
    std::fs::write(
        &quick,
        "\
name: quick
steps:
  - name: pulse
    actions:
      - type: action
        device_id: valve1
        kind: state
        value: true
        duration_ms: 50
",
    )
    .unwrap();

    sequava()
        .args(["run", "--task"])
        .arg(&quick)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"));
}

#[test]
fn unknown_extension_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (_, devices) = write_fixtures(&dir);
    let odd = dir.path().join("task.toml");
    std::fs::write(&odd, "name: nope").unwrap();

    sequava()
        .args(["validate", "--task"])
        .arg(&odd)
        .arg("--devices")
        .arg(&devices)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file extension"));
}
