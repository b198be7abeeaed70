//! Batch payloads in the controller's wire format.
//!
//! The controller accepts `POST /api/commands` with a compact JSON body:
//! `{"id": …, "ts": …, "cmds": [{"dev", "act", "val", "dur"}, …]}` where
//! `act` is `setPwr` (PWM percentage) or `setSt` (digital state as 0/1) and
//! a positive `dur` arms device-side auto-off after that many milliseconds.

use crate::sink::ReleasedCommand;
use sequava_core::model::ActionValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── WireAct ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireAct {
    #[serde(rename = "setPwr")]
    SetPower,
    #[serde(rename = "setSt")]
    SetState,
}

impl From<ActionValue> for WireAct {
    fn from(value: ActionValue) -> Self {
        match value {
            ActionValue::Power(_) => WireAct::SetPower,
            ActionValue::State(_) => WireAct::SetState,
        }
    }
}

// ─── WireCommand / CommandBatch ───────────────────────────────────────────

/// One command as the controller reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCommand {
    pub dev: String,
    pub act: WireAct,
    pub val: u8,
    pub dur: u64,
}

impl From<&ReleasedCommand> for WireCommand {
    fn from(cmd: &ReleasedCommand) -> Self {
        Self {
            dev: cmd.device_id.clone(),
            act: cmd.value.into(),
            val: cmd.value.as_wire_value(),
            dur: cmd.duration_ms,
        }
    }
}

/// One release burst: all commands due at the same offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBatch {
    pub id: String,
    /// Milliseconds from execution start at which this batch was due.
    pub ts: u64,
    pub cmds: Vec<WireCommand>,
}

impl CommandBatch {
    pub fn new(ts: u64, commands: &[ReleasedCommand]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ts,
            cmds: commands.iter().map(WireCommand::from).collect(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn released(device: &str, value: ActionValue, dur: u64) -> ReleasedCommand {
        ReleasedCommand {
            command_id: "c1".into(),
            device_id: device.into(),
            value,
            duration_ms: dur,
            released_at_ms: 0,
        }
    }

    #[test]
    fn power_command_json_shape() {
        let batch = CommandBatch::new(2000, &[released("pump1", ActionValue::Power(40), 3000)]);
        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("\"act\":\"setPwr\""));
        assert!(json.contains("\"dev\":\"pump1\""));
        assert!(json.contains("\"val\":40"));
        assert!(json.contains("\"dur\":3000"));
        assert!(json.contains("\"ts\":2000"));
    }

    #[test]
    fn state_command_maps_bool_to_binary() {
        let on = WireCommand::from(&released("valve1", ActionValue::State(true), 1500));
        assert_eq!(on.act, WireAct::SetState);
        assert_eq!(on.val, 1);

        let off = WireCommand::from(&released("valve1", ActionValue::State(false), 0));
        assert_eq!(off.val, 0);
    }

    #[test]
    fn batch_roundtrip() {
        let batch = CommandBatch::new(
            0,
            &[
                released("pump1", ActionValue::Power(30), 3000),
                released("valve1", ActionValue::State(true), 1500),
            ],
        );
        let json = serde_json::to_string(&batch).unwrap();
        let parsed: CommandBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, batch);
        assert_eq!(parsed.cmds.len(), 2);
    }
}
