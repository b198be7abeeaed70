use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DeviceKind
// ---------------------------------------------------------------------------

/// Electrical interface of a device on the controller board.
///
/// `Pwm` devices (pumps) take a power percentage; `Digital` devices (valves)
/// take an on/off state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Pwm,
    Digital,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Pwm => "pwm",
            DeviceKind::Digital => "digital",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// A physical output on the controller, as declared by the device registry.
///
/// The engine never drives pins itself; it only reads `kind` to validate
/// action values and `name` to label commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub pin: u8,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DeviceKind, pin: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            pin,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceRegistry
// ---------------------------------------------------------------------------

/// The set of devices a task may reference, keyed by device id.
///
/// Owned by the device-configuration collaborator; the engine holds it
/// read-only during validation and compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_devices(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn insert(&mut self, device: Device) -> Result<()> {
        if self.get(&device.id).is_some() {
            return Err(CoreError::DeviceExists(device.id));
        }
        self.devices.push(device);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Device> {
        self.get(id)
            .ok_or_else(|| CoreError::DeviceNotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
