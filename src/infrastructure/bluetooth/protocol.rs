//! Radio Boundary Protocol
//!
//! Names and payload encodings of the unsolicited events handed to the host,
//! plus the one-time translation of the connection worker's raw integer codes.

use crate::domain::models::{ConnectionState, DeviceRecord, RadioEvent, ScanSnapshot};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const EVENT_DEVICE_ALREADY_PAIRED: &str = "EVENT_DEVICE_ALREADY_PAIRED";
pub const EVENT_DEVICE_FOUND: &str = "EVENT_DEVICE_FOUND";
pub const EVENT_DEVICE_DISCOVER_DONE: &str = "EVENT_DEVICE_DISCOVER_DONE";
pub const EVENT_CONNECTION_LOST: &str = "EVENT_CONNECTION_LOST";
pub const EVENT_UNABLE_CONNECT: &str = "EVENT_UNABLE_CONNECT";
pub const EVENT_CONNECTED: &str = "EVENT_CONNECTED";
pub const EVENT_BLUETOOTH_NOT_SUPPORT: &str = "EVENT_BLUETOOTH_NOT_SUPPORT";

/// Payload key carrying the connected device's name.
pub const DEVICE_NAME: &str = "device_name";

/// Connection worker state codes
pub const STATE_NONE: i32 = 0;
pub const STATE_CONNECTING: i32 = 2;
pub const STATE_CONNECTED: i32 = 3;

/// Connection worker message codes
pub const MESSAGE_DEVICE_NAME: i32 = 4;
pub const MESSAGE_CONNECTION_LOST: i32 = 5;
pub const MESSAGE_UNABLE_CONNECT: i32 = 6;

/// Every event name the host may subscribe to.
pub fn event_constants() -> [&'static str; 7] {
    [
        EVENT_DEVICE_ALREADY_PAIRED,
        EVENT_DEVICE_FOUND,
        EVENT_DEVICE_DISCOVER_DONE,
        EVENT_CONNECTION_LOST,
        EVENT_UNABLE_CONNECT,
        EVENT_CONNECTED,
        EVENT_BLUETOOTH_NOT_SUPPORT,
    ]
}

/// Notification pushed by the connection worker, already translated from its raw code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerSignal {
    StateChanged(ConnectionState),
    Connected { device_name: String },
    ConnectionLost,
    UnableToConnect,
}

impl WorkerSignal {
    /// Translates a raw worker code. Returns `None` for codes the router does not act on.
    pub fn from_raw(code: i32, device_name: Option<String>) -> Option<Self> {
        match code {
            STATE_CONNECTED | MESSAGE_DEVICE_NAME => Some(Self::Connected {
                device_name: device_name.unwrap_or_default(),
            }),
            STATE_NONE => Some(Self::StateChanged(ConnectionState::Idle)),
            STATE_CONNECTING => Some(Self::StateChanged(ConnectionState::Connecting)),
            MESSAGE_CONNECTION_LOST => Some(Self::ConnectionLost),
            MESSAGE_UNABLE_CONNECT => Some(Self::UnableToConnect),
            other => {
                debug!("Ignoring worker code {}", other);
                None
            }
        }
    }
}

impl ConnectionState {
    /// Unknown codes read as idle, matching how the host treats them when asking "connected?".
    pub fn from_code(code: i32) -> Self {
        match code {
            STATE_CONNECTING => Self::Connecting,
            STATE_CONNECTED => Self::Connected,
            _ => Self::Idle,
        }
    }
}

impl RadioEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AlreadyPaired(_) => EVENT_DEVICE_ALREADY_PAIRED,
            Self::DeviceFound(_) => EVENT_DEVICE_FOUND,
            Self::DiscoveryDone(_) => EVENT_DEVICE_DISCOVER_DONE,
            Self::Connected { .. } => EVENT_CONNECTED,
            Self::ConnectionLost => EVENT_CONNECTION_LOST,
            Self::UnableToConnect => EVENT_UNABLE_CONNECT,
            Self::RadioUnsupported => EVENT_BLUETOOTH_NOT_SUPPORT,
        }
    }

    /// String-encoded JSON payload, `None` for events that carry nothing.
    pub fn payload(&self) -> Option<String> {
        match self {
            Self::AlreadyPaired(devices) => Some(encode_devices(devices)),
            Self::DeviceFound(device) => device_value(device).map(|v| v.to_string()),
            Self::DiscoveryDone(snapshot) => Some(encode_snapshot(snapshot)),
            Self::Connected { device_name } => Some(json!({ DEVICE_NAME: device_name }).to_string()),
            Self::ConnectionLost | Self::UnableToConnect | Self::RadioUnsupported => None,
        }
    }
}

/// Encodes a device list, skipping any record that fails to serialize.
pub fn encode_devices(devices: &[DeviceRecord]) -> String {
    Value::Array(devices_value(devices)).to_string()
}

pub fn encode_snapshot(snapshot: &ScanSnapshot) -> String {
    json!({
        "paired": devices_value(&snapshot.paired),
        "discovered": devices_value(&snapshot.discovered),
    })
    .to_string()
}

fn devices_value(devices: &[DeviceRecord]) -> Vec<Value> {
    devices.iter().filter_map(device_value).collect()
}

fn device_value(device: &DeviceRecord) -> Option<Value> {
    match serde_json::to_value(device) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping device {} in payload: {}", device.address, e);
            None
        }
    }
}

/// `XX:XX:XX:XX:XX:XX` with hex digits in either case.
pub fn is_valid_address(address: &str) -> bool {
    let groups: Vec<&str> = address.split(':').collect();
    groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()))
}
