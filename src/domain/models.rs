use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// A paired or discovered radio device.
///
/// Two records are the same device when their addresses match ignoring ASCII case.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub address: String,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

impl PartialEq for DeviceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.has_address(&other.address)
    }
}

/// Devices known at the end of a discovery cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub paired: Vec<DeviceRecord>,
    #[serde(alias = "found")]
    pub discovered: Vec<DeviceRecord>,
}

/// Bond state reported alongside a discovery notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    None,
    Bonding,
    Bonded,
}

/// Link state owned by the connection worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
}

/// Operations whose outcome arrives later through a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    EnableRadio,
    Scan,
    Connect,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnableRadio => "ENABLE_BT",
            Self::Scan => "SCAN",
            Self::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success value handed to a pending caller.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    PairedDevices(Vec<DeviceRecord>),
    Snapshot(ScanSnapshot),
    DeviceName(String),
}

impl OperationOutput {
    pub fn into_paired_devices(self) -> Option<Vec<DeviceRecord>> {
        match self {
            Self::PairedDevices(devices) => Some(devices),
            _ => None,
        }
    }

    pub fn into_snapshot(self) -> Option<ScanSnapshot> {
        match self {
            Self::Snapshot(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn into_device_name(self) -> Option<String> {
        match self {
            Self::DeviceName(name) => Some(name),
            _ => None,
        }
    }
}

/// Notifications pushed to the host with no outstanding request attached.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    AlreadyPaired(Vec<DeviceRecord>),
    DeviceFound(DeviceRecord),
    DiscoveryDone(ScanSnapshot),
    Connected { device_name: String },
    ConnectionLost,
    UnableToConnect,
    RadioUnsupported,
}

pub type EventSender = mpsc::UnboundedSender<RadioEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<RadioEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_equality_ignores_address_case() {
        let a = DeviceRecord::new("Printer", "00:11:AA");
        let b = DeviceRecord::new("Other name", "00:11:aa");
        assert_eq!(a, b);
        assert_ne!(a, DeviceRecord::new("Printer", "00:11:AB"));
    }

    #[test]
    fn test_snapshot_accepts_found_alias() {
        let json = r#"{"paired":[],"found":[{"name":"B","address":"22:33"}]}"#;
        let snapshot: ScanSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.discovered, vec![DeviceRecord::new("B", "22:33")]);
    }

    #[test]
    fn test_output_extractors_reject_other_variants() {
        let output = OperationOutput::DeviceName("Widget".to_string());
        assert_eq!(output.clone().into_device_name().as_deref(), Some("Widget"));
        assert!(output.into_snapshot().is_none());
    }
}
