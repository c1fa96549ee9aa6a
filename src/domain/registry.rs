use crate::domain::models::{DeviceRecord, ScanSnapshot};
use std::sync::{Arc, Mutex};

pub type SharedRegistry = Arc<Mutex<DeviceRegistry>>;

/// Devices seen during the current discovery cycle.
///
/// `paired` is filled once at scan start from the bonded list, `discovered`
/// grows as discovery reports devices. Only `discovered` is deduplicated;
/// the bonded list arrives already unique from the radio stack.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    paired: Vec<DeviceRecord>,
    discovered: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn reset(&mut self) {
        self.paired.clear();
        self.discovered.clear();
    }

    pub fn record_paired(&mut self, device: DeviceRecord) {
        self.paired.push(device);
    }

    /// Returns `true` when the device was not yet in `discovered`.
    pub fn record_discovered(&mut self, device: DeviceRecord) -> bool {
        if self
            .discovered
            .iter()
            .any(|known| known.has_address(&device.address))
        {
            return false;
        }
        self.discovered.push(device);
        true
    }

    pub fn paired(&self) -> &[DeviceRecord] {
        &self.paired
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            paired: self.paired.clone(),
            discovered: self.discovered.clone(),
        }
    }

    /// Hands out the final snapshot of a cycle and clears the registry for the next one.
    pub fn take_snapshot(&mut self) -> ScanSnapshot {
        ScanSnapshot {
            paired: std::mem::take(&mut self.paired),
            discovered: std::mem::take(&mut self.discovered),
        }
    }
}
