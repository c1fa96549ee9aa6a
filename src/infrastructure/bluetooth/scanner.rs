//! Discovery Scanner
//!
//! Runs the synchronous part of a scan: stop whatever discovery is in flight,
//! seed a fresh registry cycle with the bonded devices, announce them, then
//! start discovery. Everything discovery reports afterwards goes through the
//! notification router.

use crate::domain::error::{RadioError, RadioResult};
use crate::domain::models::{DeviceRecord, EventSender, RadioEvent};
use crate::domain::registry::SharedRegistry;
use crate::infrastructure::bluetooth::driver::RadioDriver;
use crate::infrastructure::bluetooth::publish;
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};

pub struct DiscoveryScanner {
    driver: Arc<dyn RadioDriver>,
    registry: SharedRegistry,
    event_sender: EventSender,
}

impl DiscoveryScanner {
    pub fn new(
        driver: Arc<dyn RadioDriver>,
        registry: SharedRegistry,
        event_sender: EventSender,
    ) -> Self {
        Self {
            driver,
            registry,
            event_sender,
        }
    }

    /// Resets the registry for a new cycle and emits the already-paired list.
    pub fn prepare_cycle(&self) -> Vec<DeviceRecord> {
        self.driver.cancel_discovery();

        let bonded = self.driver.bonded_devices();
        {
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            registry.reset();
            for device in &bonded {
                registry.record_paired(device.clone());
            }
        }

        info!("Scan cycle prepared with {} paired devices", bonded.len());
        publish(&self.event_sender, RadioEvent::AlreadyPaired(bonded.clone()));
        bonded
    }

    pub fn start(&self) -> RadioResult<()> {
        if !self.driver.begin_discovery() {
            warn!("Discovery not started");
            self.driver.cancel_discovery();
            return Err(RadioError::DiscoveryStartFailed);
        }
        info!("Discovery started");
        Ok(())
    }
}
