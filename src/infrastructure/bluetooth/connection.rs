//! Link Connection
//!
//! Thin coordination over the connection worker and the driver's bond
//! management. Connect only starts the attempt; its outcome comes back as a
//! worker signal through the notification router.

use crate::domain::models::ConnectionState;
use crate::infrastructure::bluetooth::driver::{ConnectionWorker, RadioDriver};
use std::sync::Arc;
use tracing::{error, info};

pub struct LinkConnection {
    driver: Arc<dyn RadioDriver>,
    worker: Arc<dyn ConnectionWorker>,
}

impl LinkConnection {
    pub fn new(driver: Arc<dyn RadioDriver>, worker: Arc<dyn ConnectionWorker>) -> Self {
        Self { driver, worker }
    }

    pub fn connect(&self, address: &str) {
        info!("Connecting to {}", address);
        let device = self.driver.resolve_device(address);
        self.worker.connect(device);
    }

    /// Stops the worker. A failing stop is logged; the link is considered gone either way.
    pub fn disconnect(&self) {
        if let Err(e) = self.worker.stop() {
            error!("Failed to stop connection worker: {}", e);
        }
    }

    /// Removes the bond. Failures are logged, never surfaced.
    pub fn unpair(&self, address: &str) {
        let device = self.driver.resolve_device(address);
        match self.driver.remove_bond(&device) {
            Ok(()) => info!("Removed bond with {}", address),
            Err(e) => error!("Failed to remove bond with {}: {}", address, e),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.worker.current_state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn last_connected_address(&self) -> Option<String> {
        self.worker.last_connected_address()
    }
}
