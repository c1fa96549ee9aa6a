//! Radio Collaborators
//!
//! The radio driver and the connection worker live outside this crate. These
//! traits are the whole surface the manager touches; implementations are
//! expected to be cheap, non-blocking calls that report outcomes later
//! through the notification router.

use crate::domain::models::{ConnectionState, DeviceRecord};
use crate::infrastructure::bluetooth::protocol::WorkerSignal;
use anyhow::Result;
use std::sync::Arc;

/// Opaque reference to a remote device, produced by [`RadioDriver::resolve_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    address: String,
}

impl DeviceHandle {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Local radio adapter.
pub trait RadioDriver: Send + Sync {
    /// Whether the host has an adapter at all.
    fn is_available(&self) -> bool;

    fn is_enabled(&self) -> bool;

    /// Asks the OS to turn the radio on. The answer arrives as an enable-result notification.
    fn request_enable(&self);

    /// Returns `true` when the adapter accepted the request.
    fn disable(&self) -> bool;

    fn bonded_devices(&self) -> Vec<DeviceRecord>;

    /// Returns `false` when discovery could not be started.
    fn begin_discovery(&self) -> bool;

    fn cancel_discovery(&self);

    fn resolve_device(&self, address: &str) -> DeviceHandle;

    fn remove_bond(&self, device: &DeviceHandle) -> Result<()>;
}

/// Receives the connection worker's pushed signals.
pub trait WorkerObserver: Send + Sync {
    fn on_worker_signal(&self, signal: WorkerSignal);
}

/// Owner of the single physical link and its IO threads.
pub trait ConnectionWorker: Send + Sync {
    fn connect(&self, device: DeviceHandle);

    fn stop(&self) -> Result<()>;

    fn current_state(&self) -> ConnectionState;

    fn last_connected_address(&self) -> Option<String>;

    fn subscribe(&self, observer: Arc<dyn WorkerObserver>);
}
