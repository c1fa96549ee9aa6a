//! Notification Router
//!
//! Radio notifications carry no request id. Each one is either the answer to
//! the operation a caller just started or something that happened on its own
//! (another app enabled the radio, the OS reconnected a device). The only way
//! to tell them apart is whether a pending operation of the matching kind is
//! registered right now, so every notification goes through [`NotificationRouter::reconcile`]:
//! settle the pending operation if there is one, otherwise fall back to an
//! unsolicited event.

use crate::domain::error::RadioError;
use crate::domain::models::{
    BondState, DeviceRecord, EventSender, OperationKind, OperationOutput, RadioEvent,
};
use crate::domain::pending::{Outcome, PendingOperations};
use crate::domain::registry::SharedRegistry;
use crate::infrastructure::bluetooth::driver::{ConnectionWorker, RadioDriver, WorkerObserver};
use crate::infrastructure::bluetooth::protocol::{self, WorkerSignal};
use crate::infrastructure::bluetooth::publish;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Result of an activity the radio asked the OS (or the user) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityResult {
    Ok,
    Canceled,
}

/// Everything the radio stack can tell the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DeviceFound {
        device: DeviceRecord,
        bond_state: BondState,
    },
    DiscoveryFinished,
    EnableResult(ActivityResult),
    /// Outcome of the system device picker. Connects without a pending operation.
    DevicePicked {
        result: ActivityResult,
        address: Option<String>,
    },
    Worker(WorkerSignal),
}

pub struct NotificationRouter {
    pending: Arc<PendingOperations>,
    registry: SharedRegistry,
    driver: Arc<dyn RadioDriver>,
    worker: Arc<dyn ConnectionWorker>,
    events: EventSender,
    connected_device_name: Mutex<Option<String>>,
}

impl NotificationRouter {
    pub fn new(
        pending: Arc<PendingOperations>,
        registry: SharedRegistry,
        driver: Arc<dyn RadioDriver>,
        worker: Arc<dyn ConnectionWorker>,
        events: EventSender,
    ) -> Self {
        Self {
            pending,
            registry,
            driver,
            worker,
            events,
            connected_device_name: Mutex::new(None),
        }
    }

    pub fn handle(&self, notification: Notification) {
        match notification {
            Notification::DeviceFound { device, bond_state } => {
                self.on_device_found(device, bond_state)
            }
            Notification::DiscoveryFinished => self.on_discovery_finished(),
            Notification::EnableResult(result) => self.on_enable_result(result),
            Notification::DevicePicked { result, address } => {
                self.on_device_picked(result, address)
            }
            Notification::Worker(signal) => self.on_worker_signal(signal),
        }
    }

    /// Routes notifications from a channel until every sender is gone.
    pub async fn run(self: Arc<Self>, mut notifications: mpsc::UnboundedReceiver<Notification>) {
        info!("Notification pump started");
        while let Some(notification) = notifications.recv().await {
            self.handle(notification);
        }
        info!("Notification pump stopped");
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hands `outcome` to the pending `kind` operation, or emits `unclaimed` when nobody is waiting.
    fn reconcile(&self, kind: OperationKind, outcome: Outcome, unclaimed: Option<RadioEvent>) {
        match self.pending.settle(kind, outcome) {
            Ok(()) => debug!("{} notification resolved pending operation", kind),
            Err(_) => match unclaimed {
                Some(event) => {
                    debug!("No pending {} operation, emitting {}", kind, event.name());
                    publish(&self.events, event);
                }
                None => debug!("No pending {} operation, notification dropped", kind),
            },
        }
    }

    fn on_device_found(&self, device: DeviceRecord, bond_state: BondState) {
        if bond_state == BondState::Bonded {
            return;
        }
        let is_new = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_discovered(device.clone());
        if is_new {
            debug!("Discovered {} ({})", device.name, device.address);
            publish(&self.events, RadioEvent::DeviceFound(device));
        }
    }

    fn on_discovery_finished(&self) {
        let snapshot = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_snapshot();
        info!(
            "Discovery finished: {} paired, {} discovered",
            snapshot.paired.len(),
            snapshot.discovered.len()
        );
        self.reconcile(
            OperationKind::Scan,
            Ok(OperationOutput::Snapshot(snapshot.clone())),
            None,
        );
        publish(&self.events, RadioEvent::DiscoveryDone(snapshot));
    }

    fn on_enable_result(&self, result: ActivityResult) {
        match result {
            ActivityResult::Ok => {
                info!("Radio enabled");
                let bonded = self.driver.bonded_devices();
                self.reconcile(
                    OperationKind::EnableRadio,
                    Ok(OperationOutput::PairedDevices(bonded)),
                    None,
                );
            }
            ActivityResult::Canceled => {
                warn!("Bluetooth not enabled: enable request declined");
                self.reconcile(
                    OperationKind::EnableRadio,
                    Err(RadioError::EnableDeclined),
                    None,
                );
            }
        }
    }

    fn on_device_picked(&self, result: ActivityResult, address: Option<String>) {
        if result != ActivityResult::Ok {
            debug!("Device picker closed without a selection");
            return;
        }
        match address {
            Some(address) if protocol::is_valid_address(&address) => {
                info!("Connecting to picked device {}", address);
                let device = self.driver.resolve_device(&address);
                self.worker.connect(device);
            }
            other => warn!("Device picker returned an invalid address: {:?}", other),
        }
    }
}

impl WorkerObserver for NotificationRouter {
    fn on_worker_signal(&self, signal: WorkerSignal) {
        match signal {
            WorkerSignal::Connected { device_name } => {
                info!("Connected to {}", device_name);
                *self
                    .connected_device_name
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(device_name.clone());
                self.reconcile(
                    OperationKind::Connect,
                    Ok(OperationOutput::DeviceName(device_name.clone())),
                    Some(RadioEvent::Connected { device_name }),
                );
            }
            // Losing a link is never the outcome of a connect attempt
            WorkerSignal::ConnectionLost => {
                warn!("Connection lost");
                publish(&self.events, RadioEvent::ConnectionLost);
            }
            WorkerSignal::UnableToConnect => {
                warn!("Unable to connect device");
                self.reconcile(
                    OperationKind::Connect,
                    Err(RadioError::ConnectFailed),
                    Some(RadioEvent::UnableToConnect),
                );
            }
            WorkerSignal::StateChanged(state) => {
                debug!("Connection worker state: {:?}", state);
            }
        }
    }
}
