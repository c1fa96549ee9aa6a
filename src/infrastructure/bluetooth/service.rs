//! Bluetooth Service Module
//!
//! Caller-facing entry points. Every call returns immediately: preconditions
//! are checked synchronously, operations with a later outcome register their
//! completion before the radio is touched, and the notification router
//! settles them when the radio reports back.

use crate::domain::error::{RadioError, RadioResult};
use crate::domain::models::{
    ConnectionState, DeviceRecord, EventSender, OperationKind, OperationOutput, RadioEvent,
    ScanSnapshot,
};
use crate::domain::pending::{
    connect_completion, enable_completion, scan_completion, Completion, PendingOperations,
};
use crate::domain::registry::{DeviceRegistry, SharedRegistry};
use crate::domain::settings::SessionSettings;
use crate::infrastructure::bluetooth::connection::LinkConnection;
use crate::infrastructure::bluetooth::driver::{ConnectionWorker, RadioDriver};
use crate::infrastructure::bluetooth::{protocol, publish};
use crate::infrastructure::bluetooth::router::{Notification, NotificationRouter};
use crate::infrastructure::bluetooth::scanner::DiscoveryScanner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError};
use tracing::{debug, info, warn};

/// Main Bluetooth service coordinating all radio operations
pub struct BluetoothService {
    driver: Arc<dyn RadioDriver>,
    pending: Arc<PendingOperations>,
    registry: SharedRegistry,
    router: Arc<NotificationRouter>,
    scanner: DiscoveryScanner,
    link: LinkConnection,
    event_sender: EventSender,
    adapter_present: OnceLock<bool>,
    unsupported_reported: AtomicBool,
}

impl BluetoothService {
    /// Create a new Bluetooth service and subscribe its router to the worker
    pub fn new(
        driver: Arc<dyn RadioDriver>,
        worker: Arc<dyn ConnectionWorker>,
        event_sender: EventSender,
        settings: &SessionSettings,
    ) -> Self {
        let pending = Arc::new(PendingOperations::new(settings.overlap_policy));
        let registry = DeviceRegistry::shared();
        let router = Arc::new(NotificationRouter::new(
            pending.clone(),
            registry.clone(),
            driver.clone(),
            worker.clone(),
            event_sender.clone(),
        ));
        worker.subscribe(router.clone());
        debug!(
            "Bluetooth service created with {:?} overlap policy",
            settings.overlap_policy
        );

        Self {
            scanner: DiscoveryScanner::new(driver.clone(), registry.clone(), event_sender.clone()),
            link: LinkConnection::new(driver.clone(), worker),
            driver,
            pending,
            registry,
            router,
            event_sender,
            adapter_present: OnceLock::new(),
            unsupported_reported: AtomicBool::new(false),
        }
    }

    /// Router for radio stacks that push notifications directly or through [`NotificationRouter::run`].
    pub fn router(&self) -> Arc<NotificationRouter> {
        self.router.clone()
    }

    pub fn notify(&self, notification: Notification) {
        self.router.handle(notification);
    }

    pub fn pending_operations(&self) -> &PendingOperations {
        &self.pending
    }

    /// Devices recorded so far in the current discovery cycle.
    pub fn current_snapshot(&self) -> ScanSnapshot {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Turns the radio on. Resolves with the bonded devices once it is enabled.
    pub fn enable_radio(&self) -> Completion<Vec<DeviceRecord>> {
        let kind = OperationKind::EnableRadio;
        let extract = OperationOutput::into_paired_devices;
        if let Err(e) = self.ensure_available() {
            return Completion::settled(kind, extract, Err(e));
        }

        if self.driver.is_enabled() {
            info!("Bluetooth already enabled");
            let bonded = self.driver.bonded_devices();
            return Completion::settled(kind, extract, Ok(OperationOutput::PairedDevices(bonded)));
        }

        let (completer, completion) = enable_completion();
        if let Err(e) = self.pending.register(kind, completer) {
            return Completion::settled(kind, extract, Err(e));
        }
        info!("Requesting radio enable");
        self.driver.request_enable();
        completion
    }

    /// Stops any link and turns the radio off. A missing or already-off radio counts as success.
    pub fn disable_radio(&self) -> bool {
        if self.ensure_available().is_err() {
            return true;
        }
        if self.link.state() != ConnectionState::Idle {
            self.link.disconnect();
        }
        let disabled = !self.driver.is_enabled() || self.driver.disable();
        info!("Disable radio: {}", disabled);
        disabled
    }

    pub fn is_radio_enabled(&self) -> RadioResult<bool> {
        self.ensure_available()?;
        let enabled = self.driver.is_enabled();
        debug!("Bluetooth enabled status: {}", enabled);
        Ok(enabled)
    }

    /// Starts a discovery cycle.
    ///
    /// Emits the already-paired list before discovery starts, then resolves
    /// with the full snapshot when discovery finishes. The result is typed;
    /// [`protocol::encode_snapshot`] gives the JSON string a host expects.
    pub fn scan(&self) -> Completion<ScanSnapshot> {
        let kind = OperationKind::Scan;
        let extract = OperationOutput::into_snapshot;
        if let Err(e) = self
            .ensure_enabled("scan")
            .and_then(|()| self.pending.admits(kind))
        {
            return Completion::settled(kind, extract, Err(e));
        }

        // Cancelling an in-flight discovery may report it finished; that
        // result belongs to the previous caller, so register afterwards.
        self.scanner.prepare_cycle();

        let (completer, completion) = scan_completion();
        if let Err(e) = self.pending.register(kind, completer) {
            return Completion::settled(kind, extract, Err(e));
        }
        if let Err(e) = self.scanner.start() {
            self.pending.take_and_fail(kind, e);
        }
        completion
    }

    /// Starts connecting. Resolves with the device name once the worker reports the link.
    pub fn connect(&self, address: &str) -> Completion<String> {
        let kind = OperationKind::Connect;
        let extract = OperationOutput::into_device_name;
        if let Err(e) = self
            .ensure_enabled("connect")
            .and_then(|()| Self::ensure_valid_address(address))
        {
            return Completion::settled(kind, extract, Err(e));
        }

        let (completer, completion) = connect_completion();
        if let Err(e) = self.pending.register(kind, completer) {
            return Completion::settled(kind, extract, Err(e));
        }
        self.link.connect(address);
        completion
    }

    pub fn disconnect(&self, address: &str) -> RadioResult<String> {
        self.ensure_enabled("disconnect")?;
        info!("Disconnecting from {}", address);
        self.link.disconnect();
        Ok(address.to_string())
    }

    pub fn unpair(&self, address: &str) -> RadioResult<String> {
        self.ensure_enabled("unpair")?;
        Self::ensure_valid_address(address)?;
        self.link.unpair(address);
        Ok(address.to_string())
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn last_connected_address(&self) -> Option<String> {
        self.link.last_connected_address()
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.router.connected_device_name()
    }

    /// Adapter presence is checked once per session. Absence is announced once.
    fn ensure_available(&self) -> RadioResult<()> {
        if *self
            .adapter_present
            .get_or_init(|| self.driver.is_available())
        {
            return Ok(());
        }
        if !self.unsupported_reported.swap(true, Ordering::SeqCst) {
            warn!("Bluetooth adapter not found, Bluetooth not supported");
            publish(&self.event_sender, RadioEvent::RadioUnsupported);
        }
        Err(RadioError::Unsupported)
    }

    fn ensure_valid_address(address: &str) -> RadioResult<()> {
        if !protocol::is_valid_address(address) {
            warn!("Rejecting malformed device address {:?}", address);
            return Err(RadioError::InvalidAddress(address.to_string()));
        }
        Ok(())
    }

    fn ensure_enabled(&self, operation: &'static str) -> RadioResult<()> {
        self.ensure_available()?;
        if !self.driver.is_enabled() {
            warn!("Bluetooth not enabled: on {}", operation);
            return Err(RadioError::Disabled { operation });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pending::OverlapPolicy;
    use crate::infrastructure::bluetooth::protocol::{WorkerSignal, STATE_CONNECTED};

    const WIDGET: &str = "00:11:22:33:44:55";
    const GADGET: &str = "22:33:44:55:66:77";
    use crate::infrastructure::bluetooth::router::ActivityResult;
    use crate::infrastructure::bluetooth::simulated::{SimulatedRadio, SimulatedWorker};
    use tokio::sync::mpsc;

    fn service_with(
        radio: SimulatedRadio,
        policy: OverlapPolicy,
    ) -> (
        BluetoothService,
        Arc<SimulatedRadio>,
        Arc<SimulatedWorker>,
        mpsc::UnboundedReceiver<RadioEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let radio = Arc::new(radio);
        let worker = Arc::new(SimulatedWorker::new());
        let settings = SessionSettings {
            overlap_policy: policy,
        };
        let service = BluetoothService::new(radio.clone(), worker.clone(), tx, &settings);
        (service, radio, worker, rx)
    }

    #[test]
    fn test_enable_when_already_enabled_resolves_immediately() {
        let bonded = vec![DeviceRecord::new("A", "00:11")];
        let (service, radio, _, _) =
            service_with(SimulatedRadio::enabled(bonded.clone()), OverlapPolicy::Supersede);

        let mut completion = service.enable_radio();
        assert_eq!(completion.try_result(), Some(Ok(bonded)));
        assert!(!service.pending_operations().peek(OperationKind::EnableRadio));
        assert_eq!(radio.calls(), vec!["bonded_devices"]);
    }

    #[test]
    fn test_enable_waits_for_activity_result() {
        let (service, radio, _, _) =
            service_with(SimulatedRadio::disabled(Vec::new()), OverlapPolicy::Supersede);

        let mut completion = service.enable_radio();
        assert_eq!(completion.try_result(), None);
        assert!(service.pending_operations().peek(OperationKind::EnableRadio));
        assert_eq!(radio.calls(), vec!["request_enable"]);

        radio.set_enabled(true);
        service.notify(Notification::EnableResult(ActivityResult::Ok));
        assert_eq!(completion.try_result(), Some(Ok(Vec::new())));
    }

    #[test]
    fn test_unsupported_is_announced_once() {
        let (service, radio, _, mut events) =
            service_with(SimulatedRadio::absent(), OverlapPolicy::Supersede);

        assert_eq!(service.is_radio_enabled(), Err(RadioError::Unsupported));
        let mut enable = service.enable_radio();
        assert_eq!(enable.try_result(), Some(Err(RadioError::Unsupported)));
        assert!(service.disable_radio());

        assert_eq!(events.try_recv().unwrap(), RadioEvent::RadioUnsupported);
        assert!(events.try_recv().is_err());
        assert!(radio.calls().is_empty());
    }

    #[test]
    fn test_disabled_radio_rejects_link_operations() {
        let (service, radio, worker, _) =
            service_with(SimulatedRadio::disabled(Vec::new()), OverlapPolicy::Supersede);

        assert_eq!(
            service.disconnect("00:11"),
            Err(RadioError::Disabled {
                operation: "disconnect"
            })
        );
        assert_eq!(
            service.unpair("00:11"),
            Err(RadioError::Disabled { operation: "unpair" })
        );
        let mut scan = service.scan();
        assert_eq!(
            scan.try_result(),
            Some(Err(RadioError::Disabled { operation: "scan" }))
        );
        assert!(radio.calls().is_empty());
        assert_eq!(worker.stop_count(), 0);
    }

    #[test]
    fn test_scan_start_failure_fails_the_scan() {
        let (service, radio, _, mut events) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);
        radio.set_discovery_starts(false);

        let mut scan = service.scan();
        assert_eq!(scan.try_result(), Some(Err(RadioError::DiscoveryStartFailed)));
        assert!(!service.pending_operations().peek(OperationKind::Scan));
        // The paired list still went out before discovery was attempted
        assert_eq!(events.try_recv().unwrap(), RadioEvent::AlreadyPaired(Vec::new()));
    }

    #[test]
    fn test_reject_policy_fails_second_connect() {
        let (service, _, worker, _) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Reject);

        let mut first = service.connect(WIDGET);
        let mut second = service.connect(GADGET);
        assert_eq!(
            second.try_result(),
            Some(Err(RadioError::OperationInProgress(OperationKind::Connect)))
        );
        assert_eq!(worker.connect_requests(), vec![WIDGET]);

        worker.signal(WorkerSignal::Connected {
            device_name: "Widget".to_string(),
        });
        assert_eq!(first.try_result(), Some(Ok("Widget".to_string())));
    }

    #[test]
    fn test_supersede_policy_abandons_first_connect() {
        let (service, _, worker, mut events) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);

        let mut first = service.connect(WIDGET);
        let mut second = service.connect(GADGET);
        worker.signal(WorkerSignal::Connected {
            device_name: "Gadget".to_string(),
        });

        assert_eq!(second.try_result(), Some(Ok("Gadget".to_string())));
        assert_eq!(first.try_result(), Some(Err(RadioError::Superseded)));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_disable_stops_active_link() {
        let (service, radio, worker, _) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);

        let _connect = service.connect(WIDGET);
        worker.signal(WorkerSignal::Connected {
            device_name: "Widget".to_string(),
        });
        assert!(service.is_connected());

        assert!(service.disable_radio());
        assert_eq!(worker.stop_count(), 1);
        assert!(!service.is_connected());
        assert_eq!(service.is_radio_enabled(), Ok(false));
        assert!(radio.calls().contains(&"disable".to_string()));

        // Already off: no second disable call
        assert!(service.disable_radio());
        assert_eq!(
            radio.calls().iter().filter(|c| c.as_str() == "disable").count(),
            1
        );
    }

    #[test]
    fn test_disconnect_and_unpair_resolve_with_address() {
        let (service, radio, worker, _) = service_with(
            SimulatedRadio::enabled(vec![DeviceRecord::new("A", WIDGET)]),
            OverlapPolicy::Supersede,
        );
        worker.set_fail_stop(true);

        assert_eq!(service.disconnect(WIDGET), Ok(WIDGET.to_string()));
        assert_eq!(service.unpair(WIDGET), Ok(WIDGET.to_string()));
        assert!(radio.bonded().is_empty());
    }

    #[test]
    fn test_connection_queries() {
        let (service, _, worker, _) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);
        assert!(!service.is_connected());
        assert_eq!(service.last_connected_address(), None);
        assert_eq!(service.connected_device_name(), None);

        let _connect = service.connect(WIDGET);
        worker.signal_raw(STATE_CONNECTED, Some("Widget".to_string()));
        assert!(service.is_connected());
        assert_eq!(service.last_connected_address().as_deref(), Some(WIDGET));
        assert_eq!(service.connected_device_name().as_deref(), Some("Widget"));
    }

    #[test]
    fn test_malformed_address_fails_before_touching_worker() {
        let (service, radio, worker, _) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);

        let mut connect = service.connect("00:11");
        assert_eq!(
            connect.try_result(),
            Some(Err(RadioError::InvalidAddress("00:11".to_string())))
        );
        assert_eq!(
            service.unpair("not-an-address"),
            Err(RadioError::InvalidAddress("not-an-address".to_string()))
        );
        assert!(!service.pending_operations().peek(OperationKind::Connect));
        assert!(worker.connect_requests().is_empty());
        assert!(radio.calls().is_empty());
    }

    #[test]
    fn test_rejected_scan_leaves_running_cycle_alone() {
        let (service, radio, _, mut events) = service_with(
            SimulatedRadio::enabled(vec![DeviceRecord::new("A", WIDGET)]),
            OverlapPolicy::Reject,
        );

        let _first = service.scan();
        let calls = radio.calls();
        while events.try_recv().is_ok() {}

        let mut second = service.scan();
        assert_eq!(
            second.try_result(),
            Some(Err(RadioError::OperationInProgress(OperationKind::Scan)))
        );
        assert_eq!(radio.calls(), calls);
        assert!(radio.is_discovering());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_scan_registers_after_paired_list_goes_out() {
        let (service, radio, _, _) =
            service_with(SimulatedRadio::enabled(Vec::new()), OverlapPolicy::Supersede);

        let mut scan = service.scan();
        assert!(service.pending_operations().peek(OperationKind::Scan));
        assert_eq!(
            radio.calls(),
            vec!["cancel_discovery", "bonded_devices", "begin_discovery"]
        );
        assert_eq!(scan.try_result(), None);
    }
}
