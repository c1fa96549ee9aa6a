//! Simulated Radio
//!
//! In-memory radio driver and connection worker. They never complete anything
//! on their own: the test or demo decides which notifications the "radio"
//! produces and when, which is exactly the freedom a real stack has.

use crate::domain::models::{ConnectionState, DeviceRecord};
use crate::infrastructure::bluetooth::driver::{
    ConnectionWorker, DeviceHandle, RadioDriver, WorkerObserver,
};
use crate::infrastructure::bluetooth::protocol::WorkerSignal;
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RadioState {
    available: bool,
    enabled: bool,
    discovering: bool,
    discovery_starts: bool,
    bonded: Vec<DeviceRecord>,
    calls: Vec<String>,
}

/// Radio driver double that records every call that reaches the adapter.
pub struct SimulatedRadio {
    state: Mutex<RadioState>,
}

impl SimulatedRadio {
    fn with(available: bool, enabled: bool, bonded: Vec<DeviceRecord>) -> Self {
        Self {
            state: Mutex::new(RadioState {
                available,
                enabled,
                discovering: false,
                discovery_starts: true,
                bonded,
                calls: Vec::new(),
            }),
        }
    }

    pub fn enabled(bonded: Vec<DeviceRecord>) -> Self {
        Self::with(true, true, bonded)
    }

    pub fn disabled(bonded: Vec<DeviceRecord>) -> Self {
        Self::with(true, false, bonded)
    }

    /// A host without any adapter.
    pub fn absent() -> Self {
        Self::with(false, false, Vec::new())
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    pub fn set_discovery_starts(&self, starts: bool) {
        lock(&self.state).discovery_starts = starts;
    }

    pub fn is_discovering(&self) -> bool {
        lock(&self.state).discovering
    }

    pub fn bonded(&self) -> Vec<DeviceRecord> {
        lock(&self.state).bonded.clone()
    }

    /// Adapter calls in order. Availability and enabled-state queries are not recorded.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    fn record(state: &mut RadioState, call: String) {
        debug!("radio <- {}", call);
        state.calls.push(call);
    }
}

impl RadioDriver for SimulatedRadio {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    fn is_enabled(&self) -> bool {
        let state = lock(&self.state);
        state.available && state.enabled
    }

    fn request_enable(&self) {
        Self::record(&mut lock(&self.state), "request_enable".to_string());
    }

    fn disable(&self) -> bool {
        let mut state = lock(&self.state);
        Self::record(&mut state, "disable".to_string());
        state.enabled = false;
        state.discovering = false;
        true
    }

    fn bonded_devices(&self) -> Vec<DeviceRecord> {
        let mut state = lock(&self.state);
        Self::record(&mut state, "bonded_devices".to_string());
        state.bonded.clone()
    }

    fn begin_discovery(&self) -> bool {
        let mut state = lock(&self.state);
        Self::record(&mut state, "begin_discovery".to_string());
        state.discovering = state.discovery_starts;
        state.discovering
    }

    fn cancel_discovery(&self) {
        let mut state = lock(&self.state);
        Self::record(&mut state, "cancel_discovery".to_string());
        state.discovering = false;
    }

    fn resolve_device(&self, address: &str) -> DeviceHandle {
        Self::record(&mut lock(&self.state), format!("resolve_device {}", address));
        DeviceHandle::new(address)
    }

    fn remove_bond(&self, device: &DeviceHandle) -> Result<()> {
        let mut state = lock(&self.state);
        Self::record(&mut state, format!("remove_bond {}", device.address()));
        state
            .bonded
            .retain(|bonded| !bonded.has_address(device.address()));
        Ok(())
    }
}

#[derive(Default)]
struct WorkerState {
    state: ConnectionState,
    last_address: Option<String>,
    connect_requests: Vec<String>,
    stops: usize,
    fail_stop: bool,
}

/// Connection worker double. Signals are pushed by hand through [`SimulatedWorker::signal`].
#[derive(Default)]
pub struct SimulatedWorker {
    state: Mutex<WorkerState>,
    observers: Mutex<Vec<Arc<dyn WorkerObserver>>>,
}

impl SimulatedWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_stop(&self, fail: bool) {
        lock(&self.state).fail_stop = fail;
    }

    pub fn connect_requests(&self) -> Vec<String> {
        lock(&self.state).connect_requests.clone()
    }

    pub fn stop_count(&self) -> usize {
        lock(&self.state).stops
    }

    /// Updates the link state the way a real worker would, then notifies every observer.
    pub fn signal(&self, signal: WorkerSignal) {
        {
            let mut state = lock(&self.state);
            match &signal {
                WorkerSignal::Connected { .. } => state.state = ConnectionState::Connected,
                WorkerSignal::ConnectionLost | WorkerSignal::UnableToConnect => {
                    state.state = ConnectionState::Idle
                }
                WorkerSignal::StateChanged(next) => state.state = *next,
            }
        }
        // Observers may call back into the worker
        let observers = lock(&self.observers).clone();
        for observer in observers {
            observer.on_worker_signal(signal.clone());
        }
    }

    /// Pushes a raw worker code through the boundary translation.
    pub fn signal_raw(&self, code: i32, device_name: Option<String>) {
        if let Some(signal) = WorkerSignal::from_raw(code, device_name) {
            self.signal(signal);
        }
    }
}

impl ConnectionWorker for SimulatedWorker {
    fn connect(&self, device: DeviceHandle) {
        let mut state = lock(&self.state);
        debug!("worker <- connect {}", device.address());
        state.connect_requests.push(device.address().to_string());
        state.last_address = Some(device.address().to_string());
        state.state = ConnectionState::Connecting;
    }

    fn stop(&self) -> Result<()> {
        let mut state = lock(&self.state);
        state.stops += 1;
        if state.fail_stop {
            anyhow::bail!("socket close failed");
        }
        state.state = ConnectionState::Idle;
        Ok(())
    }

    fn current_state(&self) -> ConnectionState {
        lock(&self.state).state
    }

    fn last_connected_address(&self) -> Option<String> {
        lock(&self.state).last_address.clone()
    }

    fn subscribe(&self, observer: Arc<dyn WorkerObserver>) {
        lock(&self.observers).push(observer);
    }
}
