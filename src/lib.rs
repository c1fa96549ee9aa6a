//! Bluetooth manager
//!
//! Drives a short-range radio through a small set of asynchronous operations
//! (enable, scan, connect, disconnect, unpair) while the radio stack reports
//! through independent notification channels.

pub mod domain;
pub mod infrastructure;

pub use domain::error::{RadioError, RadioResult};
pub use domain::models::{
    BondState, ConnectionState, DeviceRecord, EventReceiver, EventSender, OperationKind,
    RadioEvent, ScanSnapshot,
};
pub use domain::pending::{Completion, OverlapPolicy};
pub use infrastructure::bluetooth::driver::{
    ConnectionWorker, DeviceHandle, RadioDriver, WorkerObserver,
};
pub use infrastructure::bluetooth::protocol::WorkerSignal;
pub use infrastructure::bluetooth::router::{ActivityResult, Notification, NotificationRouter};
pub use infrastructure::bluetooth::BluetoothService;
