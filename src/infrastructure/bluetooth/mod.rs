//! Bluetooth Module
//!
//! Reconciles one-request-one-answer callers with a radio stack that reports
//! everything through unsolicited, uncorrelated notifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │  (caller-facing operations, registers pending results)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────────┐
//! │  Scanner  │  │ Connection │  │    Router    │◄── radio / worker
//! │           │  │            │  │              │    notifications
//! │ - paired  │  │ - connect  │  │ - settle     │
//! │   seeding │  │ - stop     │  │   pending    │
//! │ - start   │  │ - unpair   │  │ - or emit    │
//! └───────────┘  └────────────┘  └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Radio driver and connection worker boundaries
//! - [`protocol`] - Event names, payload encoding, raw worker codes
//! - [`router`] - Notification routing: resolve a pending operation or emit
//! - [`scanner`] - Synchronous scan pre-step and discovery start
//! - [`connection`] - Link operations over the connection worker
//! - [`service`] - Main service coordinator
//! - [`simulated`] - In-memory driver and worker

pub mod connection;
pub mod driver;
pub mod protocol;
pub mod router;
pub mod scanner;
pub mod service;
pub mod simulated;

// Re-export main service for convenience
pub use service::BluetoothService;

use crate::domain::models::{EventSender, RadioEvent};
use tracing::{trace, warn};

/// Sends an unsolicited event. A host that stopped listening is not an error for the radio side.
pub(crate) fn publish(events: &EventSender, event: RadioEvent) {
    trace!("Emitting {}", event.name());
    if let Err(e) = events.send(event) {
        warn!("Dropped {} event, no listener", e.0.name());
    }
}
