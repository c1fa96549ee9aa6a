use crate::domain::models::OperationKind;
use thiserror::Error;

/// Failures surfaced to callers of the radio operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// No radio adapter on this host. Reported once per session, then cached.
    #[error("Bluetooth not supported")]
    Unsupported,

    #[error("Bluetooth not enabled: on {operation}")]
    Disabled { operation: &'static str },

    /// The user or the OS declined the enable request.
    #[error("Bluetooth not enabled")]
    EnableDeclined,

    #[error("Discovery not started")]
    DiscoveryStartFailed,

    #[error("Unable to connect device")]
    ConnectFailed,

    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// Raised under the reject overlap policy while an operation of the same kind is live.
    #[error("{0} operation already in progress")]
    OperationInProgress(OperationKind),

    /// A newer operation of the same kind replaced this one before it settled.
    #[error("operation superseded before completion")]
    Superseded,

    #[error("unexpected result type for {0} operation")]
    UnexpectedOutput(OperationKind),
}

pub type RadioResult<T> = Result<T, RadioError>;
