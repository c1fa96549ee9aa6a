use crate::domain::error::{RadioError, RadioResult};
use crate::domain::models::{DeviceRecord, OperationKind, OperationOutput, ScanSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub type Outcome = RadioResult<OperationOutput>;
pub type Completer = oneshot::Sender<Outcome>;

/// What `register` does when an operation of the same kind is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Replace the earlier completion. The replaced caller is failed with
    /// [`RadioError::Superseded`] when its sender is dropped.
    #[default]
    Supersede,
    /// Refuse the new registration while the earlier caller is still waiting.
    Reject,
}

/// At most one outstanding completion per operation kind.
pub struct PendingOperations {
    slots: Mutex<HashMap<OperationKind, Completer>>,
    policy: OverlapPolicy,
}

impl PendingOperations {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn register(&self, kind: OperationKind, completer: Completer) -> RadioResult<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_overlap(&slots, kind)?;
        if slots.get(&kind).is_some_and(|existing| !existing.is_closed()) {
            warn!("Pending {} operation overwritten, previous caller abandoned", kind);
        }
        slots.insert(kind, completer);
        Ok(())
    }

    /// Fails when `register(kind, ..)` would be refused right now.
    ///
    /// Lets an operation with side effects before registration bail out
    /// first. `register` still decides.
    pub fn admits(&self, kind: OperationKind) -> RadioResult<()> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_overlap(&slots, kind)
    }

    fn check_overlap(
        &self,
        slots: &HashMap<OperationKind, Completer>,
        kind: OperationKind,
    ) -> RadioResult<()> {
        let live = slots.get(&kind).is_some_and(|existing| !existing.is_closed());
        if live && self.policy == OverlapPolicy::Reject {
            debug!("Rejecting {} registration, previous caller still waiting", kind);
            return Err(RadioError::OperationInProgress(kind));
        }
        Ok(())
    }

    /// Removes the completion for `kind` and hands it `outcome`.
    ///
    /// Gives the outcome back when nobody was waiting for it: no entry, or the
    /// caller dropped its end of the channel.
    pub fn settle(&self, kind: OperationKind, outcome: Outcome) -> Result<(), Outcome> {
        let completer = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
        match completer {
            Some(completer) => completer.send(outcome),
            None => Err(outcome),
        }
    }

    pub fn take_and_complete(&self, kind: OperationKind, output: OperationOutput) -> bool {
        self.settle(kind, Ok(output)).is_ok()
    }

    pub fn take_and_fail(&self, kind: OperationKind, error: RadioError) -> bool {
        self.settle(kind, Err(error)).is_ok()
    }

    /// Diagnostics only. Consumers must go through `settle`.
    pub fn peek(&self, kind: OperationKind) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }
}

impl Default for PendingOperations {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

/// Caller side of a one-shot operation.
///
/// Resolves to the typed result. A completion whose table entry was replaced
/// resolves to [`RadioError::Superseded`].
#[must_use = "a completion does nothing unless awaited or polled"]
pub struct Completion<T> {
    kind: OperationKind,
    receiver: oneshot::Receiver<Outcome>,
    // Kept once received, the channel reads as closed afterwards
    outcome: Option<Outcome>,
    extract: fn(OperationOutput) -> Option<T>,
}

impl<T> Completion<T> {
    pub fn channel(
        kind: OperationKind,
        extract: fn(OperationOutput) -> Option<T>,
    ) -> (Completer, Self) {
        let (sender, receiver) = oneshot::channel();
        (
            sender,
            Self {
                kind,
                receiver,
                outcome: None,
                extract,
            },
        )
    }

    pub fn settled(
        kind: OperationKind,
        extract: fn(OperationOutput) -> Option<T>,
        outcome: Outcome,
    ) -> Self {
        let (sender, completion) = Self::channel(kind, extract);
        // The receiver is alive in `completion`, so this cannot fail.
        let _ = sender.send(outcome);
        completion
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Polls without a runtime. `None` while the operation is still pending.
    ///
    /// Once settled, every call returns the same result.
    pub fn try_result(&mut self) -> Option<RadioResult<T>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.outcome = Some(Err(RadioError::Superseded))
                }
            }
        }
        self.outcome.clone().map(|outcome| self.finish(outcome))
    }

    fn finish(&self, outcome: Outcome) -> RadioResult<T> {
        let output = outcome?;
        (self.extract)(output).ok_or(RadioError::UnexpectedOutput(self.kind))
    }
}

impl<T> Future for Completion<T> {
    type Output = RadioResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.outcome.clone() {
            return Poll::Ready(this.finish(outcome));
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(this.finish(outcome)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RadioError::Superseded)),
        }
    }
}

pub fn enable_completion() -> (Completer, Completion<Vec<DeviceRecord>>) {
    Completion::channel(OperationKind::EnableRadio, OperationOutput::into_paired_devices)
}

pub fn scan_completion() -> (Completer, Completion<ScanSnapshot>) {
    Completion::channel(OperationKind::Scan, OperationOutput::into_snapshot)
}

pub fn connect_completion() -> (Completer, Completion<String>) {
    Completion::channel(OperationKind::Connect, OperationOutput::into_device_name)
}
