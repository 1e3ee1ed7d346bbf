//! Operation state machine types.

use tokio::sync::{mpsc, oneshot};

use quill_providers::BackendError;
use quill_types::{StreamEvent, TurnId};

use crate::responder::ResponderGuard;

/// What the engine is currently doing.
///
/// At most one orchestration exists at a time; the guard inside the active
/// state holds the responder flag and releases it when the state is dropped.
#[derive(Debug)]
pub(crate) enum OperationState {
    Idle,
    /// A request/response turn awaiting its single result.
    Turn(ActiveTurn),
    /// A streaming continuation consuming ordered increments.
    Continuation(ActiveContinuation),
}

#[derive(Debug)]
pub(crate) struct ActiveTurn {
    /// Provisional assistant turn to resolve on settlement. Known only to
    /// this orchestration until then.
    pub(crate) placeholder: TurnId,
    pub(crate) rx: oneshot::Receiver<Result<String, BackendError>>,
    pub(crate) _guard: ResponderGuard,
}

#[derive(Debug)]
pub(crate) struct ActiveContinuation {
    pub(crate) placeholder: TurnId,
    pub(crate) rx: mpsc::Receiver<StreamEvent>,
    /// Whether any chunk landed yet; the first chunk decides the boundary
    /// space.
    pub(crate) appended: bool,
    pub(crate) _guard: ResponderGuard,
}
