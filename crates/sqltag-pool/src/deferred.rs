//! One-shot settle-once future.

use tokio::sync::oneshot;

/// Observable state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with an error, or abandoned by the awaiting side.
    Rejected,
}

/// The settling half of a one-shot future.
///
/// The awaiting half is the [`oneshot::Receiver`] returned by
/// [`Deferred::new`]. The state moves from `Pending` to `Fulfilled` or
/// `Rejected` exactly once; later calls are no-ops.
#[derive(Debug)]
pub struct Deferred<T, E> {
    state: DeferredState,
    sender: Option<oneshot::Sender<Result<T, E>>>,
}

impl<T, E> Deferred<T, E> {
    /// Create a pending deferred and the receiver that observes it.
    #[must_use]
    pub fn new() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (sender, receiver) = oneshot::channel();
        let deferred = Self {
            state: DeferredState::Pending,
            sender: Some(sender),
        };
        (deferred, receiver)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DeferredState {
        self.state
    }

    /// Whether the deferred is unsettled and someone is still awaiting it.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == DeferredState::Pending
            && self
                .sender
                .as_ref()
                .is_some_and(|sender| !sender.is_closed())
    }

    /// Fulfil with `value`.
    ///
    /// Returns the value back if the deferred was already settled or the
    /// receiver has gone away, so the caller can put it somewhere else.
    pub fn resolve(&mut self, value: T) -> Result<(), T> {
        let Some(sender) = self.sender.take() else {
            return Err(value);
        };
        match sender.send(Ok(value)) {
            Ok(()) => {
                self.state = DeferredState::Fulfilled;
                Ok(())
            }
            Err(returned) => {
                self.state = DeferredState::Rejected;
                returned.map_or(Ok(()), Err)
            }
        }
    }

    /// Reject with `error`. Returns whether this call settled the deferred.
    pub fn reject(&mut self, error: E) -> bool {
        let Some(sender) = self.sender.take() else {
            return false;
        };
        self.state = DeferredState::Rejected;
        sender.send(Err(error)).is_ok()
    }
}
