//! Cancellable asynchronous operations
//!
//! [`CancellableOperation`] wraps a unit of asynchronous work together with
//! the [`CancellationToken`] that governs it. Awaiting the operation yields a
//! [`Settled`] outcome: the work completed, failed, or was discarded because
//! cancellation was requested before it settled.
//!
//! The wrapped future is expected to check the token itself right before it
//! applies any result to shared state. The wrapper adds the outer guarantee
//! that a caller who cancelled never observes a value or an error.

use crate::cancellation::CancellationToken;
use crate::error::FactoryError;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Outcome of a cancellable operation
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    /// The work finished and produced a value
    Completed(T),
    /// The work finished with an error
    Failed(FactoryError),
    /// The work was cancelled; it settled without any observable effect
    Discarded,
}

impl<T> Settled<T> {
    /// Check if the operation produced a value
    pub fn is_completed(&self) -> bool {
        matches!(self, Settled::Completed(_))
    }

    /// Check if the operation failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Settled::Failed(_))
    }

    /// Check if the operation was discarded
    pub fn is_discarded(&self) -> bool {
        matches!(self, Settled::Discarded)
    }

    /// Borrow the produced value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the error, if any
    pub fn error(&self) -> Option<&FactoryError> {
        match self {
            Settled::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Convert into a `Result`, mapping a discarded outcome to `None`
    pub fn into_result(self) -> Option<Result<T, FactoryError>> {
        match self {
            Settled::Completed(value) => Some(Ok(value)),
            Settled::Failed(err) => Some(Err(err)),
            Settled::Discarded => None,
        }
    }

    /// Map the completed value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Settled<U> {
        match self {
            Settled::Completed(value) => Settled::Completed(f(value)),
            Settled::Failed(err) => Settled::Failed(err),
            Settled::Discarded => Settled::Discarded,
        }
    }
}

enum OperationState<T> {
    Pending(BoxFuture<'static, Settled<T>>),
    Ready(Settled<T>),
    Taken,
}

/// Asynchronous work that can be told to discard its result
pub struct CancellableOperation<T> {
    token: CancellationToken,
    state: OperationState<T>,
}

// The value is moved out on completion and never pinned in place.
impl<T> Unpin for CancellableOperation<T> {}

impl<T: Send + 'static> CancellableOperation<T> {
    /// Wrap a future governed by `token`
    pub fn new<F>(token: CancellationToken, future: F) -> Self
    where
        F: Future<Output = Settled<T>> + Send + 'static,
    {
        Self {
            token,
            state: OperationState::Pending(Box::pin(future)),
        }
    }

    /// An operation that has already completed with `value`
    pub fn resolved(value: T) -> Self {
        Self {
            token: CancellationToken::new(),
            state: OperationState::Ready(Settled::Completed(value)),
        }
    }

    /// An operation that has already failed with `error`
    pub fn rejected(error: FactoryError) -> Self {
        Self {
            token: CancellationToken::new(),
            state: OperationState::Ready(Settled::Failed(error)),
        }
    }
}

impl<T> CancellableOperation<T> {
    /// Discard the result. No effect once the work has settled.
    pub fn cancel(&self) {
        if matches!(self.state, OperationState::Pending(_)) {
            self.token.cancel();
        }
    }

    /// Check if the outcome is already known without polling
    pub fn is_settled(&self) -> bool {
        !matches!(self.state, OperationState::Pending(_))
    }

    /// Check if cancellation was requested before the work settled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, OperationState::Pending(_)) && self.token.is_cancelled()
    }

    /// The token governing this operation
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<T> Future for CancellableOperation<T> {
    type Output = Settled<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match mem::replace(&mut this.state, OperationState::Taken) {
            OperationState::Pending(mut future) => match future.as_mut().poll(cx) {
                Poll::Ready(outcome) => {
                    if this.token.is_cancelled() {
                        Poll::Ready(Settled::Discarded)
                    } else {
                        Poll::Ready(outcome)
                    }
                }
                Poll::Pending => {
                    this.state = OperationState::Pending(future);
                    Poll::Pending
                }
            },
            OperationState::Ready(outcome) => Poll::Ready(outcome),
            // Polled again after completion
            OperationState::Taken => Poll::Ready(Settled::Discarded),
        }
    }
}

impl<T> Drop for CancellableOperation<T> {
    fn drop(&mut self) {
        if matches!(self.state, OperationState::Pending(_)) {
            self.token.cancel();
        }
    }
}

impl<T> fmt::Debug for CancellableOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            OperationState::Pending(_) => "pending",
            OperationState::Ready(_) => "ready",
            OperationState::Taken => "taken",
        };
        f.debug_struct("CancellableOperation")
            .field("state", &state)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
