//! The callback a handler uses to feed messages back into a feature.

use crate::error::EmitError;
use std::{fmt, sync::Arc};
use tokio::sync::mpsc;

type SendFn<M> = dyn Fn(M) -> Result<(), EmitError> + Send + Sync;

/// A cloneable handle that injects messages into a feature.
///
/// Emitting is a channel send, never a direct call into the transition
/// function, so a handler may emit from anywhere (synchronously, after an
/// await, from another thread) without reentrancy hazards.
///
/// # Example
///
/// ```rust,ignore
/// let (emitter, mut rx) = Emitter::channel();
/// emitter.emit(CounterMsg::Increment)?;
/// assert!(rx.try_recv().is_ok());
/// ```
pub struct Emitter<M> {
    send: Arc<SendFn<M>>,
}

impl<M: Send + 'static> Emitter<M> {
    /// Create an emitter that sends into the given channel.
    pub fn new(sender: mpsc::UnboundedSender<M>) -> Self {
        Self::from_fn(move |message| sender.send(message).map_err(|_| EmitError::Closed))
    }

    /// Create an emitter and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<M>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl<M> Emitter<M> {
    /// Create an emitter from an arbitrary send function.
    pub fn from_fn<F>(send: F) -> Self
    where
        F: Fn(M) -> Result<(), EmitError> + Send + Sync + 'static,
    {
        Self {
            send: Arc::new(send),
        }
    }

    /// Emit a message.
    ///
    /// Fails with [`EmitError::Closed`] once the receiving side is gone.
    pub fn emit(&self, message: M) -> Result<(), EmitError> {
        (self.send)(message)
    }

    /// Create an emitter for another message type that converts into this one.
    pub fn map<N, F>(&self, convert: F) -> Emitter<N>
    where
        M: 'static,
        F: Fn(N) -> M + Send + Sync + 'static,
    {
        let send = Arc::clone(&self.send);
        Emitter::from_fn(move |message| send(convert(message)))
    }
}

impl<M> Clone for Emitter<M> {
    fn clone(&self) -> Self {
        Self {
            send: Arc::clone(&self.send),
        }
    }
}

impl<M> fmt::Debug for Emitter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}
