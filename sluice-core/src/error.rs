//! Error types for Sluice.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SluiceError`] - Top-level error type for all Sluice operations
//! - [`FeatureError`] - Lifecycle and state errors raised by a feature
//! - [`HandlerError`] - Errors from effect handlers and their strategies
//! - [`EmitError`] - Errors when emitting a message back into a feature

use crate::lifecycle::{Lifecycle, Operation};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Sluice operations.
#[derive(Error, Debug)]
pub enum SluiceError {
    /// An error raised by a feature.
    #[error("feature error: {0}")]
    Feature(#[from] FeatureError),

    /// An error raised by an effect handler.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// A message could not be emitted.
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised by a feature's entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {operation} a feature that is {lifecycle}")]
    Lifecycle {
        /// The rejected operation.
        operation: Operation,
        /// The lifecycle state at the time of the call.
        lifecycle: Lifecycle,
    },

    /// A transition function panicked earlier; the state can no longer be trusted.
    #[error("feature state is poisoned by a panicking transition")]
    Poisoned,

    /// `init` was called outside of a tokio runtime.
    #[error("feature must be initialized from within a tokio runtime")]
    NoRuntime,
}

/// Errors that can occur while handling an effect.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler itself failed.
    #[error("handler failed: {0}")]
    Failed(#[source] BoxError),

    /// A bounded sequential queue refused the effect.
    #[error("sequential queue is full (capacity {capacity})")]
    QueueFull {
        /// The configured queue capacity.
        capacity: usize,
    },

    /// An isolated worker thread could not be started.
    #[error("failed to spawn isolated worker")]
    Spawn(#[source] std::io::Error),

    /// An isolated worker stopped without signalling completion.
    #[error("isolated worker terminated without signalling completion")]
    WorkerLost,

    /// The handler panicked while handling the effect.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wrap any error as a handler failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        HandlerError::Failed(err.into())
    }

    /// Build a [`HandlerError::Panicked`] from a caught panic payload.
    pub fn panicked(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        HandlerError::Panicked(message)
    }
}

/// Errors that can occur when emitting a message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The receiving side is gone (the feature was disposed or the worker finished).
    #[error("message channel is closed")]
    Closed,
}

// Convenience conversions
impl From<BoxError> for SluiceError {
    fn from(err: BoxError) -> Self {
        SluiceError::Custom(err)
    }
}

impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        HandlerError::Failed(err)
    }
}
