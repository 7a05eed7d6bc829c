//! Testing utilities for sluice.
//!
//! - [`RecordingHandler`]: an effect handler that records every effect it is offered
//! - [`DisposeProbe`]: an effect handler that records whether its disposal hook ran
//! - [`next_within`]: receive the next stream item or give up after a timeout

use sluice_core::{EffectHandler, Emitter, HandlerError, Message};
use std::{
    future::Future,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::{Notify, broadcast};

// ============================================================================
// Recording Handler
// ============================================================================

/// An effect handler that records all effects it is offered.
///
/// Effects are recorded when they are offered, before the returned future is
/// polled, so the record follows offer order even when several invocations
/// are in flight. With [`with_delay`](RecordingHandler::with_delay) every
/// invocation then sleeps, and overlapping invocations are counted.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::<MyEffect>::new();
/// let runtime = FeatureRuntime::builder(state, update)
///     .handler(recorder.clone())
///     .build();
///
/// runtime.init().await?;
/// runtime.accept(msg)?;
/// assert!(recorder.wait_for(1, Duration::from_secs(1)).await);
/// ```
pub struct RecordingHandler<E> {
    inner: Arc<Recording<E>>,
    delay: Option<Duration>,
}

struct Recording<E> {
    effects: Mutex<Vec<E>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    recorded: Notify,
}

impl<E: Clone> RecordingHandler<E> {
    /// Create a recorder that completes immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Recording {
                effects: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                recorded: Notify::new(),
            }),
            delay: None,
        }
    }

    /// Create a recorder whose invocations take `delay` to complete.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Get a clone of the recorded effects.
    pub fn effects(&self) -> Vec<E> {
        self.inner.record().clone()
    }

    /// Get the number of recorded effects.
    pub fn count(&self) -> usize {
        self.inner.record().len()
    }

    /// The largest number of invocations that were running at once.
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    /// Clear all recorded effects.
    pub fn clear(&self) {
        self.inner.record().clear();
    }

    /// Wait until at least `count` effects were recorded.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let recorded = self.inner.recorded.notified();
                if self.count() >= count {
                    return;
                }
                recorded.await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

impl<E: Clone> Default for RecordingHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RecordingHandler<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            delay: self.delay,
        }
    }
}

impl<E> Recording<E> {
    fn record(&self) -> MutexGuard<'_, Vec<E>> {
        self.effects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the active count when an invocation ends or is dropped.
struct Active<E>(Arc<Recording<E>>);

impl<E> Drop for Active<E> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<E, M> EffectHandler<E, M> for RecordingHandler<E>
where
    E: Message + Clone,
    M: Message,
{
    fn handle(
        &self,
        effect: E,
        _emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        self.inner.record().push(effect);
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_active.fetch_max(active, Ordering::SeqCst);
        self.inner.recorded.notify_waiters();

        let guard = Active(self.inner.clone());
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            drop(guard);
            Ok(())
        }
    }
}

// ============================================================================
// Dispose Probe
// ============================================================================

/// An effect handler that ignores effects and records its disposal.
///
/// With [`with_delay`](DisposeProbe::with_delay) the disposal hook takes that
/// long before it is marked as done, which makes it observable whether a
/// caller actually awaited it.
#[derive(Clone, Default)]
pub struct DisposeProbe {
    disposed: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl DisposeProbe {
    /// Create a probe with an instant disposal hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a probe whose disposal hook takes `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Whether a disposal hook has run to completion.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// How many times the disposal hook was started.
    pub fn dispose_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: Message, M: Message> EffectHandler<E, M> for DisposeProbe {
    async fn handle(&self, _effect: E, _emit: Emitter<M>) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn dispose(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.disposed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Streams
// ============================================================================

/// Receive the next item from a broadcast stream.
///
/// Returns `None` if the stream closed or nothing arrived within `timeout`.
/// Lagged notifications are skipped.
pub async fn next_within<T: Clone>(
    receiver: &mut broadcast::Receiver<T>,
    timeout: Duration,
) -> Option<T> {
    let next = async {
        loop {
            match receiver.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(timeout, next).await.ok().flatten()
}
