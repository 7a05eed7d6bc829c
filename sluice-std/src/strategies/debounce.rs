//! Debounce strategy: only the last effect of a burst runs.

use sluice_core::{EffectHandler, Emitter, HandlerError, Message};
use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::oneshot,
    time::{Instant, sleep_until},
};

/// Coalesces bursts of effects: each offer restarts a quiescence window and
/// only the most recent effect reaches the wrapped handler once the window
/// elapses without a newer offer.
///
/// Superseded effects are discarded silently; their offers complete with
/// `Ok(())`. Disposal cancels the pending timer without firing it.
///
/// # Example
///
/// ```rust,ignore
/// // Search as the user types, at most once per 300ms of quiet.
/// let search = Debounce::millis(SearchHandler::new(client), 300);
/// ```
pub struct Debounce<H> {
    inner: H,
    window: Duration,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    /// Dropping the sender cancels the pending timer.
    pending: Option<oneshot::Sender<()>>,
    disposed: bool,
}

impl<H> Debounce<H> {
    /// Wrap a handler with the given quiescence window.
    pub fn new(inner: H, window: Duration) -> Self {
        Self {
            inner,
            window,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Create a `Debounce` with the window specified in milliseconds.
    pub fn millis(inner: H, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// Get the configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns `true` while a timer is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Get a reference to the inner handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supersede any pending timer and arm a new one.
    fn arm(&self) -> Option<(u64, Instant, oneshot::Receiver<()>)> {
        let mut slot = self.lock();
        if slot.disposed {
            return None;
        }
        if slot.pending.take().is_some() {
            tracing::trace!("debounced effect superseded");
        }
        slot.generation += 1;
        let (cancel, cancelled) = oneshot::channel();
        slot.pending = Some(cancel);
        Some((slot.generation, Instant::now() + self.window, cancelled))
    }

    /// Claim the timer for `generation`. Fails if it was superseded or cancelled.
    fn fire(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if slot.generation == generation && slot.pending.is_some() {
            slot.pending = None;
            true
        } else {
            false
        }
    }
}

impl<H, E, M> EffectHandler<E, M> for Debounce<H>
where
    H: EffectHandler<E, M>,
    E: Message,
    M: Message,
{
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        let armed = self.arm();
        async move {
            let Some((generation, deadline, cancelled)) = armed else {
                return Ok(());
            };
            tokio::select! {
                _ = sleep_until(deadline) => {}
                _ = cancelled => return Ok(()),
            }
            if !self.fire(generation) {
                return Ok(());
            }
            self.inner.handle(effect, emit).await
        }
    }

    async fn dispose(&self) {
        let cancelled = {
            let mut slot = self.lock();
            slot.disposed = true;
            slot.pending.take().is_some()
        };
        if cancelled {
            tracing::debug!("debounce disposed; pending timer cancelled");
        }
        self.inner.dispose().await;
    }
}
