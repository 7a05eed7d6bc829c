//! Isolated strategy: every effect runs on its own worker thread.
//!
//! A worker is a fresh OS thread with a private single-threaded tokio
//! runtime. The effect and a clone of the handler are moved onto it; the
//! only way back is the signal channel, which carries every emitted message
//! followed by exactly one terminal signal.
//!
//! Effect, message and handler types cross the boundary by value. They must
//! be `Send + 'static` (and the handler `Clone`); nothing shared and mutable
//! should hide inside them.

use sluice_core::{EffectHandler, EmitError, Emitter, HandlerError, Message};
use std::{future::Future, sync::Arc, thread};
use tokio::sync::{Semaphore, mpsc};

/// A signal sent from an isolated worker back to the caller.
#[derive(Debug)]
pub enum WorkerSignal<M> {
    /// A message emitted by the handler.
    Message(M),
    /// The handler completed successfully. Terminal.
    Done,
    /// The handler failed. Terminal.
    Failed(HandlerError),
}

impl<M> WorkerSignal<M> {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerSignal::Message(_))
    }
}

/// Run `handler` on `effect` in a new worker thread.
///
/// Returns the receiving end of the worker's signal channel. If the worker
/// dies without a terminal signal the channel simply closes.
pub fn spawn_isolated<E, M, H>(
    handler: H,
    effect: E,
) -> Result<mpsc::UnboundedReceiver<WorkerSignal<M>>, HandlerError>
where
    E: Message,
    M: Message,
    H: EffectHandler<E, M>,
{
    let (signals, receiver) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("sluice-isolated".into())
        .spawn(move || run_worker(handler, effect, signals))
        .map_err(HandlerError::Spawn)?;
    tracing::trace!("isolated worker spawned");
    Ok(receiver)
}

fn run_worker<E, M, H>(handler: H, effect: E, signals: mpsc::UnboundedSender<WorkerSignal<M>>)
where
    E: Message,
    M: Message,
    H: EffectHandler<E, M>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            let _ = signals.send(WorkerSignal::Failed(HandlerError::Spawn(error)));
            return;
        }
    };

    let forward = signals.clone();
    let emitter = Emitter::from_fn(move |message| {
        forward
            .send(WorkerSignal::Message(message))
            .map_err(|_| EmitError::Closed)
    });

    let terminal = match runtime.block_on(handler.handle(effect, emitter)) {
        Ok(()) => WorkerSignal::Done,
        Err(error) => WorkerSignal::Failed(error),
    };
    let _ = signals.send(terminal);
}

/// Runs every effect in an isolated worker so CPU-heavy or blocking work
/// never stalls the feature.
///
/// One worker per effect; concurrency is unbounded unless limited with
/// [`with_max_workers`](Isolated::with_max_workers).
#[derive(Clone)]
pub struct Isolated<H> {
    handler: H,
    limit: Option<Arc<Semaphore>>,
}

impl<H> Isolated<H> {
    /// Wrap a handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            limit: None,
        }
    }

    /// Allow at most `workers` (at least 1) isolated workers at a time.
    /// Further effects wait for a free slot.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.limit = Some(Arc::new(Semaphore::new(workers.max(1))));
        self
    }

    /// Get a reference to the inner handler.
    pub fn inner(&self) -> &H {
        &self.handler
    }
}

impl<H, E, M> EffectHandler<E, M> for Isolated<H>
where
    H: EffectHandler<E, M> + Clone,
    E: Message,
    M: Message,
{
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        let handler = self.handler.clone();
        let limit = self.limit.clone();
        async move {
            let _permit = match limit {
                Some(limit) => Some(
                    limit
                        .acquire_owned()
                        .await
                        .map_err(|_| HandlerError::WorkerLost)?,
                ),
                None => None,
            };

            let mut signals = spawn_isolated(handler, effect)?;
            while let Some(signal) = signals.recv().await {
                match signal {
                    WorkerSignal::Message(message) => {
                        if emit.emit(message).is_err() {
                            tracing::debug!("feature closed; dropping message from isolated worker");
                        }
                    }
                    WorkerSignal::Done => return Ok(()),
                    WorkerSignal::Failed(error) => return Err(error),
                }
            }

            tracing::warn!("isolated worker exited without a terminal signal");
            Err(HandlerError::WorkerLost)
        }
    }

    async fn dispose(&self) {
        self.handler.dispose().await;
    }
}
