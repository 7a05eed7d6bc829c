//! Sequential strategy: one effect at a time, in arrival order.

use crate::dispatch::catch_panic;
use sluice_core::{EffectHandler, Emitter, HandlerError, Message};
use std::{
    collections::VecDeque,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// What a bounded queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Refuse the new effect with [`HandlerError::QueueFull`].
    #[default]
    Reject,
    /// Discard the oldest queued effect that has not started yet.
    DropOldest,
}

/// Queue policy for [`Sequential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Never refuse an effect.
    #[default]
    Unbounded,
    /// Hold at most `capacity` (at least 1) effects that have not started yet.
    Bounded {
        /// Maximum number of waiting effects.
        capacity: usize,
        /// Behaviour when the queue is full.
        overflow: Overflow,
    },
}

/// Serializes a handler: no two invocations ever overlap and effects run in
/// the order they were offered.
///
/// The first offer on an idle queue becomes the worker: its effect is
/// started as soon as it is offered, and its future then drains the queue
/// until it is empty. Offers arriving meanwhile are queued and complete
/// immediately. A failing invocation is logged and the drain moves on to the
/// next effect; a panicking invocation is treated the same way.
///
/// Disposal drops every queued effect that has not started and ignores later
/// offers; the worker's current effect is not interrupted.
///
/// # Example
///
/// ```rust,ignore
/// let saver = Sequential::new(SaveHandler::new(db))
///     .with_policy(QueuePolicy::Bounded { capacity: 32, overflow: Overflow::DropOldest });
/// ```
pub struct Sequential<H, E, M> {
    inner: H,
    policy: QueuePolicy,
    queue: Mutex<Queue<E, M>>,
}

struct Queue<E, M> {
    pending: VecDeque<(E, Emitter<M>)>,
    draining: bool,
    disposed: bool,
}

impl<H, E, M> Sequential<H, E, M> {
    /// Wrap a handler with an unbounded queue.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            policy: QueuePolicy::Unbounded,
            queue: Mutex::new(Queue {
                pending: VecDeque::new(),
                draining: false,
                disposed: false,
            }),
        }
    }

    /// Set the queue policy.
    pub fn with_policy(mut self, policy: QueuePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The configured queue policy.
    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Number of effects waiting to start.
    pub fn queued(&self) -> usize {
        self.lock().pending.len()
    }

    /// Get a reference to the inner handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, Queue<E, M>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer an effect. Returns the effect back if the caller became the
    /// worker and must start it, then drain the queue.
    fn enqueue(&self, effect: E, emit: Emitter<M>) -> Result<Option<(E, Emitter<M>)>, HandlerError> {
        let mut queue = self.lock();
        if queue.disposed {
            tracing::trace!("sequential handler disposed; ignoring effect");
            return Ok(None);
        }
        if !queue.draining {
            queue.draining = true;
            // Effects left behind by a cancelled worker go first.
            queue.pending.push_back((effect, emit));
            return Ok(queue.pending.pop_front());
        }

        if let QueuePolicy::Bounded { capacity, overflow } = self.policy {
            let capacity = capacity.max(1);
            if queue.pending.len() >= capacity {
                match overflow {
                    Overflow::Reject => return Err(HandlerError::QueueFull { capacity }),
                    Overflow::DropOldest => {
                        queue.pending.pop_front();
                        tracing::debug!(capacity, "sequential queue full; dropped oldest effect");
                    }
                }
            }
        }

        queue.pending.push_back((effect, emit));
        tracing::trace!(queued = queue.pending.len(), "effect queued behind running worker");
        Ok(None)
    }

    fn next(&self) -> Option<(E, Emitter<M>)> {
        let mut queue = self.lock();
        let next = queue.pending.pop_front();
        if next.is_none() {
            queue.draining = false;
        }
        next
    }
}

/// The worker role. Dropping it before the queue ran dry releases the role,
/// so a cancelled worker never wedges the queue.
struct Worker<'a, E, M> {
    queue: &'a Mutex<Queue<E, M>>,
    done: bool,
}

impl<E, M> Drop for Worker<'_, E, M> {
    fn drop(&mut self) {
        if !self.done {
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .draining = false;
        }
    }
}

impl<H, E, M> Sequential<H, E, M>
where
    H: EffectHandler<E, M>,
    E: Message,
    M: Message,
{
    async fn drain(&self, mut worker: Worker<'_, E, M>, first: (E, Emitter<M>)) {
        let mut current = Some(first);
        while let Some((effect, emit)) = current {
            if let Err(error) = catch_panic(|| self.inner.handle(effect, emit)).await {
                tracing::warn!(%error, "sequential handler failed; continuing with next effect");
            }
            current = self.next();
        }
        worker.done = true;
    }
}

impl<H, E, M> EffectHandler<E, M> for Sequential<H, E, M>
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
        let start = self.enqueue(effect, emit).map(|first| {
            first.map(|first| {
                let worker = Worker {
                    queue: &self.queue,
                    done: false,
                };
                (worker, first)
            })
        });
        async move {
            if let Some((worker, first)) = start? {
                self.drain(worker, first).await;
            }
            Ok(())
        }
    }

    async fn dispose(&self) {
        let dropped = {
            let mut queue = self.lock();
            queue.disposed = true;
            let dropped = queue.pending.len();
            queue.pending.clear();
            dropped
        };
        if dropped > 0 {
            tracing::debug!(dropped, "sequential handler disposed; dropped queued effects");
        }
        self.inner.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handlers::handler_fn, testing::RecordingHandler};
    use futures::future::join_all;
    use std::{sync::Arc, time::Duration};

    #[tokio::test(start_paused = true)]
    async fn test_runs_in_order_without_overlap() {
        let recorder = RecordingHandler::<u32>::with_delay(Duration::from_millis(20));
        let sequential = Sequential::new(recorder.clone());
        let (emitter, _rx) = Emitter::<()>::channel();

        let offers: Vec<_> = (1..=3)
            .map(|effect| sequential.handle(effect, emitter.clone()))
            .collect();
        // The first offer is started right away; the other two wait.
        assert_eq!(sequential.queued(), 2);

        for outcome in join_all(offers).await {
            outcome.unwrap();
        }

        assert_eq!(recorder.effects(), vec![1, 2, 3]);
        assert_eq!(recorder.max_concurrency(), 1);
        assert_eq!(sequential.queued(), 0);
    }

    #[tokio::test]
    async fn test_bounded_reject() {
        let sequential = Sequential::new(RecordingHandler::<u32>::new()).with_policy(
            QueuePolicy::Bounded {
                capacity: 1,
                overflow: Overflow::Reject,
            },
        );
        let (emitter, _rx) = Emitter::<()>::channel();

        let first = sequential.handle(1, emitter.clone());
        let second = sequential.handle(2, emitter.clone());
        let third = sequential.handle(3, emitter.clone());
        assert!(matches!(
            third.await,
            Err(HandlerError::QueueFull { capacity: 1 })
        ));
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(sequential.inner().effects(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_bounded_drop_oldest() {
        let sequential = Sequential::new(RecordingHandler::<u32>::new()).with_policy(
            QueuePolicy::Bounded {
                capacity: 1,
                overflow: Overflow::DropOldest,
            },
        );
        let (emitter, _rx) = Emitter::<()>::channel();

        let first = sequential.handle(1, emitter.clone());
        let second = sequential.handle(2, emitter.clone());
        let third = sequential.handle(3, emitter.clone());
        second.await.unwrap();
        third.await.unwrap();
        first.await.unwrap();
        assert_eq!(sequential.inner().effects(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_dispose_drops_queued_effects_but_not_the_started_one() {
        let sequential = Sequential::new(RecordingHandler::<u32>::new());
        let (emitter, _rx) = Emitter::<()>::channel();

        let worker = sequential.handle(1, emitter.clone());
        let queued = sequential.handle(2, emitter.clone());
        EffectHandler::<u32, ()>::dispose(&sequential).await;
        assert_eq!(sequential.queued(), 0);
        worker.await.unwrap();
        queued.await.unwrap();

        assert_eq!(sequential.inner().effects(), vec![1]);
        sequential.handle(3, emitter).await.unwrap();
        assert_eq!(sequential.inner().effects(), vec![1]);
    }

    #[tokio::test]
    async fn test_panicking_invocation_does_not_stop_the_drain() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let log = ran.clone();
        let sequential = Sequential::new(handler_fn(move |effect: u32, _: Emitter<()>| {
            let log = log.clone();
            async move {
                if effect == 1 {
                    panic!("cannot handle {effect}");
                }
                log.lock().unwrap().push(effect);
                Ok::<(), HandlerError>(())
            }
        }));
        let (emitter, _rx) = Emitter::<()>::channel();

        let worker = sequential.handle(1, emitter.clone());
        let queued = sequential.handle(2, emitter.clone());
        queued.await.unwrap();
        worker.await.unwrap();
        assert_eq!(*ran.lock().unwrap(), vec![2]);

        sequential.handle(3, emitter).await.unwrap();
        assert_eq!(*ran.lock().unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_worker_hands_over_queued_effects() {
        let sequential = Sequential::new(RecordingHandler::<u32>::new());
        let (emitter, _rx) = Emitter::<()>::channel();

        let worker = sequential.handle(1, emitter.clone());
        let queued = sequential.handle(2, emitter.clone());
        queued.await.unwrap();
        drop(worker);

        sequential.handle(3, emitter).await.unwrap();
        assert_eq!(sequential.inner().effects(), vec![2, 3]);
    }
}
