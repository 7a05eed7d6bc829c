//! Effect fan-out.
//!
//! One dispatcher task per feature drains an ordered command channel and
//! offers every effect to every handler, in registration order. All handler
//! futures are driven concurrently inside the dispatcher task, so a slow
//! handler never delays the others from being offered or polled.
//!
//! A panicking handler is caught at this boundary and reported like any
//! other [`HandlerError`]; the dispatcher keeps serving the remaining
//! handlers.

use futures::{
    FutureExt,
    future::{self, BoxFuture, Either},
    stream::{FuturesUnordered, StreamExt},
};
use sluice_core::{DynEffectHandler, Emitter, HandlerError, Message};
use std::{
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use tokio::sync::{mpsc, oneshot};

/// The handlers a dispatcher offers effects to.
pub(crate) type HandlerList<E, M> = Arc<[Arc<dyn DynEffectHandler<E, M>>]>;

/// A command for the dispatcher task.
pub(crate) enum Dispatch<E> {
    /// Offer an effect to every handler.
    Effect(E),
    /// Acknowledge once every earlier effect has been offered.
    Flush(oneshot::Sender<()>),
}

/// Queue a flush and wait until the dispatcher has offered everything before it.
pub(crate) async fn flush<E>(commands: &mpsc::UnboundedSender<Dispatch<E>>) {
    let (ack, offered) = oneshot::channel();
    if commands.send(Dispatch::Flush(ack)).is_ok() {
        let _ = offered.await;
    }
}

/// Start a handler invocation and turn a panic, in `start` itself or in the
/// future it returns, into [`HandlerError::Panicked`].
///
/// `start` runs immediately, so a strategy's synchronous bookkeeping still
/// happens at offer time.
pub(crate) fn catch_panic<F>(start: impl FnOnce() -> F) -> impl Future<Output = Result<(), HandlerError>>
where
    F: Future<Output = Result<(), HandlerError>>,
{
    match catch_unwind(AssertUnwindSafe(start)) {
        Ok(future) => Either::Left(
            AssertUnwindSafe(future)
                .catch_unwind()
                .map(|outcome| outcome.unwrap_or_else(|payload| Err(HandlerError::panicked(payload)))),
        ),
        Err(payload) => Either::Right(future::ready(Err(HandlerError::panicked(payload)))),
    }
}

pub(crate) struct Fanout<E: Message, M: Message> {
    name: Arc<str>,
    handlers: HandlerList<E, M>,
    emitter: Emitter<M>,
}

impl<E: Message + Clone, M: Message> Fanout<E, M> {
    pub(crate) fn new(name: Arc<str>, handlers: HandlerList<E, M>, emitter: Emitter<M>) -> Self {
        Self {
            name,
            handlers,
            emitter,
        }
    }

    /// Run until the command channel closes and every in-flight handler finished.
    pub(crate) async fn run(self, mut commands: mpsc::UnboundedReceiver<Dispatch<E>>) {
        let mut in_flight = FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Dispatch::Effect(effect)) => {
                        for (index, handler) in self.handlers.iter().enumerate() {
                            tracing::trace!(feature = %self.name, handler = index, "offering effect");
                            let future = self.offer(&**handler, effect.clone());
                            in_flight.push(async move { (index, future.await) });
                        }
                    }
                    Some(Dispatch::Flush(ack)) => {
                        let _ = ack.send(());
                    }
                    None => break,
                },
                Some((index, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.report(index, outcome);
                }
            }
        }

        while let Some((index, outcome)) = in_flight.next().await {
            self.report(index, outcome);
        }
        tracing::debug!(feature = %self.name, "dispatcher stopped");
    }

    fn offer<'a>(
        &self,
        handler: &'a dyn DynEffectHandler<E, M>,
        effect: E,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        let emit = self.emitter.clone();
        catch_panic(move || handler.handle_dyn(effect, emit)).boxed()
    }

    fn report(&self, index: usize, outcome: Result<(), HandlerError>) {
        if let Err(error) = outcome {
            tracing::warn!(feature = %self.name, handler = index, %error, "effect handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handlers::{handler_fn, sync_handler_fn},
        testing::RecordingHandler,
    };

    #[tokio::test]
    async fn test_offers_every_effect_to_every_handler_in_order() {
        let first = RecordingHandler::<u32>::new();
        let second = RecordingHandler::<u32>::new();
        let handlers: HandlerList<u32, ()> = Arc::from(vec![
            Arc::new(first.clone()) as Arc<dyn DynEffectHandler<u32, ()>>,
            Arc::new(second.clone()) as Arc<dyn DynEffectHandler<u32, ()>>,
        ]);
        let (emitter, _messages) = Emitter::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Fanout::new("test".into(), handlers, emitter).run(rx));

        for effect in [1, 2, 3] {
            tx.send(Dispatch::Effect(effect)).unwrap();
        }
        flush(&tx).await;
        drop(tx);
        task.await.unwrap();

        assert_eq!(first.effects(), vec![1, 2, 3]);
        assert_eq!(second.effects(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_panicking_handlers_do_not_stop_the_others() {
        let survivor = RecordingHandler::<u32>::new();
        let panics_when_offered = sync_handler_fn(|effect: u32, _: &Emitter<()>| {
            if effect == 1 {
                panic!("rejected {effect} on offer");
            }
            Ok(())
        });
        let panics_when_polled = handler_fn(|effect: u32, _: Emitter<()>| async move {
            if effect == 2 {
                panic!("rejected {effect} while running");
            }
            Ok::<(), HandlerError>(())
        });
        let handlers: HandlerList<u32, ()> = Arc::from(vec![
            Arc::new(panics_when_offered) as Arc<dyn DynEffectHandler<u32, ()>>,
            Arc::new(panics_when_polled) as Arc<dyn DynEffectHandler<u32, ()>>,
            Arc::new(survivor.clone()) as Arc<dyn DynEffectHandler<u32, ()>>,
        ]);
        let (emitter, _messages) = Emitter::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Fanout::new("test".into(), handlers, emitter).run(rx));

        for effect in [1, 2, 3] {
            tx.send(Dispatch::Effect(effect)).unwrap();
        }
        flush(&tx).await;
        drop(tx);
        task.await.unwrap();

        assert_eq!(survivor.effects(), vec![1, 2, 3]);
    }
}
