//! Handler adapters.
//!
//! - [`handler_fn`] turns an async closure into an [`EffectHandler`]
//! - [`sync_handler_fn`] turns a plain closure into an [`EffectHandler`]
//! - [`Synchronous`] adapts a [`SyncEffectHandler`] into an [`EffectHandler`]

use sluice_core::{EffectHandler, Emitter, HandlerError, Message, SyncEffectHandler};
use std::future::{Future, ready};

/// An [`EffectHandler`] backed by an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Create a handler from an async closure.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = handler_fn(|effect: Effect, emit: Emitter<Msg>| async move {
///     if let Effect::Load(id) = effect {
///         let item = load(id).await.map_err(HandlerError::failed)?;
///         let _ = emit.emit(Msg::Loaded(item));
///     }
///     Ok(())
/// });
/// ```
pub fn handler_fn<E, M, F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(E, Emitter<M>) -> Fut,
    Fut: Future<Output = Result<(), HandlerError>>,
{
    FnHandler { f }
}

impl<E, M, F, Fut> EffectHandler<E, M> for FnHandler<F>
where
    E: Message,
    M: Message,
    F: Fn(E, Emitter<M>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        (self.f)(effect, emit)
    }
}

/// An [`EffectHandler`] backed by a synchronous closure. See [`sync_handler_fn`].
#[derive(Clone)]
pub struct SyncFnHandler<F> {
    f: F,
}

/// Create a handler from a closure that completes without suspending.
pub fn sync_handler_fn<E, M, F>(f: F) -> SyncFnHandler<F>
where
    F: Fn(E, &Emitter<M>) -> Result<(), HandlerError>,
{
    SyncFnHandler { f }
}

impl<E, M, F> EffectHandler<E, M> for SyncFnHandler<F>
where
    E: Message,
    M: Message,
    F: Fn(E, &Emitter<M>) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        ready((self.f)(effect, &emit))
    }
}

/// Adapts a [`SyncEffectHandler`] into an [`EffectHandler`].
///
/// The handler runs when the effect is offered; the returned future is
/// already complete.
#[derive(Debug, Clone, Default)]
pub struct Synchronous<H>(pub H);

impl<E, M, H> EffectHandler<E, M> for Synchronous<H>
where
    E: Message,
    M: Message,
    H: SyncEffectHandler<E, M>,
{
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        ready(self.0.handle(effect, &emit))
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        self.0.dispose();
        ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    struct Doubler {
        disposed: Arc<AtomicBool>,
    }

    impl SyncEffectHandler<u32, u32> for Doubler {
        fn handle(&self, effect: u32, emit: &Emitter<u32>) -> Result<(), HandlerError> {
            emit.emit(effect * 2).map_err(HandlerError::failed)
        }

        fn dispose(&self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|effect: u32, emit: Emitter<String>| async move {
            tokio::task::yield_now().await;
            emit.emit(effect.to_string()).map_err(HandlerError::failed)
        });
        let (emitter, mut rx) = Emitter::channel();

        handler.handle(7, emitter).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "7");
    }

    #[tokio::test]
    async fn test_sync_handler_fn_runs_on_offer() {
        let handler = sync_handler_fn(|effect: u32, emit: &Emitter<u32>| {
            emit.emit(effect + 1).map_err(HandlerError::failed)
        });
        let (emitter, mut rx) = Emitter::channel();

        let pending = handler.handle(1, emitter);
        // Already executed before the future is awaited.
        assert_eq!(rx.try_recv().unwrap(), 2);
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_synchronous_adapter() {
        let disposed = Arc::new(AtomicBool::new(false));
        let handler = Synchronous(Doubler {
            disposed: disposed.clone(),
        });
        let (emitter, mut rx) = Emitter::channel();

        handler.handle(21, emitter).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), 42);

        EffectHandler::<u32, u32>::dispose(&handler).await;
        assert!(disposed.load(Ordering::SeqCst));
    }
}
