//! # Effect Handlers
//!
//! The impure half of a feature. A handler is offered every effect the
//! feature produces, picks out the variants it cares about, performs the
//! side effect, and may emit follow-up messages through an [`Emitter`].
//!
//! # Static vs Dynamic Dispatch
//!
//! [`EffectHandler`] uses `impl Future` returns for zero-cost static
//! dispatch. Features store handlers as [`DynEffectHandler`] trait objects;
//! every `EffectHandler` is a `DynEffectHandler` through a blanket impl.
//!
//! # Dispatch Contract
//!
//! The dispatcher *calls* `handle` for each effect in order before it polls
//! any returned future. Implementations that need ordering guarantees (queues,
//! timers) do their bookkeeping in the synchronous part of `handle` and
//! return a future for the rest.

use crate::{emitter::Emitter, error::HandlerError, message::Message};
use std::{future::Future, pin::Pin, sync::Arc};

/// The boxed future returned by [`DynEffectHandler::handle_dyn`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;

/// Executes effects, optionally emitting messages back into the feature.
///
/// # Example
///
/// ```rust,ignore
/// struct RandomHandler;
///
/// impl EffectHandler<Effect, Msg> for RandomHandler {
///     async fn handle(&self, effect: Effect, emit: Emitter<Msg>) -> Result<(), HandlerError> {
///         if let Effect::GetRandom { min, max } = effect {
///             let value = fetch_random(min, max).await?;
///             let _ = emit.emit(Msg::SetCounter(value));
///         }
///         Ok(())
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `EffectHandler<{E}, {M}>`",
    label = "missing `EffectHandler` implementation",
    note = "Handlers must implement `handle` for effect type `{E}` emitting `{M}`."
)]
pub trait EffectHandler<E: Message, M: Message>: Send + Sync + 'static {
    /// Execute one effect.
    ///
    /// `emit` may be called any number of times until the returned future
    /// completes, never after.
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;

    /// Teardown hook, awaited once when the owning feature is disposed.
    fn dispose(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Dynamic object-safe version of [`EffectHandler`].
pub trait DynEffectHandler<E: Message, M: Message>: Send + Sync + 'static {
    /// Execute one effect (dynamic dispatch version).
    fn handle_dyn(&self, effect: E, emit: Emitter<M>) -> HandlerFuture<'_>;

    /// Teardown hook (dynamic dispatch version).
    fn dispose_dyn(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

// Blanket implementation: Any type implementing EffectHandler implements DynEffectHandler automatically.
impl<E: Message, M: Message, T: EffectHandler<E, M>> DynEffectHandler<E, M> for T {
    fn handle_dyn(&self, effect: E, emit: Emitter<M>) -> HandlerFuture<'_> {
        Box::pin(self.handle(effect, emit))
    }

    fn dispose_dyn(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.dispose())
    }
}

// Allow boxed and shared trait objects to be used where EffectHandler is expected.
impl<E: Message, M: Message> EffectHandler<E, M> for Box<dyn DynEffectHandler<E, M>> {
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        (**self).handle_dyn(effect, emit)
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        (**self).dispose_dyn()
    }
}

impl<E: Message, M: Message> EffectHandler<E, M> for Arc<dyn DynEffectHandler<E, M>> {
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        (**self).handle_dyn(effect, emit)
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        (**self).dispose_dyn()
    }
}

impl<E: Message, M: Message, H: EffectHandler<E, M>> EffectHandler<E, M> for Arc<H> {
    fn handle(
        &self,
        effect: E,
        emit: Emitter<M>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        H::handle(&**self, effect, emit)
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        H::dispose(&**self)
    }
}

/// A handler that completes without suspending.
///
/// Use for pure computation or trivial emission. Adapt it into an
/// [`EffectHandler`] with `Synchronous` (in `sluice-std`).
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `SyncEffectHandler<{E}, {M}>`",
    label = "missing `SyncEffectHandler` implementation"
)]
pub trait SyncEffectHandler<E: Message, M: Message>: Send + Sync + 'static {
    /// Execute one effect to completion.
    fn handle(&self, effect: E, emit: &Emitter<M>) -> Result<(), HandlerError>;

    /// Teardown hook, called once when the owning feature is disposed.
    fn dispose(&self) {}
}
