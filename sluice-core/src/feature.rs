//! # Feature Contract
//!
//! A feature owns one authoritative state value, accepts messages, runs them
//! through its transition function and dispatches the resulting effects to
//! its handlers. [`Feature`] is the contract observers and UI glue program
//! against; [`FeatureProxy`] is the base for decorators that wrap a feature
//! and override only the operations they augment.

use crate::{emitter::Emitter, error::FeatureError, lifecycle::Lifecycle, message::Message};
use std::future::Future;
use tokio::sync::broadcast;

/// The state type of a feature.
pub type StateOf<F> = <F as Feature>::State;
/// The message type of a feature.
pub type MessageOf<F> = <F as Feature>::Message;
/// The effect type of a feature.
pub type EffectOf<F> = <F as Feature>::Effect;

/// A running state-update engine.
///
/// Lifecycle: call [`init`](Feature::init) before the first
/// [`accept`](Feature::accept) and [`dispose`](Feature::dispose) when done.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Feature`",
    label = "missing `Feature` implementation",
    note = "Build a `FeatureRuntime` or wrap one in a type implementing `FeatureProxy`."
)]
pub trait Feature: Send + Sync + 'static {
    /// The state owned by the feature.
    type State: Clone + Send + Sync + 'static;
    /// Messages accepted by the feature.
    type Message: Message;
    /// Effects produced by the feature.
    type Effect: Message + Clone;

    /// The name used in log records.
    fn name(&self) -> &str;

    /// The most recently committed state.
    fn state(&self) -> Self::State;

    /// Subscribe to state changes. Every committed state is sent once.
    ///
    /// The receiver is closed once the feature is disposed.
    fn state_changes(&self) -> broadcast::Receiver<Self::State>;

    /// Subscribe to effects produced by accepted messages.
    ///
    /// Initial and disposal effects go straight to handlers and are not
    /// broadcast here.
    fn effects(&self) -> broadcast::Receiver<Self::Effect>;

    /// A handle that feeds messages into the feature's message queue.
    fn emitter(&self) -> Emitter<Self::Message>;

    /// Run one message through the transition function.
    fn accept(&self, message: Self::Message) -> Result<(), FeatureError>;

    /// Dispatch the initial effects and start processing.
    fn init(&self) -> impl Future<Output = Result<(), FeatureError>> + Send;

    /// Dispatch the disposal effects, await handler teardown and stop.
    ///
    /// Calling `dispose` on an already disposed feature is a no-op.
    fn dispose(&self) -> impl Future<Output = Result<(), FeatureError>> + Send;

    /// The current lifecycle state.
    fn lifecycle(&self) -> Lifecycle;

    /// Effects dispatched once by `init`.
    fn initial_effects(&self) -> &[Self::Effect];

    /// Effects dispatched once by `dispose`.
    fn disposal_effects(&self) -> &[Self::Effect];
}

/// A transparent forwarding wrapper around another feature.
///
/// Every method forwards to [`inner`](FeatureProxy::inner) by default; a
/// decorator overrides only what it augments. Every `FeatureProxy` is a
/// [`Feature`] through a blanket impl, so decorators stack.
///
/// # Example
///
/// ```rust,ignore
/// struct CountAccepts<F> {
///     inner: F,
///     accepted: AtomicUsize,
/// }
///
/// impl<F: Feature> FeatureProxy for CountAccepts<F> {
///     type Inner = F;
///
///     fn inner(&self) -> &F {
///         &self.inner
///     }
///
///     fn accept(&self, message: MessageOf<F>) -> Result<(), FeatureError> {
///         self.accepted.fetch_add(1, Ordering::Relaxed);
///         self.inner.accept(message)
///     }
/// }
/// ```
pub trait FeatureProxy: Send + Sync + 'static {
    /// The wrapped feature.
    type Inner: Feature;

    /// Access the wrapped feature.
    fn inner(&self) -> &Self::Inner;

    /// See [`Feature::name`].
    fn name(&self) -> &str {
        Feature::name(self.inner())
    }

    /// See [`Feature::state`].
    fn state(&self) -> StateOf<Self::Inner> {
        Feature::state(self.inner())
    }

    /// See [`Feature::state_changes`].
    fn state_changes(&self) -> broadcast::Receiver<StateOf<Self::Inner>> {
        Feature::state_changes(self.inner())
    }

    /// See [`Feature::effects`].
    fn effects(&self) -> broadcast::Receiver<EffectOf<Self::Inner>> {
        Feature::effects(self.inner())
    }

    /// See [`Feature::emitter`].
    fn emitter(&self) -> Emitter<MessageOf<Self::Inner>> {
        Feature::emitter(self.inner())
    }

    /// See [`Feature::accept`].
    fn accept(&self, message: MessageOf<Self::Inner>) -> Result<(), FeatureError> {
        Feature::accept(self.inner(), message)
    }

    /// See [`Feature::init`].
    fn init(&self) -> impl Future<Output = Result<(), FeatureError>> + Send {
        Feature::init(self.inner())
    }

    /// See [`Feature::dispose`].
    fn dispose(&self) -> impl Future<Output = Result<(), FeatureError>> + Send {
        Feature::dispose(self.inner())
    }

    /// See [`Feature::lifecycle`].
    fn lifecycle(&self) -> Lifecycle {
        Feature::lifecycle(self.inner())
    }

    /// See [`Feature::initial_effects`].
    fn initial_effects(&self) -> &[EffectOf<Self::Inner>] {
        Feature::initial_effects(self.inner())
    }

    /// See [`Feature::disposal_effects`].
    fn disposal_effects(&self) -> &[EffectOf<Self::Inner>] {
        Feature::disposal_effects(self.inner())
    }
}

impl<P: FeatureProxy> Feature for P {
    type State = StateOf<P::Inner>;
    type Message = MessageOf<P::Inner>;
    type Effect = EffectOf<P::Inner>;

    fn name(&self) -> &str {
        FeatureProxy::name(self)
    }

    fn state(&self) -> Self::State {
        FeatureProxy::state(self)
    }

    fn state_changes(&self) -> broadcast::Receiver<Self::State> {
        FeatureProxy::state_changes(self)
    }

    fn effects(&self) -> broadcast::Receiver<Self::Effect> {
        FeatureProxy::effects(self)
    }

    fn emitter(&self) -> Emitter<Self::Message> {
        FeatureProxy::emitter(self)
    }

    fn accept(&self, message: Self::Message) -> Result<(), FeatureError> {
        FeatureProxy::accept(self, message)
    }

    fn init(&self) -> impl Future<Output = Result<(), FeatureError>> + Send {
        FeatureProxy::init(self)
    }

    fn dispose(&self) -> impl Future<Output = Result<(), FeatureError>> + Send {
        FeatureProxy::dispose(self)
    }

    fn lifecycle(&self) -> Lifecycle {
        FeatureProxy::lifecycle(self)
    }

    fn initial_effects(&self) -> &[Self::Effect] {
        FeatureProxy::initial_effects(self)
    }

    fn disposal_effects(&self) -> &[Self::Effect] {
        FeatureProxy::disposal_effects(self)
    }
}
