//! Observer decorator.

use sluice_core::{
    EffectOf, Feature, FeatureError, FeatureProxy, MessageOf, StateOf,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};

/// Callbacks invoked by [`Observed`]. Every method defaults to a no-op.
///
/// `on_message` runs synchronously inside `accept`, before the message
/// reaches the wrapped feature. `on_state` and `on_effect` run on background
/// tasks subscribed to the feature's streams, so they observe a change at
/// least one scheduler tick after it was committed.
pub trait FeatureObserver<S, M, E>: Send + Sync + 'static {
    /// The wrapped feature was initialized.
    fn on_init(&self) {}

    /// The wrapped feature was disposed.
    ///
    /// Runs after every `on_state` and `on_effect` callback.
    fn on_dispose(&self) {}

    /// A message is about to be accepted.
    fn on_message(&self, message: &M) {
        let _ = message;
    }

    /// A state was committed.
    fn on_state(&self, state: &S) {
        let _ = state;
    }

    /// An effect was produced.
    fn on_effect(&self, effect: &E) {
        let _ = effect;
    }
}

/// Wraps a feature and reports its activity to a [`FeatureObserver`].
///
/// # Example
///
/// ```rust,ignore
/// let feature = Observed::new(runtime, TracingObserver::named("counter"));
/// feature.init().await?;
/// feature.accept(CounterMsg::Increment)?;
/// ```
pub struct Observed<F, O> {
    inner: F,
    observer: Arc<O>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl<F, O> Observed<F, O> {
    /// Wrap `inner`, reporting to `observer`.
    pub fn new(inner: F, observer: O) -> Self {
        Self {
            inner,
            observer: Arc::new(observer),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Get a reference to the observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }
}

impl<F, O> FeatureProxy for Observed<F, O>
where
    F: Feature,
    O: FeatureObserver<StateOf<F>, MessageOf<F>, EffectOf<F>>,
{
    type Inner = F;

    fn inner(&self) -> &F {
        &self.inner
    }

    fn accept(&self, message: MessageOf<F>) -> Result<(), FeatureError> {
        self.observer.on_message(&message);
        Feature::accept(&self.inner, message)
    }

    async fn init(&self) -> Result<(), FeatureError> {
        let handle = Handle::try_current().map_err(|_| FeatureError::NoRuntime)?;
        let states = Feature::state_changes(&self.inner);
        let effects = Feature::effects(&self.inner);

        Feature::init(&self.inner).await?;

        let on_state = Arc::clone(&self.observer);
        let on_effect = Arc::clone(&self.observer);
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.push(handle.spawn(watch(states, move |state| on_state.on_state(state))));
        watchers.push(handle.spawn(watch(effects, move |effect| on_effect.on_effect(effect))));
        drop(watchers);

        self.observer.on_init();
        Ok(())
    }

    async fn dispose(&self) -> Result<(), FeatureError> {
        if Feature::lifecycle(&self.inner).is_disposed() {
            return Ok(());
        }
        Feature::dispose(&self.inner).await?;

        // The inner streams are closed now; let the watchers drain them.
        let watchers = std::mem::take(
            &mut *self.watchers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for watcher in watchers {
            let _ = watcher.await;
        }

        self.observer.on_dispose();
        Ok(())
    }
}

async fn watch<T, C>(mut stream: broadcast::Receiver<T>, callback: C)
where
    T: Clone,
    C: Fn(&T),
{
    loop {
        match stream.recv().await {
            Ok(item) => callback(&item),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "observer lagged behind feature");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
