//! # Feature Runtime
//!
//! [`FeatureRuntime`] is the stateful engine: it owns the current state,
//! serializes `accept`, publishes state changes and effects, and drives the
//! dispatcher that offers effects to handlers.
//!
//! Two background tasks exist while the runtime is running:
//!
//! - the **dispatcher** drains the ordered effect queue and drives every
//!   handler future (see `dispatch`);
//! - the **pump** drains the message channel behind [`Emitter`] and feeds
//!   each emitted message through the same serialized path as `accept`.
//!
//! Emission is therefore always a channel send; a handler never calls back
//! into the transition function directly.

mod builder;
mod config;

pub use builder::FeatureBuilder;
pub use config::FeatureConfig;

use crate::dispatch::{self, Dispatch, Fanout, HandlerList};
use sluice_core::{
    Emitter, Feature, FeatureError, Lifecycle, Message, Next, Operation, Update,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};

/// The feature runtime.
///
/// # Example
///
/// ```rust,ignore
/// let counter = FeatureRuntime::builder(0, |state: &i32, msg: CounterMsg| match msg {
///     CounterMsg::Increment => Next::state(state + 1),
///     CounterMsg::Decrement => Next::state(state - 1),
/// })
/// .name("counter")
/// .build();
///
/// counter.init().await?;
/// counter.accept(CounterMsg::Increment)?;
/// assert_eq!(counter.state(), 1);
/// counter.dispose().await?;
/// ```
pub struct FeatureRuntime<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    shared: Arc<Shared<S, M, E>>,
    handlers: HandlerList<E, M>,
    initial_effects: Vec<E>,
    disposal_effects: Vec<E>,
    messages: mpsc::UnboundedSender<M>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<M>>>,
    tasks: Mutex<Tasks>,
}

#[derive(Default)]
struct Tasks {
    pump: Option<Pump>,
    dispatcher: Option<JoinHandle<()>>,
}

/// The message pump task and its shutdown signal.
struct Pump {
    task: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

/// State shared with the pump task.
struct Shared<S, M, E> {
    name: Arc<str>,
    update: Box<dyn Update<S, M, E>>,
    core: Mutex<Core<S, E>>,
}

/// Everything guarded by the serialization lock.
struct Core<S, E> {
    lifecycle: Lifecycle,
    state: S,
    states: Option<broadcast::Sender<S>>,
    effects: Option<broadcast::Sender<E>>,
    dispatch: Option<mpsc::UnboundedSender<Dispatch<E>>>,
}

impl<S, M, E> Shared<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    /// Lock the core, looking through poisoning.
    ///
    /// A panicking transition never reaches the commit, so the stored state
    /// is still the last committed value.
    fn lock(&self) -> MutexGuard<'_, Core<S, E>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one message through the transition function and commit the result.
    fn apply(&self, message: M) -> Result<(), FeatureError> {
        let mut guard = self.core.lock().map_err(|_| FeatureError::Poisoned)?;
        let core = &mut *guard;

        if !core.lifecycle.is_running() {
            return Err(FeatureError::Lifecycle {
                operation: Operation::Accept,
                lifecycle: core.lifecycle,
            });
        }

        let Next { state, effects } = self.update.update(&core.state, message);

        if let Some(state) = state {
            if let Some(states) = &core.states {
                let _ = states.send(state.clone());
            }
            core.state = state;
            tracing::debug!(feature = %self.name, "state committed");
        }

        if !effects.is_empty() {
            tracing::debug!(feature = %self.name, count = effects.len(), "effects produced");
        }
        for effect in effects {
            if let Some(stream) = &core.effects {
                let _ = stream.send(effect.clone());
            }
            if let Some(dispatch) = &core.dispatch {
                let _ = dispatch.send(Dispatch::Effect(effect));
            }
        }

        Ok(())
    }
}

impl<S, M, E> FeatureRuntime<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    /// A runtime with no handlers and no initial or disposal effects.
    pub fn new(initial_state: S, update: impl Update<S, M, E>) -> Self {
        FeatureBuilder::new(initial_state, update).build()
    }

    /// Start building a runtime.
    pub fn builder(initial_state: S, update: impl Update<S, M, E>) -> FeatureBuilder<S, M, E> {
        FeatureBuilder::new(initial_state, update)
    }

    pub(crate) fn from_parts(
        initial_state: S,
        update: Box<dyn Update<S, M, E>>,
        handlers: HandlerList<E, M>,
        initial_effects: Vec<E>,
        disposal_effects: Vec<E>,
        config: FeatureConfig,
    ) -> Self {
        let (states, _) = broadcast::channel(config.state_capacity.max(1));
        let (effects, _) = broadcast::channel(config.effect_capacity.max(1));
        let (messages, inbox) = mpsc::unbounded_channel();

        Self {
            shared: Arc::new(Shared {
                name: Arc::from(config.name.as_ref()),
                update,
                core: Mutex::new(Core {
                    lifecycle: Lifecycle::Uninitialized,
                    state: initial_state,
                    states: Some(states),
                    effects: Some(effects),
                    dispatch: None,
                }),
            }),
            handlers,
            initial_effects,
            disposal_effects,
            messages,
            inbox: Mutex::new(Some(inbox)),
            tasks: Mutex::new(Tasks::default()),
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, M, E> Feature for FeatureRuntime<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    type State = S;
    type Message = M;
    type Effect = E;

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn state(&self) -> S {
        self.shared.lock().state.clone()
    }

    fn state_changes(&self) -> broadcast::Receiver<S> {
        match &self.shared.lock().states {
            Some(states) => states.subscribe(),
            None => closed_receiver(),
        }
    }

    fn effects(&self) -> broadcast::Receiver<E> {
        match &self.shared.lock().effects {
            Some(effects) => effects.subscribe(),
            None => closed_receiver(),
        }
    }

    fn emitter(&self) -> Emitter<M> {
        Emitter::new(self.messages.clone())
    }

    fn accept(&self, message: M) -> Result<(), FeatureError> {
        self.shared.apply(message)
    }

    async fn init(&self) -> Result<(), FeatureError> {
        let handle = Handle::try_current().map_err(|_| FeatureError::NoRuntime)?;

        let commands = {
            let mut core = self.shared.core.lock().map_err(|_| FeatureError::Poisoned)?;
            if core.lifecycle != Lifecycle::Uninitialized {
                return Err(FeatureError::Lifecycle {
                    operation: Operation::Init,
                    lifecycle: core.lifecycle,
                });
            }

            let (dispatch, commands) = mpsc::unbounded_channel();
            for effect in &self.initial_effects {
                let _ = dispatch.send(Dispatch::Effect(effect.clone()));
            }
            core.dispatch = Some(dispatch);
            core.lifecycle = Lifecycle::Running;
            commands
        };

        let fanout = Fanout::new(
            Arc::clone(&self.shared.name),
            Arc::clone(&self.handlers),
            self.emitter(),
        );
        let inbox = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut tasks = self.tasks();
        tasks.dispatcher = Some(handle.spawn(fanout.run(commands)));
        if let Some(inbox) = inbox {
            let (stop, stopped) = oneshot::channel();
            tasks.pump = Some(Pump {
                task: handle.spawn(pump(Arc::clone(&self.shared), inbox, stopped)),
                stop,
            });
        }

        tracing::info!(
            feature = %self.shared.name,
            handlers = self.handlers.len(),
            initial_effects = self.initial_effects.len(),
            "feature initialized"
        );
        Ok(())
    }

    async fn dispose(&self) -> Result<(), FeatureError> {
        let (dispatch, previous) = {
            let mut core = self.shared.lock();
            if core.lifecycle.is_disposed() {
                return Ok(());
            }
            let previous = core.lifecycle;
            core.lifecycle = Lifecycle::Disposed;
            (core.dispatch.take(), previous)
        };
        tracing::info!(feature = %self.shared.name, from = %previous, "disposing feature");

        if let Some(dispatch) = dispatch {
            for effect in &self.disposal_effects {
                let _ = dispatch.send(Dispatch::Effect(effect.clone()));
            }
            dispatch::flush(&dispatch).await;
        }

        for handler in self.handlers.iter() {
            handler.dispose_dyn().await;
        }

        {
            let mut core = self.shared.lock();
            core.states = None;
            core.effects = None;
        }

        // Emitters fail with `Closed` from here on.
        drop(self.inbox.lock().unwrap_or_else(PoisonError::into_inner).take());
        let pump = {
            let mut tasks = self.tasks();
            // In-flight handlers run to completion; the dispatcher exits on its own.
            tasks.dispatcher = None;
            tasks.pump.take()
        };
        if let Some(Pump { task, stop }) = pump {
            let _ = stop.send(());
            let _ = task.await;
        }

        tracing::info!(feature = %self.shared.name, "feature disposed");
        Ok(())
    }

    fn lifecycle(&self) -> Lifecycle {
        self.shared.lock().lifecycle
    }

    fn initial_effects(&self) -> &[E] {
        &self.initial_effects
    }

    fn disposal_effects(&self) -> &[E] {
        &self.disposal_effects
    }
}

impl<S, M, E> Drop for FeatureRuntime<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pump) = tasks.pump.take() {
            pump.task.abort();
        }
        if let Some(dispatcher) = tasks.dispatcher.take() {
            dispatcher.abort();
        }
    }
}

/// Feed emitted messages through the serialized transition path until
/// `stop` fires, then close the channel.
async fn pump<S, M, E>(
    shared: Arc<Shared<S, M, E>>,
    mut inbox: mpsc::UnboundedReceiver<M>,
    mut stop: oneshot::Receiver<()>,
) where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    loop {
        let message = tokio::select! {
            _ = &mut stop => break,
            message = inbox.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        match shared.apply(message) {
            Ok(()) => {}
            Err(FeatureError::Poisoned) => {
                tracing::error!(feature = %shared.name, "feature is poisoned; stopping message pump");
                break;
            }
            Err(error) => {
                tracing::debug!(feature = %shared.name, %error, "dropping emitted message");
            }
        }
    }
    inbox.close();
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    broadcast::channel(1).1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHandler;

    fn counter(state: &i32, delta: i32) -> Next<i32, i32> {
        Next::state(state + delta).with_effect(delta)
    }

    #[tokio::test]
    async fn test_accept_before_init_fails() {
        let runtime = FeatureRuntime::new(0, counter);
        let err = runtime.accept(1).unwrap_err();
        assert_eq!(
            err,
            FeatureError::Lifecycle {
                operation: Operation::Accept,
                lifecycle: Lifecycle::Uninitialized,
            }
        );
        assert_eq!(runtime.state(), 0);
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let runtime = FeatureRuntime::new(0, counter);
        runtime.init().await.unwrap();
        assert!(matches!(
            runtime.init().await,
            Err(FeatureError::Lifecycle {
                operation: Operation::Init,
                lifecycle: Lifecycle::Running,
            })
        ));
        runtime.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_commits_and_dispatches() {
        let recorder = RecordingHandler::<i32>::new();
        let runtime = FeatureRuntime::builder(0, counter)
            .handler(recorder.clone())
            .build();
        runtime.init().await.unwrap();

        runtime.accept(2).unwrap();
        runtime.accept(3).unwrap();
        assert_eq!(runtime.state(), 5);

        assert!(recorder.wait_for(2, std::time::Duration::from_secs(1)).await);
        assert_eq!(recorder.effects(), vec![2, 3]);
        runtime.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn test_streams_close_after_dispose() {
        let runtime = FeatureRuntime::new(0, counter);
        let mut states = runtime.state_changes();
        runtime.init().await.unwrap();
        runtime.dispose().await.unwrap();

        assert!(matches!(
            states.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert!(matches!(
            runtime.effects().recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn test_init_without_runtime_fails() {
        let runtime = FeatureRuntime::new(0, counter);
        let result = futures::executor::block_on(runtime.init());
        assert_eq!(result, Err(FeatureError::NoRuntime));
        assert_eq!(runtime.lifecycle(), Lifecycle::Uninitialized);
    }
}
