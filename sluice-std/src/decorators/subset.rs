//! Effect-subset decorator.

use crate::dispatch::{self, Dispatch, Fanout, HandlerList};
use sluice_core::{
    DynEffectHandler, EffectHandler, EffectOf, Emitter, Feature, FeatureError, FeatureProxy,
    Message, MessageOf,
};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};

/// Routes one variant of a feature's effect type to a dedicated handler.
///
/// `select` projects an effect onto the subset (`Some`) or rejects it
/// (`None`). Matching effects from the feature's effect stream, its initial
/// effects (replayed at `init`) and its disposal effects (replayed at
/// `dispose`) are offered to `handler`. Messages the handler emits are
/// accepted by the wrapped feature.
///
/// At `dispose` every effect already on the feature's stream is still
/// routed, followed by the disposal effects; then the handler's disposal hook
/// is awaited before the wrapped feature is disposed.
///
/// # Example
///
/// ```rust,ignore
/// let feature = EffectSubset::new(
///     runtime,
///     |effect: &Effect| match effect {
///         Effect::GetRandom { min, max } => Some((*min, *max)),
///         _ => None,
///     },
///     RandomHandler::new(),
/// );
/// ```
pub struct EffectSubset<F, Sub, H, Sel> {
    inner: Arc<F>,
    select: Arc<Sel>,
    handler: Arc<H>,
    link: Mutex<Option<Link<Sub>>>,
    disposed: AtomicBool,
}

/// Tasks connecting the wrapped feature to the dedicated handler.
struct Link<Sub> {
    commands: mpsc::UnboundedSender<Dispatch<Sub>>,
    forwarder: JoinHandle<()>,
    /// Tells the forwarder to route what is left on the stream and stop.
    stop: oneshot::Sender<()>,
    pump: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl<F, Sub, H, Sel> EffectSubset<F, Sub, H, Sel> {
    /// Wrap `inner`, routing effects picked by `select` to `handler`.
    pub fn new(inner: F, select: Sel, handler: H) -> Self {
        Self {
            inner: Arc::new(inner),
            select: Arc::new(select),
            handler: Arc::new(handler),
            link: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Get a reference to the dedicated handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn link(&self) -> MutexGuard<'_, Option<Link<Sub>>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F, Sub, H, Sel> EffectSubset<F, Sub, H, Sel>
where
    F: Feature,
    Sel: Fn(&EffectOf<F>) -> Option<Sub> + Send + Sync + 'static,
{
    fn replay(&self, effects: &[EffectOf<F>], commands: &mpsc::UnboundedSender<Dispatch<Sub>>) {
        for sub in effects.iter().filter_map(&*self.select) {
            let _ = commands.send(Dispatch::Effect(sub));
        }
    }
}

impl<F, Sub, H, Sel> FeatureProxy for EffectSubset<F, Sub, H, Sel>
where
    F: Feature,
    Sub: Message + Clone,
    H: EffectHandler<Sub, MessageOf<F>>,
    Sel: Fn(&EffectOf<F>) -> Option<Sub> + Send + Sync + 'static,
{
    type Inner = F;

    fn inner(&self) -> &F {
        &self.inner
    }

    async fn init(&self) -> Result<(), FeatureError> {
        let handle = Handle::try_current().map_err(|_| FeatureError::NoRuntime)?;
        let effects = Feature::effects(&*self.inner);

        Feature::init(&*self.inner).await?;

        let (commands, queue) = mpsc::unbounded_channel();
        self.replay(Feature::initial_effects(&*self.inner), &commands);

        let (messages, inbox) = Emitter::channel();
        let handlers: HandlerList<Sub, MessageOf<F>> =
            Arc::from(vec![self.handler.clone() as Arc<dyn DynEffectHandler<Sub, MessageOf<F>>>]);
        let name: Arc<str> = Arc::from(format!("{}/effect-subset", Feature::name(&*self.inner)));
        let fanout = Fanout::new(Arc::clone(&name), handlers, messages);
        let (stop, stopped) = oneshot::channel();

        let link = Link {
            forwarder: handle.spawn(forward(
                name,
                effects,
                Arc::clone(&self.select),
                commands.clone(),
                stopped,
            )),
            stop,
            pump: handle.spawn(pump(Arc::clone(&self.inner), inbox)),
            dispatcher: handle.spawn(fanout.run(queue)),
            commands,
        };
        if let Some(stale) = self.link().replace(link) {
            stale.abort();
        }
        Ok(())
    }

    async fn dispose(&self) -> Result<(), FeatureError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let link = self.link().take();
        let pump = match link {
            Some(Link {
                commands,
                forwarder,
                stop,
                pump,
                ..
            }) => {
                let _ = stop.send(());
                let _ = forwarder.await;
                self.replay(Feature::disposal_effects(&*self.inner), &commands);
                dispatch::flush(&commands).await;
                // Dropping `commands` lets the dispatcher finish in-flight work and exit.
                Some(pump)
            }
            None => None,
        };
        EffectHandler::dispose(&*self.handler).await;

        let outcome = Feature::dispose(&*self.inner).await;
        if let Some(pump) = pump {
            pump.abort();
        }
        outcome
    }
}

impl<Sub> Link<Sub> {
    /// Abort every task without routing anything further.
    fn abort(&self) {
        self.forwarder.abort();
        self.pump.abort();
        self.dispatcher.abort();
    }
}

impl<F, Sub, H, Sel> Drop for EffectSubset<F, Sub, H, Sel> {
    fn drop(&mut self) {
        let link = self.link.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(link) = link.take() {
            link.abort();
        }
    }
}

/// Forward matching effects from the wrapped feature's stream.
///
/// Once `stop` fires, effects already on the stream are still forwarded
/// before the task exits.
async fn forward<E, Sub, Sel>(
    name: Arc<str>,
    mut effects: broadcast::Receiver<E>,
    select: Arc<Sel>,
    commands: mpsc::UnboundedSender<Dispatch<Sub>>,
    mut stop: oneshot::Receiver<()>,
) where
    E: Clone,
    Sel: Fn(&E) -> Option<Sub>,
{
    let route = |effect: E| match (*select)(&effect) {
        Some(sub) => commands.send(Dispatch::Effect(sub)).is_ok(),
        None => true,
    };

    loop {
        let received = tokio::select! {
            _ = &mut stop => break,
            received = effects.recv() => received,
        };
        match received {
            Ok(effect) => {
                if !route(effect) {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(feature = %name, skipped, "effect subset lagged behind feature");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }

    loop {
        match effects.try_recv() {
            Ok(effect) => {
                if !route(effect) {
                    return;
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(feature = %name, skipped, "effect subset lagged behind feature");
            }
            Err(_) => return,
        }
    }
}

/// Feed messages emitted by the dedicated handler into the wrapped feature.
async fn pump<F: Feature>(inner: Arc<F>, mut inbox: mpsc::UnboundedReceiver<MessageOf<F>>) {
    while let Some(message) = inbox.recv().await {
        match Feature::accept(&*inner, message) {
            Ok(()) => {}
            Err(FeatureError::Poisoned) => {
                tracing::error!("feature is poisoned; stopping effect subset pump");
                break;
            }
            Err(error) => tracing::debug!(%error, "dropping message from effect subset handler"),
        }
    }
}
