//! Construction surface of a feature runtime.

use super::{FeatureRuntime, config::FeatureConfig};
use sluice_core::{DynEffectHandler, EffectHandler, Message, Update};
use std::{borrow::Cow, sync::Arc};

/// Builder for [`FeatureRuntime`].
///
/// Only the initial state and the transition function are required; the
/// handler list and both effect lists default to empty.
pub struct FeatureBuilder<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    initial_state: S,
    update: Box<dyn Update<S, M, E>>,
    handlers: Vec<Arc<dyn DynEffectHandler<E, M>>>,
    initial_effects: Vec<E>,
    disposal_effects: Vec<E>,
    config: FeatureConfig,
}

impl<S, M, E> FeatureBuilder<S, M, E>
where
    S: Clone + Send + Sync + 'static,
    M: Message,
    E: Message + Clone,
{
    /// Start building a feature.
    pub fn new(initial_state: S, update: impl Update<S, M, E>) -> Self {
        Self {
            initial_state,
            update: Box::new(update),
            handlers: Vec::new(),
            initial_effects: Vec::new(),
            disposal_effects: Vec::new(),
            config: FeatureConfig::default(),
        }
    }

    /// Register an effect handler. Handlers are offered effects in registration order.
    pub fn handler(mut self, handler: impl EffectHandler<E, M>) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Register an already shared handler.
    pub fn shared_handler(mut self, handler: Arc<dyn DynEffectHandler<E, M>>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register several shared handlers.
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = Arc<dyn DynEffectHandler<E, M>>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Add an effect dispatched once by `init`.
    pub fn initial_effect(mut self, effect: E) -> Self {
        self.initial_effects.push(effect);
        self
    }

    /// Add effects dispatched once by `init`.
    pub fn initial_effects(mut self, effects: impl IntoIterator<Item = E>) -> Self {
        self.initial_effects.extend(effects);
        self
    }

    /// Add an effect dispatched once by `dispose`.
    pub fn disposal_effect(mut self, effect: E) -> Self {
        self.disposal_effects.push(effect);
        self
    }

    /// Add effects dispatched once by `dispose`.
    pub fn disposal_effects(mut self, effects: impl IntoIterator<Item = E>) -> Self {
        self.disposal_effects.extend(effects);
        self
    }

    /// Set the name used in log records.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the runtime. It still has to be initialized with `init`.
    pub fn build(self) -> FeatureRuntime<S, M, E> {
        FeatureRuntime::from_parts(
            self.initial_state,
            self.update,
            self.handlers.into(),
            self.initial_effects,
            self.disposal_effects,
            self.config,
        )
    }
}
