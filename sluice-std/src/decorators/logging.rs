//! Logging observer.

use super::observer::FeatureObserver;
use std::{borrow::Cow, fmt::Debug};

/// An observer that logs every callback at `debug` level.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    name: Cow<'static, str>,
}

impl TracingObserver {
    /// An observer logging under the name `feature`.
    pub fn new() -> Self {
        Self::named("feature")
    }

    /// An observer logging under the given feature name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    /// The name used in log records.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M, E> FeatureObserver<S, M, E> for TracingObserver
where
    S: Debug,
    M: Debug,
    E: Debug,
{
    fn on_init(&self) {
        tracing::debug!(feature = %self.name, "feature initialized");
    }

    fn on_dispose(&self) {
        tracing::debug!(feature = %self.name, "feature disposed");
    }

    fn on_message(&self, message: &M) {
        tracing::debug!(feature = %self.name, ?message, "message");
    }

    fn on_state(&self, state: &S) {
        tracing::debug!(feature = %self.name, ?state, "state");
    }

    fn on_effect(&self, effect: &E) {
        tracing::debug!(feature = %self.name, ?effect, "effect");
    }
}
