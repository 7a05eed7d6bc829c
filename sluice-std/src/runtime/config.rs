//! Runtime configuration.

use std::borrow::Cow;

/// Tuning knobs for a [`FeatureRuntime`](crate::FeatureRuntime).
///
/// # Example
///
/// ```rust,ignore
/// let config = FeatureConfig::default()
///     .with_name("counter")
///     .with_state_capacity(16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureConfig {
    /// Name used in log records.
    pub name: Cow<'static, str>,
    /// Buffer size of the state-change stream.
    pub state_capacity: usize,
    /// Buffer size of the effect stream.
    pub effect_capacity: usize,
}

impl FeatureConfig {
    /// Default buffer size for both streams.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Set the name used in log records.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the state-change stream buffer. Values below 1 are raised to 1.
    pub fn with_state_capacity(mut self, capacity: usize) -> Self {
        self.state_capacity = capacity.max(1);
        self
    }

    /// Set the effect stream buffer. Values below 1 are raised to 1.
    pub fn with_effect_capacity(mut self, capacity: usize) -> Self {
        self.effect_capacity = capacity.max(1);
        self
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("feature"),
            state_capacity: Self::DEFAULT_CAPACITY,
            effect_capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
