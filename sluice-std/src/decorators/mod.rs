//! # Decorators
//!
//! Wrappers that add cross-cutting behavior to a [`Feature`] without touching
//! it. Each decorator is a [`FeatureProxy`]: it forwards everything to the
//! wrapped feature and overrides only the operations it augments. Because a
//! proxy is itself a `Feature`, decorators stack.
//!
//! - [`Observed`]: report messages, states, effects and lifecycle to a [`FeatureObserver`]
//! - [`EffectSubset`]: route one variant of the effect type to a dedicated handler
//! - [`TracingObserver`]: a `FeatureObserver` that logs through `tracing`
//!
//! [`Feature`]: sluice_core::Feature
//! [`FeatureProxy`]: sluice_core::FeatureProxy

mod logging;
mod observer;
mod subset;

pub use logging::TracingObserver;
pub use observer::{FeatureObserver, Observed};
pub use subset::EffectSubset;
