//! # sluice-std
//!
//! Standard implementations for the Sluice state-update engine.
//!
//! This crate provides:
//! - **Runtime**: [`FeatureRuntime`], [`FeatureBuilder`], [`FeatureConfig`]
//! - **Handler adapters**: [`handler_fn`], [`sync_handler_fn`], [`Synchronous`]
//! - **Strategies**: [`Sequential`], [`Debounce`], [`Isolated`], [`HandlerExt`]
//! - **Decorators**: [`Observed`], [`EffectSubset`], [`TracingObserver`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use sluice_core;

mod dispatch;

pub mod decorators;
pub mod handlers;
pub mod runtime;
pub mod strategies;
pub mod testing;

pub use decorators::{EffectSubset, FeatureObserver, Observed, TracingObserver};
pub use handlers::{FnHandler, SyncFnHandler, Synchronous, handler_fn, sync_handler_fn};
pub use runtime::{FeatureBuilder, FeatureConfig, FeatureRuntime};
pub use strategies::{
    Debounce, HandlerExt, Isolated, Overflow, QueuePolicy, Sequential, WorkerSignal,
    spawn_isolated,
};
