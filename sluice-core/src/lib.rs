//! # sluice-core
//!
//! Core traits for the Sluice unidirectional state-update engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! handler libraries and decorators that don't need the full `sluice-std`
//! runtime.
//!
//! # Two Halves
//!
//! Sluice separates deciding from doing:
//!
//! ## Pure: [`Update`]
//!
//! `(state, message) -> Next { state?, effects }`. No I/O, no awaiting.
//! Every consequence of a message is either a new state value or an effect
//! described as data.
//!
//! ## Impure: [`EffectHandler`]
//!
//! Handlers are offered every effect, execute the ones they understand and
//! feed follow-up messages back through an [`Emitter`]. Synchronous handlers
//! implement [`SyncEffectHandler`]; runtimes store handlers as
//! [`DynEffectHandler`] trait objects.
//!
//! # The Feature
//!
//! [`Feature`] is the contract of the runtime that sits between the halves:
//! it owns the state, serializes `accept`, publishes state changes and
//! effects, and manages the lifecycle described by [`Lifecycle`].
//! [`FeatureProxy`] is the forwarding base for decorators.
//!
//! # Error Types
//!
//! - [`SluiceError`] - Top-level error type
//! - [`FeatureError`] - Lifecycle and poisoning errors
//! - [`HandlerError`] - Effect handler errors
//! - [`EmitError`] - Emission errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod emitter;
mod error;
mod feature;
mod handler;
mod lifecycle;
mod message;
mod next;
mod update;

// Re-exports
pub use emitter::Emitter;
pub use error::{BoxError, EmitError, FeatureError, HandlerError, SluiceError};
pub use feature::{EffectOf, Feature, FeatureProxy, MessageOf, StateOf};
pub use handler::{DynEffectHandler, EffectHandler, HandlerFuture, SyncEffectHandler};
pub use lifecycle::{Lifecycle, Operation};
pub use message::Message;
pub use next::Next;
pub use update::Update;
