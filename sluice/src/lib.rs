//! # sluice - Unidirectional State-Update Engine
//!
//! A feature owns one state value. Messages go in through
//! [`accept`](Feature::accept), a pure transition function decides the next
//! state and the effects to run, and effect handlers perform those effects,
//! feeding follow-up messages back in.
//!
//! ```text
//! accept(msg) ─▶ update(&state, msg) ─▶ Next { state?, effects }
//!                                          │           │
//!                                   state_changes()   effects() + handlers
//!                                                          │
//!                              accept ◀── Emitter ◀────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sluice::prelude::*;
//!
//! #[derive(Debug, Message)]
//! enum Msg { AskRandom, SetCounter(u32) }
//!
//! #[derive(Debug, Clone, Message)]
//! enum Effect { GetRandom { min: u32, max: u32 } }
//!
//! fn update(_state: &u32, msg: Msg) -> Next<u32, Effect> {
//!     match msg {
//!         Msg::AskRandom => Next::none().with_effect(Effect::GetRandom { min: 0, max: 100 }),
//!         Msg::SetCounter(value) => Next::state(value),
//!     }
//! }
//!
//! let random = handler_fn(|effect: Effect, emit: Emitter<Msg>| async move {
//!     let Effect::GetRandom { min, max } = effect;
//!     let _ = emit.emit(Msg::SetCounter(pick(min, max)));
//!     Ok(())
//! });
//!
//! let feature = FeatureRuntime::builder(0, update)
//!     .handler(random.sequential())
//!     .build();
//!
//! feature.init().await?;
//! feature.accept(Msg::AskRandom)?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use sluice_core::{
    // Error types
    BoxError,
    // Handler
    DynEffectHandler,
    EffectHandler,
    // Feature
    EffectOf,
    EmitError,
    // Emission
    Emitter,
    Feature,
    FeatureError,
    FeatureProxy,
    HandlerError,
    HandlerFuture,
    Lifecycle,
    // Message
    Message,
    MessageOf,
    // Transition
    Next,
    Operation,
    SluiceError,
    StateOf,
    SyncEffectHandler,
    Update,
};

// Runtime
pub use sluice_std::{FeatureBuilder, FeatureConfig, FeatureRuntime};

// Handler adapters
pub use sluice_std::{FnHandler, SyncFnHandler, Synchronous, handler_fn, sync_handler_fn};

/// Effect-handler strategies.
pub mod strategies {
    pub use sluice_std::strategies::{
        Debounce, HandlerExt, Isolated, Overflow, QueuePolicy, Sequential, WorkerSignal,
        spawn_isolated,
    };
}

/// Feature decorators.
pub mod decorators {
    pub use sluice_std::decorators::{EffectSubset, FeatureObserver, Observed, TracingObserver};
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use sluice_std::testing::*;
}

/// Prelude module - common imports for Sluice.
///
/// [`FeatureProxy`] is left out: with both it and [`Feature`] in scope,
/// method calls on decorators are ambiguous. Import it where a decorator is
/// implemented.
///
/// # Usage
///
/// ```rust,ignore
/// use sluice::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        BoxError,
        EffectHandler,
        EmitError,
        Emitter,
        // Core traits
        Feature,
        FeatureError,
        FeatureRuntime,
        HandlerError,
        Message,
        Next,
        SyncEffectHandler,
        Update,
        // Adapters
        handler_fn,
        strategies::HandlerExt,
        sync_handler_fn,
    };
}

#[cfg(feature = "macros")]
pub use sluice_macros::Message;
