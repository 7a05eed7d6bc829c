//! # Strategies
//!
//! Decorators over an [`EffectHandler`] that control *how* effects run:
//!
//! - [`Sequential`]: one at a time, in arrival order
//! - [`Debounce`]: only the last effect of a burst
//! - [`Isolated`]: each effect on its own worker thread
//!
//! Every strategy is itself an `EffectHandler`, so strategies compose:
//!
//! ```rust,ignore
//! let handler = SaveHandler::new(db)
//!     .debounce(Duration::from_millis(500))
//!     .sequential();
//! ```

mod debounce;
mod isolated;
mod sequential;

pub use debounce::Debounce;
pub use isolated::{Isolated, WorkerSignal, spawn_isolated};
pub use sequential::{Overflow, QueuePolicy, Sequential};

use sluice_core::{DynEffectHandler, EffectHandler, Message};
use std::time::Duration;

/// Extension methods wrapping a handler in a strategy.
///
/// Implemented for every type; the methods are only usable where the
/// receiver is an [`EffectHandler`].
pub trait HandlerExt: Sized + Send + Sync + 'static {
    /// Run effects one at a time, with an unbounded queue.
    fn sequential<E, M>(self) -> Sequential<Self, E, M>
    where
        Self: EffectHandler<E, M>,
        E: Message,
        M: Message,
    {
        Sequential::new(self)
    }

    /// Run effects one at a time, with the given queue policy.
    fn sequential_with<E, M>(self, policy: QueuePolicy) -> Sequential<Self, E, M>
    where
        Self: EffectHandler<E, M>,
        E: Message,
        M: Message,
    {
        Sequential::new(self).with_policy(policy)
    }

    /// Run only the last effect of each burst, after `window` of quiet.
    fn debounce(self, window: Duration) -> Debounce<Self> {
        Debounce::new(self, window)
    }

    /// Run every effect on a dedicated worker thread.
    fn isolated(self) -> Isolated<Self>
    where
        Self: Clone,
    {
        Isolated::new(self)
    }

    /// Erase the handler type.
    fn into_dyn<E, M>(self) -> Box<dyn DynEffectHandler<E, M>>
    where
        Self: EffectHandler<E, M>,
        E: Message,
        M: Message,
    {
        Box::new(self)
    }
}

impl<H: Send + Sync + 'static> HandlerExt for H {}
