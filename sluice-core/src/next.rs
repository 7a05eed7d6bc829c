//! The result of a single transition.

/// What a transition decided: an optional replacement state and the effects
/// to dispatch, in order.
///
/// `state: None` means "no change". The effects list may be empty; when it is
/// not, handlers are offered the effects in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Next<S, E> {
    /// The new state, or `None` to keep the current one.
    pub state: Option<S>,
    /// Effects to dispatch, in order.
    pub effects: Vec<E>,
}

impl<S, E> Next<S, E> {
    /// Create a result from its parts.
    pub fn new(state: Option<S>, effects: Vec<E>) -> Self {
        Self { state, effects }
    }

    /// No state change and no effects.
    pub fn none() -> Self {
        Self {
            state: None,
            effects: Vec::new(),
        }
    }

    /// Replace the state without requesting effects.
    pub fn state(state: S) -> Self {
        Self {
            state: Some(state),
            effects: Vec::new(),
        }
    }

    /// Keep the state and request effects.
    pub fn effects(effects: impl IntoIterator<Item = E>) -> Self {
        Self {
            state: None,
            effects: effects.into_iter().collect(),
        }
    }

    /// Append one effect.
    pub fn with_effect(mut self, effect: E) -> Self {
        self.effects.push(effect);
        self
    }

    /// Returns `true` if neither state nor effects were produced.
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.effects.is_empty()
    }
}

impl<S, E> Default for Next<S, E> {
    fn default() -> Self {
        Self::none()
    }
}
