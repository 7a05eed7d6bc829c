//! # Transition Function (Update)
//!
//! The pure half of a feature. An [`Update`] looks at the current state and
//! one message and decides what happens next: maybe a new state, maybe some
//! effects. It never performs I/O and never awaits; everything impure is
//! described as an effect and executed later by an [`EffectHandler`].
//!
//! # Usage Patterns
//!
//! 1. **Closure**: `|state: &i32, msg: CounterMsg| Next::state(state + 1)`
//! 2. **Struct implementation**: `impl Update<State, Msg, Effect> for MyLogic`
//!
//! [`EffectHandler`]: crate::EffectHandler

use crate::next::Next;

/// A pure transition function: `(state, message) -> Next`.
///
/// Calling `update` twice with equal inputs must produce equal outputs, and it
/// must have no observable side effects. A panic inside `update` is not caught
/// by the runtime; it propagates to whoever called `accept`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot update state `{S}` with message `{M}`",
    label = "missing `Update<{S}, {M}, {E}>` implementation",
    note = "Use a closure `Fn(&{S}, {M}) -> Next<{S}, {E}>` or implement `Update` directly."
)]
pub trait Update<S, M, E>: Send + Sync + 'static {
    /// Compute the next state and effects.
    fn update(&self, state: &S, message: M) -> Next<S, E>;
}

// Blanket impl for closures
impl<S, M, E, F> Update<S, M, E> for F
where
    F: Fn(&S, M) -> Next<S, E> + Send + Sync + 'static,
{
    fn update(&self, state: &S, message: M) -> Next<S, E> {
        (self)(state, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Update<i32, i32, ()> for Doubler {
        fn update(&self, state: &i32, message: i32) -> Next<i32, ()> {
            Next::state(state * 2 + message)
        }
    }

    #[test]
    fn test_closure_update() {
        let update = |state: &i32, delta: i32| -> Next<i32, &'static str> {
            Next::state(state + delta).with_effect("changed")
        };
        let next = Update::update(&update, &1, 2);
        assert_eq!(next.state, Some(3));
        assert_eq!(next.effects, vec!["changed"]);
    }

    #[test]
    fn test_struct_update() {
        assert_eq!(Doubler.update(&2, 1).state, Some(5));
    }
}
