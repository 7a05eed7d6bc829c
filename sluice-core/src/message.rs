//! Message trait for messages and effects.

/// A marker trait for values that travel through a feature.
///
/// Both messages (intentions fed to `accept`) and effects (side effects
/// requested by the transition function) implement it. Messages must be
/// `Send + Sync + 'static` so they can cross task and thread boundaries.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Debug)]
/// enum CounterMsg { Increment, Decrement }
///
/// impl Message for CounterMsg {}
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must implement `Message` (and be `Send + Sync + 'static`)",
    note = "Add `impl Message for {Self} {}` or `#[derive(Message)]`."
)]
pub trait Message: Send + Sync + 'static {}

// Common Message implementations
impl Message for () {}
impl Message for bool {}
impl Message for i32 {}
impl Message for i64 {}
impl Message for u32 {}
impl Message for u64 {}
impl Message for usize {}
impl Message for String {}
impl Message for &'static str {}
impl<T: Message> Message for Box<T> {}
impl<T: Message> Message for std::sync::Arc<T> {}
impl<T: Message> Message for Vec<T> {}
impl<T: Message> Message for Option<T> {}
impl<T: Message, E: Message> Message for Result<T, E> {}
