//! Procedural macros for Sluice.
//!
//! - `#[derive(Message)]` - implement the `Message` marker trait

use proc_macro::TokenStream;

mod message;

/// Derive macro for implementing the `Message` trait.
///
/// Every type parameter gets a `Message` bound. The trait path defaults to
/// `::sluice::Message`; crates depending on `sluice-core` directly can point
/// it elsewhere:
///
/// ```rust,ignore
/// #[derive(Message)]
/// #[sluice(crate = sluice_core)]
/// enum Effect { Save(String) }
/// ```
#[proc_macro_derive(Message, attributes(sluice))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    message::derive_message_impl(input)
}
