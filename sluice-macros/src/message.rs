//! `#[derive(Message)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Ident, Path, Token,
    parse::{Parse, ParseStream},
    parse_macro_input, parse_quote,
};

/// Arguments of the `#[sluice(...)]` helper attribute.
struct MessageArgs {
    krate: Option<Path>,
}

impl Parse for MessageArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut krate = None;

        while !input.is_empty() {
            if input.peek(Token![crate]) {
                input.parse::<Token![crate]>()?;
                input.parse::<Token![=]>()?;
                krate = Some(input.parse()?);
            } else {
                let ident: Ident = input.parse()?;
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown attribute: {}", ident),
                ));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(MessageArgs { krate })
    }
}

pub(crate) fn derive_message_impl(input: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(input as DeriveInput);

    let mut krate: Path = parse_quote!(::sluice);
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("sluice")) {
        match attr.parse_args::<MessageArgs>() {
            Ok(MessageArgs { krate: Some(path) }) => krate = path,
            Ok(MessageArgs { krate: None }) => {}
            Err(error) => return error.to_compile_error().into(),
        }
    }

    for param in input.generics.type_params_mut() {
        param.bounds.push(parse_quote!(#krate::Message));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #krate::Message for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}
