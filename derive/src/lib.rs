//! Derive macros for the `BitcoinSerialize` / `BitcoinDeserialize` traits.
//!
//! These mirror the hand-written `Serialize`/`Deserialize` impls: a struct's
//! fields are written/read in declaration order. Enums are not supported —
//! every enum in this workspace has a non-trivial wire tag, so its impl is
//! written by hand instead.

extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(BtcDeserialize)]
pub fn deserializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    deserialize::impl_deser_macro(&ast)
}

#[proc_macro_derive(BtcSerialize)]
pub fn serializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    serialize::impl_ser_macro(&ast)
}
