use proc_macro::TokenStream;
use quote::quote;
use syn;

pub fn impl_deser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let data = match ast.data {
        syn::Data::Struct(ref data) => data,
        _ => panic!("BtcDeserialize can only be derived for structs; write enum impls by hand"),
    };

    let is_tuple_struct = matches!(data.fields, syn::Fields::Unnamed(_));

    let statements: Vec<quote::__private::TokenStream> = data
        .fields
        .iter()
        .map(|field| deserialize_field(field))
        .collect();

    let expanded = if is_tuple_struct {
        quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError>
                {
                    Ok(#name (
                        #(#statements)*
                    ))
                }
            }
        }
    } else {
        quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError>
                {
                    Ok(#name {
                        #(#statements)*
                    })
                }
            }
        }
    };

    TokenStream::from(expanded)
}

fn deserialize_field(field: &syn::Field) -> quote::__private::TokenStream {
    let ty = field.ty.clone();
    match field.ident.clone() {
        Some(name) => {
            quote! { #name: <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
        }
        None => {
            quote! { <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
        }
    }
}
