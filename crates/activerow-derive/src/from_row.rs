//! FromRow derive macro implementation

use crate::attrs::{FieldAttrs, column_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    let field_extracts = fields
        .iter()
        .map(|field| {
            let attrs = FieldAttrs::parse(field)?;
            let field_name = &field.ident;
            if attrs.skip {
                return Ok(quote! {
                    #field_name: ::core::default::Default::default()
                });
            }
            let ty = &field.ty;
            let column_name = column_name(field, &attrs);
            Ok(quote! {
                #field_name: row.try_get::<#ty>(#column_name)?
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::activerow::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: ::activerow::Record) -> ::activerow::OrmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
