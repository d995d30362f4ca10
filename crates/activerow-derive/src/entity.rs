//! Entity derive macro implementation

use crate::attrs::{EntityAttrs, FieldAttrs, is_record_type};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

/// Methods every entity already has; an accessor with one of these names would shadow it.
const RESERVED: &[&str] = &[
    "create",
    "copy_data_from",
    "custom_query",
    "data",
    "database",
    "delete",
    "find",
    "find_all",
    "from_data",
    "get",
    "has",
    "has_id",
    "id",
    "query",
    "query_on",
    "record",
    "remove",
    "save",
    "set",
    "set_data",
    "table",
    "to_json",
];

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let attrs = EntityAttrs::parse(&input.attrs)?;

    let mut record_field = None;
    let mut other_fields = Vec::new();
    for field in fields {
        let field_attrs = FieldAttrs::parse(field)?;
        if field_attrs.record || is_record_type(&field.ty) {
            if record_field.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Entity needs exactly one record field; mark the data bag with #[orm(record)]",
                ));
            }
            record_field = field.ident.clone();
        } else {
            other_fields.push(field.ident.clone());
        }
    }
    let Some(record) = record_field else {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity needs a field of type `Record` (or one marked #[orm(record)])",
        ));
    };

    let id_columns = attrs.id_columns.unwrap_or_else(|| vec!["id".to_string()]);
    let auto_id = attrs.auto_id.unwrap_or(true);
    let ignored = &attrs.ignored;
    let connection = match &attrs.connection {
        Some(c) => quote! { ::core::option::Option::Some(#c) },
        None => quote! { ::core::option::Option::None },
    };
    let table_fn = attrs.table.as_ref().map(|table| {
        quote! {
            fn table() -> ::std::string::String {
                ::std::string::String::from(#table)
            }
        }
    });

    let mut accessors = Vec::new();
    for accessor in &attrs.accessors {
        let column = accessor.name.unraw().to_string();
        if RESERVED.contains(&column.as_str()) {
            return Err(syn::Error::new_spanned(
                &accessor.name,
                format!("accessor `{column}` would shadow an Entity method; use get/set for this column"),
            ));
        }
        let getter = &accessor.name;
        let setter = format_ident!("set_{}", column);
        let ty = &accessor.ty;
        let doc = format!("The `{column}` column.");
        accessors.push(quote! {
            #[doc = #doc]
            pub fn #getter(&self) -> ::activerow::OrmResult<::core::option::Option<#ty>> {
                self.#record.try_get::<::core::option::Option<#ty>>(#column)
            }

            pub fn #setter(&mut self, value: impl ::core::convert::Into<#ty>) -> &mut Self {
                let value: #ty = value.into();
                self.#record.set(#column, value);
                self
            }
        });
    }
    let accessor_impl = (!accessors.is_empty()).then(|| {
        quote! {
            impl #impl_generics #name #ty_generics #where_clause {
                #(#accessors)*
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::activerow::Entity for #name #ty_generics #where_clause {
            const ID_COLUMNS: &'static [&'static str] = &[#(#id_columns),*];
            const AUTO_ID: bool = #auto_id;
            const IGNORED_COLUMNS: &'static [&'static str] = &[#(#ignored),*];
            const CONNECTION: ::core::option::Option<&'static str> = #connection;

            #table_fn

            fn from_data(data: ::activerow::Record) -> Self {
                Self {
                    #record: data,
                    #(#other_fields: ::core::default::Default::default(),)*
                }
            }

            fn record(&self) -> &::activerow::Record {
                &self.#record
            }

            fn record_mut(&mut self) -> &mut ::activerow::Record {
                &mut self.#record
            }
        }

        #accessor_impl
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_err(input: DeriveInput) -> String {
        expand(input).unwrap_err().to_string()
    }

    #[test]
    fn metadata_and_accessors() {
        let out = expand(parse_quote! {
            #[orm(table = "test_compound", id = "foo_id, bar_id", auto_id = false)]
            #[orm(ignore = "modified", connection = "reporting", fields(name = String))]
            struct Compound {
                record: Record,
                loaded: bool,
            }
        })
        .unwrap()
        .to_string();

        assert!(out.contains("\"foo_id\" , \"bar_id\""));
        assert!(out.contains("const AUTO_ID : bool = false"));
        assert!(out.contains("Some (\"reporting\")"));
        assert!(out.contains("fn set_name"));
        assert!(out.contains("loaded"));
        assert!(out.contains("Default :: default ()"));
    }

    #[test]
    fn default_table_is_not_overridden() {
        let out = expand(parse_quote! {
            struct Plain { data: activerow::Record }
        })
        .unwrap()
        .to_string();
        assert!(!out.contains("fn table"));
        assert!(out.contains("& [\"id\"]"));
    }

    #[test]
    fn needs_exactly_one_record_field() {
        assert!(expand_err(parse_quote! { struct A { x: i64 } }).contains("Record"));
        assert!(
            expand_err(parse_quote! {
                struct A { a: Record, #[orm(record)] b: Record }
            })
            .contains("exactly one")
        );
    }

    #[test]
    fn rejects_shadowing_accessor() {
        let msg = expand_err(parse_quote! {
            #[orm(fields(id = i64))]
            struct A { r: Record }
        });
        assert!(msg.contains("shadow"));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let msg = expand_err(parse_quote! {
            #[orm(primary = "id")]
            struct A { r: Record }
        });
        assert!(msg.contains("unknown entity attribute"));
    }
}
