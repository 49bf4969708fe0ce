//! Derive macro implementation for `Record`.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use std::collections::HashSet;
use syn::{
    parse_quote, spanned::Spanned, Data, DeriveInput, Error, Fields, GenericParam, Ident, Result,
};

use super::attrs::parse_record_attrs;

struct PropertyInfo {
    ident: Ident,
    name: String,
    ty: syn::Type,
}

/// Main implementation of the Record derive macro.
pub fn record_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Record can only be derived for structs",
            ))
        }
    };

    if let Some(lt) = input.generics.lifetimes().next() {
        return Err(Error::new(
            lt.span(),
            "Record types must be 'static and cannot have lifetime parameters",
        ));
    }

    let mut properties = Vec::new();
    let mut seen = HashSet::new();

    for field in fields {
        let attrs = parse_record_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let name = attrs
            .rename
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());

        if !seen.insert(name.clone()) {
            return Err(Error::new(
                field.span(),
                format!("duplicate record property `{}`", name),
            ));
        }

        properties.push(PropertyInfo {
            ident,
            name,
            ty: field.ty.clone(),
        });
    }

    let mut generics = input.generics.clone();
    {
        let type_params: Vec<Ident> = generics
            .params
            .iter()
            .filter_map(|p| match p {
                GenericParam::Type(t) => Some(t.ident.clone()),
                _ => None,
            })
            .collect();
        let where_clause = generics.make_where_clause();
        for param in type_params {
            where_clause.predicates.push(parse_quote!(#param: 'static));
        }
        for prop in &properties {
            let ty = &prop.ty;
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::sieve::Field));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let constants = properties.iter().map(|prop| {
        let const_name = Ident::new(&to_screaming_snake_case(&prop.name), Span::call_site());
        let name = &prop.name;
        let doc = format!("Property name of `{}`.", prop.ident);
        quote! {
            #[doc = #doc]
            pub const #const_name: &'static str = #name;
        }
    });

    let entries = properties.iter().map(|prop| {
        let ident = &prop.ident;
        let name = &prop.name;
        let ty = &prop.ty;
        quote! {
            ::sieve::Property::new(
                #name,
                <#ty as ::sieve::Field>::value_type(),
                |record: &Self| ::sieve::Field::to_value(&record.#ident),
            )
        }
    });

    let expanded = quote! {
        impl #impl_generics #struct_name #ty_generics #where_clause {
            #(#constants)*
        }

        impl #impl_generics ::sieve::Record for #struct_name #ty_generics #where_clause {
            fn properties() -> ::sieve::Result<::std::vec::Vec<::sieve::Property<Self>>> {
                ::std::result::Result::Ok(::std::vec![#(#entries),*])
            }
        }
    };

    Ok(expanded)
}

/// Converts a property name to SCREAMING_SNAKE_CASE for a constant name.
///
/// Characters that cannot appear in an identifier become `_`, and a
/// leading digit gets a `_` prefix.
fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_uppercase() && prev_lower {
            result.push('_');
        }
        if c.is_alphanumeric() {
            result.extend(c.to_uppercase());
        } else {
            result.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }

    if result.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        result.insert(0, '_');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: DeriveInput) -> String {
        record_derive_impl(input).unwrap().to_string().replace(' ', "")
    }

    #[test]
    fn test_to_screaming_snake_case() {
        assert_eq!(to_screaming_snake_case("name"), "NAME");
        assert_eq!(to_screaming_snake_case("created_at"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("createdAt"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("first-name"), "FIRST_NAME");
        assert_eq!(to_screaming_snake_case("2fa"), "_2FA");
        assert_eq!(to_screaming_snake_case("ID"), "ID");
    }

    #[test]
    fn generates_properties_and_constants() {
        let out = expand(parse_quote! {
            struct Person {
                name: String,
                #[record(rename = "years")]
                age: u32,
                #[record(skip)]
                secret: Vec<u8>,
            }
        });

        assert!(out.contains("pubconstNAME:&'staticstr=\"name\""));
        assert!(out.contains("pubconstYEARS:&'staticstr=\"years\""));
        assert!(out.contains("record.age"));
        assert!(!out.contains("secret"));
        assert!(out.contains("::sieve::RecordforPerson"));
    }

    #[test]
    fn generic_structs_get_bounds() {
        let out = expand(parse_quote! {
            struct Wrapper<T> {
                inner: T,
            }
        });
        assert!(out.contains("T:'static"));
        assert!(out.contains("T:::sieve::Field"));
    }

    #[test]
    fn rejects_enums_and_tuple_structs() {
        let err = record_derive_impl(parse_quote! {
            enum Color { Red, Green }
        })
        .unwrap_err();
        assert!(err.to_string().contains("only be derived for structs"));

        let err = record_derive_impl(parse_quote! {
            struct Pair(i32, i32);
        })
        .unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn rejects_lifetimes() {
        let err = record_derive_impl(parse_quote! {
            struct View<'a> { name: &'a str }
        })
        .unwrap_err();
        assert!(err.to_string().contains("lifetime"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = record_derive_impl(parse_quote! {
            struct Clash {
                a: i32,
                #[record(rename = "a")]
                b: i32,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("duplicate record property `a`"));
    }
}
