//! Parsing of the `#[record(...)]` field attributes.

use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Lit, Meta, Result, Token,
};

/// Field-level attributes from `#[record(...)]`.
#[derive(Debug, Clone, Default)]
pub struct RecordAttr {
    /// Leave the field out of the property list.
    pub skip: bool,
    /// Property name (default: field name).
    pub rename: Option<String>,
}

impl Parse for RecordAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = RecordAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,

                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    let syn::Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    else {
                        return Err(Error::new(
                            nv.value.span(),
                            "rename must be a string literal",
                        ));
                    };
                    let name = s.value();
                    if name.trim().is_empty() {
                        return Err(Error::new(s.span(), "rename must not be empty"));
                    }
                    attr.rename = Some(name);
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown record attribute. Expected: skip or rename = \"...\"",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Merges every `#[record(...)]` attribute on a field.
pub fn parse_record_attrs(attrs: &[Attribute]) -> Result<RecordAttr> {
    let mut merged = RecordAttr::default();
    for attr in attrs {
        if attr.path().is_ident("record") {
            let parsed = attr.parse_args::<RecordAttr>()?;
            merged.skip |= parsed.skip;
            if parsed.rename.is_some() {
                merged.rename = parsed.rename;
            }
        }
    }
    Ok(merged)
}
