//! `#[derive(Operation)]`.
//!
//! Implements `quill::Operation` and submits an `OperationRegistration` so
//! the type is discovered at startup. Field shapes follow serde's wire names
//! (`rename_all` on the container, `rename` and `skip` on fields).

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, LitStr, Token, Type,
    parse::{Parse, ParseStream},
};

/// Options from `#[operation(...)]`.
#[derive(Default)]
struct OperationArgs {
    response: Option<Type>,
    action: Option<LitStr>,
    kind: Option<LitStr>,
    name: Option<LitStr>,
    authenticated: bool,
}

impl OperationArgs {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut args = OperationArgs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("operation")) {
            let parsed: OperationArgs = attr.parse_args()?;
            args.response = parsed.response.or(args.response);
            args.action = parsed.action.or(args.action);
            args.kind = parsed.kind.or(args.kind);
            args.name = parsed.name.or(args.name);
            args.authenticated |= parsed.authenticated;
        }
        Ok(args)
    }
}

impl Parse for OperationArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = OperationArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "authenticated" => args.authenticated = true,
                "response" => {
                    input.parse::<Token![=]>()?;
                    args.response = Some(input.parse()?);
                }
                "action" => {
                    input.parse::<Token![=]>()?;
                    args.action = Some(input.parse()?);
                }
                "kind" => {
                    input.parse::<Token![=]>()?;
                    args.kind = Some(input.parse()?);
                }
                "name" => {
                    input.parse::<Token![=]>()?;
                    args.name = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown operation attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

/// Implementation of `#[derive(Operation)]`.
pub(crate) fn derive_operation_impl(input: DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Operation cannot be derived for generic types",
        ));
    }

    let args = OperationArgs::from_attrs(&input.attrs)?;
    let Some(response) = &args.response else {
        return Err(syn::Error::new_spanned(
            ident,
            "missing response type: add #[operation(response = Type)]",
        ));
    };

    let name = args
        .name
        .as_ref()
        .map_or_else(|| ident.to_string(), LitStr::value);

    let kind_const = match &args.kind {
        Some(lit) => {
            let variant = match lit.value().to_ascii_lowercase().as_str() {
                "command" => quote!(Command),
                "query" => quote!(Query),
                "event" => quote!(Event),
                "unknown" => quote!(Unknown),
                _ => {
                    return Err(syn::Error::new_spanned(
                        lit,
                        "kind must be one of \"command\", \"query\", \"event\", \"unknown\"",
                    ));
                }
            };
            quote! {
                const KIND: ::core::option::Option<::quill::OperationKind> =
                    ::core::option::Option::Some(::quill::OperationKind::#variant);
            }
        }
        None => quote!(),
    };

    let action_const = args.action.as_ref().map(|action| {
        quote! {
            const ACTION: ::core::option::Option<&'static str> =
                ::core::option::Option::Some(#action);
        }
    });

    let authenticated = args.authenticated;
    let fields = request_fields(&input)?;
    let field_shapes = fields.iter().map(|(wire_name, ty)| {
        quote! { ::quill::FieldShape::new(#wire_name, #ty) }
    });

    Ok(quote! {
        impl ::quill::Operation for #ident {
            type Response = #response;
            const NAME: &'static str = #name;
            #kind_const
            #action_const
            const REQUIRES_AUTHENTICATION: bool = #authenticated;

            fn request_shape() -> ::quill::Shape {
                ::quill::Shape::record(#name, ::std::vec![#(#field_shapes),*])
            }
        }

        ::quill::inventory::submit! {
            ::quill::discovery::OperationRegistration::of::<#ident>()
        }
    })
}

/// `(wire name, type)` for every deserialized field.
fn request_fields(input: &DeriveInput) -> syn::Result<Vec<(String, String)>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Operation can only be derived for structs",
        ));
    };
    let container = SerdeAttrs::from_attrs(&input.attrs)?;

    let Fields::Named(named) = &data.fields else {
        return Ok(Vec::new());
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let serde = SerdeAttrs::from_attrs(&field.attrs)?;
        if serde.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let raw = ident.to_string();
        let raw = raw.strip_prefix("r#").unwrap_or(&raw);
        let wire_name = match serde.rename {
            Some(rename) => rename,
            None => match &container.rename_all {
                Some(rule) => apply_rename_rule(rule, raw)?,
                None => raw.to_string(),
            },
        };
        fields.push((wire_name, type_name(&field.ty)));
    }
    Ok(fields)
}

fn type_name(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

/// The subset of `#[serde(...)]` that changes wire names.
#[derive(Default)]
struct SerdeAttrs {
    rename_all: Option<String>,
    rename: Option<String>,
    skip: bool,
}

impl SerdeAttrs {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut serde = SerdeAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    serde.rename_all = Some(lit.value());
                } else if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    serde.rename = Some(lit.value());
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    serde.skip = true;
                } else if meta.input.peek(Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                } else if !meta.input.is_empty() && !meta.input.peek(Token![,]) {
                    let _: proc_macro2::TokenTree = meta.input.parse()?;
                }
                Ok(())
            })?;
        }
        Ok(serde)
    }
}

/// Apply a serde `rename_all` rule to a snake_case field name.
fn apply_rename_rule(rule: &str, field: &str) -> syn::Result<String> {
    let words: Vec<&str> = field.split('_').filter(|w| !w.is_empty()).collect();
    let capitalized = || -> Vec<String> {
        words
            .iter()
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect()
    };

    let renamed = match rule {
        "lowercase" => field.to_lowercase(),
        "UPPERCASE" => field.to_uppercase(),
        "snake_case" => field.to_string(),
        "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        "PascalCase" => capitalized().concat(),
        "camelCase" => {
            let pascal = capitalized();
            match words.first() {
                Some(first) => {
                    let mut out = first.to_string();
                    out.extend(pascal.into_iter().skip(1));
                    out
                }
                None => String::new(),
            }
        }
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported rename_all rule: {}", other),
            ));
        }
    };
    Ok(renamed)
}
