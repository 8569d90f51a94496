//! Handler-related macros.
//!
//! This module contains:
//! - `#[handler]` - turns an `async fn` into a discoverable `Handler`
//! - `#[validator]` - turns a `fn(&Op) -> Vec<Violation>` into a discoverable
//!   `Validator`

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    FnArg, Ident, ItemFn, LitStr, Token, Type,
    parse::{Parse, ParseStream},
};

/// Arguments for the `#[handler]` and `#[validator]` macros.
#[derive(Default)]
pub(crate) struct HandlerArgs {
    pub name: Option<String>,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(HandlerArgs { name })
    }
}

fn struct_name(args: &HandlerArgs, fn_name: &Ident) -> Ident {
    match &args.name {
        Some(custom) => Ident::new(custom, fn_name.span()),
        None => fn_name.clone(),
    }
}

fn typed_args(input: &ItemFn) -> syn::Result<Vec<&syn::PatType>> {
    input
        .sig
        .inputs
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(pat_type) => Ok(pat_type),
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "handler functions cannot take self",
            )),
        })
        .collect()
}

/// Implementation of the `#[handler]` macro.
///
/// ```rust,ignore
/// #[quill::handler]
/// async fn login(cmd: LoginCommand) -> Result<LoginResponse, Fault> { ... }
///
/// #[quill::handler(name = "CreatePostHandler")]
/// async fn create_post(cmd: CreatePostCommand, ctx: RequestContext) -> Result<PostDto, Fault> { ... }
/// ```
pub(crate) fn handler_impl(args: HandlerArgs, input: ItemFn) -> syn::Result<TokenStream> {
    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let output = &input.sig.output;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "Handler function must be async",
        ));
    }
    if !input.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.sig.generics,
            "Handler function cannot be generic",
        ));
    }

    let args_list = typed_args(&input)?;
    let (request_pat, request_type) = match args_list.first() {
        Some(arg) => (&arg.pat, &arg.ty),
        None => {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "Handler function must take the request: async fn(request: Op[, ctx: RequestContext])",
            ));
        }
    };
    if let Type::Reference(reference) = &**request_type {
        return Err(syn::Error::new_spanned(
            reference,
            "Handler takes the request by value",
        ));
    }

    let ctx_binding = match args_list.get(1) {
        Some(arg) => {
            let pat = &arg.pat;
            let ty = &arg.ty;
            quote! { #pat: #ty }
        }
        None => quote! { _ctx: ::quill::RequestContext },
    };
    if let Some(extra) = args_list.get(2) {
        return Err(syn::Error::new_spanned(
            extra,
            "Handler function takes at most two arguments",
        ));
    }

    let struct_name = struct_name(&args, fn_name);

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Handler from `#[quill::handler]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #struct_name;

        impl ::quill::Handler<#request_type> for #struct_name {
            async fn handle(
                &self,
                #request_pat: #request_type,
                #ctx_binding,
            ) #output #fn_block
        }

        ::quill::inventory::submit! {
            ::quill::discovery::HandlerRegistration::of::<#request_type, #struct_name>()
        }
    })
}

/// Implementation of the `#[validator]` macro.
///
/// ```rust,ignore
/// #[quill::validator]
/// fn check_paging(query: &GetBlogPostsQuery) -> Vec<Violation> { ... }
/// ```
pub(crate) fn validator_impl(args: HandlerArgs, input: ItemFn) -> syn::Result<TokenStream> {
    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let output = &input.sig.output;

    if let Some(asyncness) = &input.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "Validator function must not be async",
        ));
    }

    let args_list = typed_args(&input)?;
    let [request] = args_list.as_slice() else {
        return Err(syn::Error::new_spanned(
            &input.sig.inputs,
            "Validator function must take exactly one argument: fn(request: &Op)",
        ));
    };
    let request_pat = &request.pat;
    let Type::Reference(reference) = &*request.ty else {
        return Err(syn::Error::new_spanned(
            &request.ty,
            "Validator argument must be a reference (&Op)",
        ));
    };
    let request_type = &reference.elem;

    let struct_name = struct_name(&args, fn_name);

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Validator from `#[quill::validator]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #struct_name;

        impl ::quill::Validator<#request_type> for #struct_name {
            fn validate(&self, #request_pat: &#request_type) #output #fn_block
        }

        ::quill::inventory::submit! {
            ::quill::discovery::ValidatorRegistration::of::<#request_type, #struct_name>()
        }
    })
}
