//! Procedural macros for Quill.
//!
//! - `#[derive(Operation)]` - implement `Operation` and register the type
//! - `#[handler]` - generate a discoverable handler from an `async fn`
//! - `#[validator]` - generate a discoverable validator from a `fn`
//!
//! Generated code refers to the facade crate as `::quill`.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

mod handler;
mod operation;

/// Derive macro for implementing `Operation`.
///
/// ```rust,ignore
/// #[derive(Deserialize, Operation)]
/// #[serde(rename_all = "camelCase")]
/// #[operation(response = Vec<PostDto>)]
/// struct GetBlogPostsQuery {
///     page: u32,
///     page_size: u32,
/// }
/// ```
///
/// # Attributes
///
/// - `response = Type` (required): the handler's response type
/// - `action = "..."`: explicit external action
/// - `kind = "command" | "query" | "event" | "unknown"`: explicit kind marker
/// - `name = "..."`: declared name, defaults to the type name
/// - `authenticated`: callers must carry a principal
#[proc_macro_derive(Operation, attributes(operation))]
pub fn derive_operation(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    operation::derive_operation_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Attribute macro for declaring a handler.
///
/// The function becomes a unit struct of the same name implementing
/// `Handler<Op>` for its first argument's type, and is registered for
/// discovery. An optional second argument receives the `RequestContext`.
///
/// # Attributes
///
/// - `name = "..."`: name of the generated struct
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as handler::HandlerArgs);
    let input = parse_macro_input!(item as ItemFn);
    handler::handler_impl(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Attribute macro for declaring a validator.
///
/// The function (`fn(request: &Op) -> Vec<Violation>`) becomes a unit struct
/// implementing `Validator<Op>`, registered for discovery.
#[proc_macro_attribute]
pub fn validator(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as handler::HandlerArgs);
    let input = parse_macro_input!(item as ItemFn);
    handler::validator_impl(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
