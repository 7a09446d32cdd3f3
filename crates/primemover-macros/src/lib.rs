//! Compile-time transformation of entity classes into kernel-dispatchable
//! proxies (spec §4.4).

use proc_macro::TokenStream;

mod proxy_call;
mod transform;

/// Turn an `impl` block into a [`primemover_kernel::entity::EntityProxy`].
/// Every method must carry exactly one of `#[event]`, `#[blocking]`, or
/// `#[non_event]`; the first two are dispatchable and must return
/// `Result<T, E>`, the last passes through unchanged.
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    transform::expand_entity(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Generate a free function that posts a blocking call to a named
/// `#[blocking]` method on another `#[entity]` type and waits for its
/// reply. See `proxy_call` module docs for the exact shape expected.
#[proc_macro_attribute]
pub fn proxy_call(attr: TokenStream, item: TokenStream) -> TokenStream {
    proxy_call::expand_proxy_call(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
