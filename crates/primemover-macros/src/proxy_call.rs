//! `#[proxy_call]` — an ergonomic caller-side companion to `#[entity]`.
//!
//! `#[entity]` only wires up dispatch on the *target* type; nothing forces
//! a caller to go through the kernel rather than calling the renamed
//! method directly (it's `pub(crate)`-visible at best, but still callable
//! from the same crate). `#[proxy_call]` turns a bare function signature
//! into the one sanctioned way to invoke a `#[blocking]` method on another
//! entity: it posts through [`primemover_kernel::facade::post_blocking`]
//! and resolves the target's ordinal via the `__pm_ordinal_*` const fn
//! `#[entity]` emits for every dispatchable method, rather than
//! recomputing the hash here — recomputing in isolation would disagree
//! with the target's real assignment whenever that method's hash
//! collided with an earlier one on the same type (spec §4.3 linear
//! probing is per-entity, not a pure function of one method in isolation).

use darling::FromMeta;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse2, Error as SynError, FnArg, ItemFn, Pat, Result as SynResult, ReturnType, Type};

#[derive(FromMeta)]
struct ProxyCallArgs {
    entity: syn::Path,
    method: String,
}

/// The attached item is a placeholder function — its body is never kept,
/// only its signature, since plain Rust has no syntax for a free function
/// with no body at all. Callers write `{ unreachable!() }` or similar.
pub fn expand_proxy_call(attr: TokenStream, item: TokenStream) -> SynResult<TokenStream> {
    let nested = darling::ast::NestedMeta::parse_meta_list(attr)
        .map_err(|e| SynError::new(proc_macro2::Span::call_site(), e.to_string()))?;
    let args = ProxyCallArgs::from_list(&nested)
        .map_err(|e| SynError::new(proc_macro2::Span::call_site(), e.to_string()))?;
    let placeholder: ItemFn = parse2(item)?;
    let vis = placeholder.vis;
    let sig = placeholder.sig;

    let (ok_ty, err_ty) = result_type_args(&sig.output)?;
    let params: Vec<(syn::Ident, Type)> = sig
        .inputs
        .iter()
        .skip(1) // first parameter is the target EntityHandle
        .map(|arg| match arg {
            FnArg::Typed(pt) => match pt.pat.as_ref() {
                Pat::Ident(i) => Ok((i.ident.clone(), (*pt.ty).clone())),
                other => Err(SynError::new_spanned(other, "proxy_call parameters must be simple identifiers")),
            },
            FnArg::Receiver(r) => Err(SynError::new_spanned(r, "proxy_call functions take no `self`")),
        })
        .collect::<SynResult<_>>()?;
    let pat_idents: Vec<_> = params.iter().map(|(i, _)| i.clone()).collect();
    let pat_types: Vec<_> = params.iter().map(|(_, t)| t.clone()).collect();

    let fn_ident = &sig.ident;
    let target_ty = &args.entity;
    let ordinal_fn = format_ident!("__pm_ordinal_{}", args.method);
    let entity_param = sig
        .inputs
        .first()
        .ok_or_else(|| SynError::new_spanned(&sig, "proxy_call's first parameter must name the target entity handle"))?;

    let args_expr = if pat_idents.is_empty() {
        quote! { ::std::boxed::Box::new(()) }
    } else {
        quote! { ::std::boxed::Box::new((#(#pat_idents),*,)) }
    };

    Ok(quote! {
        #vis fn #fn_ident(#entity_param, #(#pat_idents: #pat_types),*) -> ::core::result::Result<#ok_ty, #err_ty>
        where
            #err_ty: ::std::error::Error + Send + Sync + 'static,
        {
            let __pm_time = ::primemover_kernel::facade::current_time()
                .expect("proxy_call requires a scheduler installed as the current controller");
            let __pm_ordinal = <#target_ty>::#ordinal_fn();
            let __pm_args: ::primemover_kernel::entity::Args = #args_expr;
            let __pm_outcome = ::primemover_kernel::facade::post_blocking(__pm_time, target, __pm_ordinal, __pm_args)
                .expect("proxy_call misuse: called from outside a dispatch, or with an invalid time");
            match __pm_outcome {
                ::core::result::Result::Ok(v) => ::core::result::Result::Ok(
                    *v.downcast::<#ok_ty>().expect("proxy_call return type did not match the target's dispatch arm"),
                ),
                ::core::result::Result::Err(::primemover_kernel::error::EntityCause::Error(e)) => {
                    match e.downcast::<#err_ty>() {
                        ::core::result::Result::Ok(typed) => ::core::result::Result::Err(*typed),
                        ::core::result::Result::Err(e) => panic!("proxy call to {}#{} raised an unexpected error type: {e}", stringify!(#target_ty), __pm_ordinal),
                    }
                }
                ::core::result::Result::Err(::primemover_kernel::error::EntityCause::Panic(msg)) => {
                    panic!("proxy call to {}#{} panicked: {msg}", stringify!(#target_ty), __pm_ordinal)
                }
            }
        }
    })
}

fn result_type_args(output: &ReturnType) -> SynResult<(Type, Type)> {
    let ty = match output {
        ReturnType::Type(_, ty) => ty.as_ref(),
        ReturnType::Default => {
            return Err(SynError::new_spanned(output, "proxy_call functions must return Result<T, E>"))
        }
    };
    if let Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            if seg.ident == "Result" {
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    let mut types = args.args.iter().filter_map(|a| match a {
                        syn::GenericArgument::Type(t) => Some(t.clone()),
                        _ => None,
                    });
                    if let (Some(ok), Some(err)) = (types.next(), types.next()) {
                        return Ok((ok, err));
                    }
                }
            }
        }
    }
    Err(SynError::new_spanned(ty, "proxy_call functions must return Result<T, E>"))
}
