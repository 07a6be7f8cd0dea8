//! `#[route]` 宏实现：函数式路由

use crate::utils::MethodRouteArgs;
use proc_macro::TokenStream;
use proc_macro_error::abort;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, Item};

pub fn route_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match syn::parse::<MethodRouteArgs>(attr) {
        Ok(args) => args,
        Err(e) => abort!(e.span(), "{}", e),
    };
    if !args.path.value().starts_with('/') {
        abort!(args.path.span(), "route path must start with '/'");
    }

    let func = match syn::parse::<Item>(item) {
        Ok(Item::Fn(func)) => func,
        Ok(other) => abort!(
            other.span(),
            "#[route] must be placed on a free function";
            help = "use #[controller] with #[get]/#[post] markers for methods"
        ),
        Err(e) => abort!(e.span(), "{}", e),
    };

    let sig = &func.sig;
    if !sig.generics.params.is_empty() {
        abort!(sig.generics.span(), "route handlers cannot be generic");
    }

    let mut arg_names = Vec::new();
    let mut arg_types = Vec::new();
    for (index, arg) in sig.inputs.iter().enumerate() {
        match arg {
            FnArg::Receiver(receiver) => {
                abort!(receiver.span(), "#[route] functions cannot take `self`")
            }
            FnArg::Typed(pat_type) => {
                arg_names.push(format_ident!("__arg{}", index, span = pat_type.pat.span()));
                arg_types.push(&pat_type.ty);
            }
        }
    }

    let vis = &func.vis;
    let fn_name = &sig.ident;
    let handler_name = fn_name.to_string();
    let route_fn = format_ident!("{}_route", fn_name);
    let http_method = &args.method;
    let path = &args.path;
    let group = args.group.as_ref().map(|g| quote! { .with_group(#g) });

    // 同步函数包装成 async 闭包
    let handler = if sig.asyncness.is_some() {
        quote! { #fn_name }
    } else {
        quote! { |#(#arg_names: #arg_types),*| async move { #fn_name(#(#arg_names),*) } }
    };
    let doc = format!(" `{}` 的路由描述", handler_name);

    let expanded = quote! {
        #func

        #[doc = #doc]
        #vis fn #route_fn() -> ::opinio_core::RouteDescriptor {
            ::opinio_core::RouteDescriptor::new(
                ::opinio_core::HttpMethod::#http_method,
                #path,
                #handler_name,
                #handler,
            )
            #group
        }
    };

    TokenStream::from(expanded)
}
