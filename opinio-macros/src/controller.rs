//! `#[controller]` 宏实现
//!
//! 扫描 impl 块中带路由标记的方法，去掉标记后原样输出 impl 块，
//! 并生成 `impl Controller`：每个处理函数共享同一个 `Arc<Self>`。

use crate::utils::{is_route_marker, ControllerArgs, RouteMarker};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use proc_macro_error::abort;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ImplItemFn, Item, ItemImpl, Type};

pub fn controller_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match syn::parse::<ControllerArgs>(attr) {
        Ok(args) => args,
        Err(e) => abort!(e.span(), "{}", e),
    };

    let mut input = match syn::parse::<Item>(item) {
        Ok(Item::Impl(item_impl)) => item_impl,
        Ok(other) => abort!(
            other.span(),
            "#[controller] must be placed on an inherent impl block";
            help = "write `#[controller(\"/base\")]` above `impl MyController`"
        ),
        Err(e) => abort!(e.span(), "{}", e),
    };
    check_impl(&input);

    let name = controller_name(&input.self_ty);
    let mut routes = Vec::new();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            let markers = take_markers(method);
            for marker in markers {
                routes.push(route_tokens(method, &marker));
            }
        }
    }

    let self_ty = &input.self_ty;
    let base_path = &args.base_path;
    let group = args.group.as_ref().map(|g| quote! { .group(#g) });

    let expanded = quote! {
        #input

        impl ::opinio_core::Controller for #self_ty {
            fn descriptor(self: ::std::sync::Arc<Self>) -> ::opinio_core::ControllerDescriptor {
                ::opinio_core::ControllerDescriptor::new(#name, #base_path)
                    #group
                    #(.route(#routes))*
            }
        }
    };

    TokenStream::from(expanded)
}

fn check_impl(input: &ItemImpl) {
    if let Some((_, path, _)) = &input.trait_ {
        abort!(path.span(), "#[controller] must be placed on an inherent impl block, not a trait impl");
    }
    if !input.generics.params.is_empty() {
        abort!(input.generics.span(), "generic controllers are not supported");
    }
}

fn controller_name(self_ty: &Type) -> String {
    match self_ty {
        Type::Path(type_path) => match type_path.path.segments.last() {
            Some(segment) => segment.ident.to_string(),
            None => abort!(self_ty.span(), "expected a named controller type"),
        },
        _ => abort!(self_ty.span(), "expected a named controller type"),
    }
}

/// 取出并移除方法上的路由标记
fn take_markers(method: &mut ImplItemFn) -> Vec<RouteMarker> {
    let mut markers = Vec::new();
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        if is_route_marker(&attr) {
            match RouteMarker::from_attr(&attr) {
                Ok(marker) => markers.push(marker),
                Err(e) => abort!(e.span(), "{}", e),
            }
        } else {
            kept.push(attr);
        }
    }

    method.attrs = kept;
    markers
}

/// 生成一条 `RouteDescriptor` 表达式
fn route_tokens(method: &ImplItemFn, marker: &RouteMarker) -> TokenStream2 {
    let sig = &method.sig;
    let method_name = &sig.ident;
    let handler_name = method_name.to_string();

    if !sig.generics.params.is_empty() {
        abort!(sig.generics.span(), "route handlers cannot be generic");
    }

    let mut has_receiver = false;
    let mut arg_names = Vec::new();
    let mut arg_types = Vec::new();

    for (index, arg) in sig.inputs.iter().enumerate() {
        match arg {
            FnArg::Receiver(receiver) => {
                if receiver.reference.is_some() && receiver.mutability.is_some() {
                    abort!(
                        receiver.span(),
                        "route handlers cannot take `&mut self`";
                        help = "controllers are shared between requests; use interior mutability"
                    );
                }
                if receiver.reference.is_none() && receiver.colon_token.is_none() {
                    abort!(
                        receiver.span(),
                        "route handlers cannot take `self` by value";
                        help = "use `&self` or `self: Arc<Self>`"
                    );
                }
                has_receiver = true;
            }
            FnArg::Typed(pat_type) => {
                arg_names.push(format_ident!("__arg{}", index, span = pat_type.pat.span()));
                arg_types.push(&pat_type.ty);
            }
        }
    }

    let call = if has_receiver {
        quote! { __this.#method_name(#(#arg_names),*) }
    } else {
        quote! { Self::#method_name(#(#arg_names),*) }
    };
    let call = if sig.asyncness.is_some() {
        quote! { #call.await }
    } else {
        call
    };

    let http_method = &marker.method;
    let path = &marker.path;
    let group = marker.group.as_ref().map(|g| quote! { .with_group(#g) });

    let handler = if has_receiver {
        quote! {
            {
                let __this = ::std::sync::Arc::clone(&self);
                move |#(#arg_names: #arg_types),*| {
                    let __this = ::std::sync::Arc::clone(&__this);
                    async move { #call }
                }
            }
        }
    } else {
        quote! {
            move |#(#arg_names: #arg_types),*| async move { #call }
        }
    };

    quote! {
        ::opinio_core::RouteDescriptor::new(
            ::opinio_core::HttpMethod::#http_method,
            #path,
            #handler_name,
            #handler,
        )
        #group
    }
}
