//! 宏参数解析

use proc_macro2::Span;
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{Attribute, Ident, LitStr, Meta, Token};

/// 支持的 HTTP 方法：(属性名/方法名, `HttpMethod` 变体)
const METHODS: &[(&str, &str)] = &[
    ("get", "Get"),
    ("post", "Post"),
    ("put", "Put"),
    ("patch", "Patch"),
    ("delete", "Delete"),
    ("head", "Head"),
    ("options", "Options"),
];

/// 通用方法标记 `#[http(METHOD, "/path")]`
pub const HTTP_MARKER: &str = "http";

/// 方法名 -> `HttpMethod` 变体标识符，大小写不敏感
pub fn method_variant(name: &str, span: Span) -> syn::Result<Ident> {
    METHODS
        .iter()
        .find(|(method, _)| method.eq_ignore_ascii_case(name))
        .map(|(_, variant)| Ident::new(variant, span))
        .ok_or_else(|| {
            syn::Error::new(
                span,
                format!(
                    "unsupported HTTP method `{}`, expected one of GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS",
                    name
                ),
            )
        })
}

/// 是否为路由标记属性（`#[get]`、`#[http]` 等）
pub fn is_route_marker(attr: &Attribute) -> bool {
    attr.path()
        .get_ident()
        .map(|ident| {
            let name = ident.to_string();
            name == HTTP_MARKER || METHODS.iter().any(|(method, _)| *method == name)
        })
        .unwrap_or(false)
}

/// 解析后的路由标记
pub struct RouteMarker {
    pub method: Ident,
    pub path: LitStr,
    pub group: Option<LitStr>,
}

impl RouteMarker {
    /// 从 `#[get("/path", group = "..")]` 或 `#[http(GET, "/path")]` 解析
    pub fn from_attr(attr: &Attribute) -> syn::Result<Self> {
        let marker = attr
            .path()
            .get_ident()
            .map(|ident| ident.to_string())
            .unwrap_or_default();

        let list = match &attr.meta {
            Meta::List(list) => list,
            _ => {
                return Err(syn::Error::new_spanned(
                    attr,
                    format!("#[{}] requires a path, e.g. #[{}(\"/\")]", marker, marker),
                ))
            }
        };

        if marker == HTTP_MARKER {
            let args: MethodRouteArgs = list.parse_args()?;
            Ok(Self {
                method: args.method,
                path: args.path,
                group: args.group,
            })
        } else {
            let method = method_variant(&marker, attr.path().span())?;
            let args: RouteArgs = list.parse_args()?;
            Ok(Self {
                method,
                path: args.path,
                group: args.group,
            })
        }
    }
}

/// `"/path", group = ".."`
pub struct RouteArgs {
    pub path: LitStr,
    pub group: Option<LitStr>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path = parse_path(input)?;
        let group = parse_group(input)?;
        Ok(Self { path, group })
    }
}

/// `METHOD, "/path", group = ".."`，METHOD 可以是标识符或字符串
pub struct MethodRouteArgs {
    pub method: Ident,
    pub path: LitStr,
    pub group: Option<LitStr>,
}

impl Parse for MethodRouteArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Err(input.error("missing HTTP method, e.g. (GET, \"/\")"));
        }
        let method = if input.peek(LitStr) {
            let lit: LitStr = input.parse()?;
            method_variant(&lit.value(), lit.span())?
        } else {
            let ident: Ident = input.parse()?;
            method_variant(&ident.to_string(), ident.span())?
        };

        if input.is_empty() {
            return Err(input.error("missing path after HTTP method"));
        }
        input.parse::<Token![,]>()?;

        let path = parse_path(input)?;
        let group = parse_group(input)?;
        Ok(Self {
            method,
            path,
            group,
        })
    }
}

/// `"/base", group = ".."`
pub struct ControllerArgs {
    pub base_path: LitStr,
    pub group: Option<LitStr>,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let base_path = parse_path(input)?;
        let value = base_path.value();
        if !value.is_empty() && !value.starts_with('/') {
            return Err(syn::Error::new(
                base_path.span(),
                "controller base path must start with '/'",
            ));
        }
        let group = parse_group(input)?;
        Ok(Self { base_path, group })
    }
}

fn parse_path(input: ParseStream) -> syn::Result<LitStr> {
    if input.is_empty() {
        return Err(input.error("missing path literal, e.g. \"/users\""));
    }
    input.parse()
}

/// 解析可选的 `, group = ".."`
fn parse_group(input: ParseStream) -> syn::Result<Option<LitStr>> {
    let mut group = None;
    while !input.is_empty() {
        input.parse::<Token![,]>()?;
        if input.is_empty() {
            break;
        }

        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: LitStr = input.parse()?;

        if key != "group" {
            return Err(syn::Error::new(
                key.span(),
                format!("unknown option `{}`, expected `group`", key),
            ));
        }
        if group.is_some() {
            return Err(syn::Error::new(key.span(), "duplicate `group` option"));
        }
        group = Some(value);
    }
    Ok(group)
}
