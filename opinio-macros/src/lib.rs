//! Opinio Macros
//!
//! 路由注册宏：`#[controller]` 用于 impl 块，`#[route]` 用于函数

mod controller;
mod route;
mod utils;

use proc_macro::TokenStream;
use proc_macro_error::proc_macro_error;

/// 控制器宏
///
/// 放在 impl 块上，参数为基础路径和可选分组。方法上的 `#[get]`、`#[post]`、`#[put]`、
/// `#[patch]`、`#[delete]`、`#[head]`、`#[options]` 或 `#[http(METHOD, "..")]`
/// 标记会被移除，并生成 `impl opinio_core::Controller`。
///
/// 方法可以是 `async fn` 或普通 `fn`，接收者为 `&self` 或 `self: Arc<Self>`（也可以没有），
/// 其余参数必须是 axum 提取器，返回值必须实现 `IntoResponse`。
///
/// # 示例
///
/// ```ignore
/// #[derive(Default)]
/// pub struct UserController;
///
/// #[controller("/users", group = "USERS")]
/// impl UserController {
///     #[get("/")]
///     async fn list_users(&self) -> Json<Vec<String>> {
///         Json(vec!["john".into()])
///     }
///
///     #[post("/", group = "ADMIN")]
///     async fn create_user(&self, Json(name): Json<String>) -> StatusCode {
///         StatusCode::CREATED
///     }
/// }
///
/// registry.controller(UserController::default())?;
/// ```
#[proc_macro_attribute]
#[proc_macro_error]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_impl(attr, item)
}

/// 函数式路由宏
///
/// 保留原函数，并生成同可见性的 `<name>_route() -> RouteDescriptor`
///
/// # 示例
///
/// ```ignore
/// #[route(GET, "/health", group = "OPS")]
/// async fn health() -> &'static str {
///     "ok"
/// }
///
/// registry.register_route(health_route())?;
/// ```
#[proc_macro_attribute]
#[proc_macro_error]
pub fn route(attr: TokenStream, item: TokenStream) -> TokenStream {
    route::route_impl(attr, item)
}
