//! 控制器支持
//!
//! 控制器把一组路由归到同一个基础路径和分组下。
//! 通常由 `#[controller]` 宏生成 `Controller` 实现，也可以手写 `ControllerDescriptor`。

use crate::route::RouteDescriptor;
use std::sync::Arc;

/// 控制器描述
///
/// 路由在 `route()` 时保持原样，在注册到 `RouteRegistry` 时才拼接基础路径并继承分组
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    name: String,
    base_path: String,
    group: Option<String>,
    routes: Vec<RouteDescriptor>,
}

impl ControllerDescriptor {
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            group: None,
            routes: Vec::new(),
        }
    }

    /// 设置控制器分组，未指定分组的路由继承此分组
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// 添加一条路由，`path` 为相对基础路径的子路径
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn group_label(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// 展开为带完整路径的路由列表
    pub(crate) fn into_mounted_routes(self) -> Vec<RouteDescriptor> {
        let Self {
            name,
            base_path,
            group,
            routes,
        } = self;
        routes
            .into_iter()
            .map(|route| route.mount(&name, &base_path, group.as_deref()))
            .collect()
    }
}

/// 控制器 trait
///
/// 处理函数共享同一个 `Arc<Self>` 实例
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
///         Json(vec!["john".into(), "budi".into()])
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    fn descriptor(self: Arc<Self>) -> ControllerDescriptor;
}
