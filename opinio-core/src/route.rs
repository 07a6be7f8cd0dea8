//! 路由描述
//!
//! `RouteDescriptor` 是注册宏（或显式调用）产生的一条路由元数据：
//! HTTP 方法、路径、可选分组、处理函数。创建后不可修改。

use axum::handler::Handler;
use axum::routing::{on, MethodFilter, MethodRouter};
use std::fmt;
use std::str::FromStr;

/// 支持的 HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// 对应的 axum 方法过滤器
    pub fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unsupported HTTP method: {}", s))
    }
}

/// 拼接控制器基础路径和子路径
///
/// - 基础路径为空：直接使用子路径
/// - 子路径为空：直接使用基础路径
/// - 子路径以 `/` 开头：直接拼接（`/users` + `/` = `/users/`）
/// - 否则插入 `/`
pub fn join_path(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// 路由描述
#[derive(Clone)]
pub struct RouteDescriptor {
    method: HttpMethod,
    path: String,
    group: Option<String>,
    handler_name: String,
    controller: Option<String>,
    handler: MethodRouter,
}

impl RouteDescriptor {
    /// 用任意 axum handler 创建路由描述，handler 只绑定到 `method`
    pub fn new<H, T>(
        method: HttpMethod,
        path: impl Into<String>,
        handler_name: impl Into<String>,
        handler: H,
    ) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::from_method_router(method, path, handler_name, on(method.filter(), handler))
    }

    /// 用已构造好的 `MethodRouter` 创建路由描述
    ///
    /// 调用方负责保证 `router` 只响应 `method`
    pub fn from_method_router(
        method: HttpMethod,
        path: impl Into<String>,
        handler_name: impl Into<String>,
        router: MethodRouter,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            group: None,
            handler_name: handler_name.into(),
            controller: None,
            handler: router,
        }
    }

    /// 设置分组标签（仅用于分类，不影响路由）
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// 所属控制器，函数式路由为 `None`
    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// `Controller::handler` 或 `handler`
    pub fn handler_id(&self) -> String {
        match &self.controller {
            Some(controller) => format!("{}::{}", controller, self.handler_name),
            None => self.handler_name.clone(),
        }
    }

    pub fn handler(&self) -> &MethodRouter {
        &self.handler
    }

    /// 挂到控制器下：拼接基础路径、继承分组、记录控制器名
    pub(crate) fn mount(mut self, controller: &str, base_path: &str, group: Option<&str>) -> Self {
        self.path = join_path(base_path, &self.path);
        if self.group.is_none() {
            self.group = group.map(String::from);
        }
        self.controller = Some(controller.to_string());
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("group", &self.group)
            .field("handler", &self.handler_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ping() -> &'static str {
        "pong"
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/users", "/"), "/users/");
        assert_eq!(join_path("/users", "/create"), "/users/create");
        assert_eq!(join_path("/users", ":id"), "/users/:id");
        assert_eq!(join_path("/users", ""), "/users");
        assert_eq!(join_path("", "/health"), "/health");
    }

    #[test]
    fn test_mount_inherits_group_unless_set() {
        let plain = RouteDescriptor::new(HttpMethod::Get, "/", "ping", ping);
        let mounted = plain.mount("PingController", "/ping", Some("PING"));
        assert_eq!(mounted.path(), "/ping/");
        assert_eq!(mounted.group(), Some("PING"));
        assert_eq!(mounted.handler_id(), "PingController::ping");

        let own = RouteDescriptor::new(HttpMethod::Get, "/x", "ping", ping).with_group("OWN");
        let mounted = own.mount("PingController", "/ping", Some("PING"));
        assert_eq!(mounted.group(), Some("OWN"));
    }
}
