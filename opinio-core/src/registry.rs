//! 路由注册表
//!
//! 显式的注册表对象，由应用装配过程持有，不存在进程级全局状态。
//! 控制器路由和函数式路由以同样的方式进入注册表。

use crate::controller::{Controller, ControllerDescriptor};
use crate::route::{HttpMethod, RouteDescriptor};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// 注册表错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("route {handler} has an empty path")]
    EmptyPath { handler: String },

    #[error("route {handler} has path '{path}' which does not start with '/'")]
    InvalidPath { handler: String, path: String },

    /// 参数段为空、通配段不在末尾等无法交给路由器的路径
    #[error("route {handler} has malformed path '{path}': {reason}")]
    MalformedPath {
        handler: String,
        path: String,
        reason: &'static str,
    },

    #[error("duplicate route {method} {path}: {handler} collides with {existing}")]
    DuplicateRoute {
        method: HttpMethod,
        path: String,
        handler: String,
        existing: String,
    },

    /// 同一位置的参数段名称不同，例如 `/items/:id` 与 `/items/:item_id`
    #[error("route {handler} path '{path}' conflicts with '{existing_path}' ({existing}): parameter names differ")]
    ConflictingParams {
        path: String,
        handler: String,
        existing_path: String,
        existing: String,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// 某个静态前缀下第一次出现的动态段
#[derive(Debug, Clone)]
struct DynamicSegment {
    segment: String,
    path: String,
    handler: String,
}

/// 路由注册表
#[derive(Debug, Default, Clone)]
pub struct RouteRegistry {
    routes: Vec<RouteDescriptor>,
    /// (method, 路径形状) -> 处理函数标识，用于冲突检测
    index: HashMap<(HttpMethod, String), String>,
    /// 路径形状前缀 -> 该位置的动态段
    dynamic: HashMap<String, DynamicSegment>,
    controllers: Vec<String>,
}

fn is_dynamic(segment: &str) -> bool {
    segment.starts_with(':') || segment.starts_with('*')
}

/// 路径形状：参数段统一为 `:`，通配段统一为 `*`
///
/// `/items/:id` 和 `/items/:item_id` 形状相同，路由器会把它们视为同一条路径
pub fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册控制器实例
    pub fn controller<C: Controller>(&mut self, controller: C) -> RegistryResult<usize> {
        self.register_controller(Arc::new(controller).descriptor())
    }

    /// 注册控制器描述，返回新增的路由数
    ///
    /// 校验失败时不会写入任何路由
    pub fn register_controller(&mut self, descriptor: ControllerDescriptor) -> RegistryResult<usize> {
        let name = descriptor.name().to_string();
        let routes = descriptor.into_mounted_routes();
        let count = routes.len();
        self.insert_all(routes)?;
        self.controllers.push(name);
        Ok(count)
    }

    /// 注册函数式路由
    pub fn register_route(&mut self, route: RouteDescriptor) -> RegistryResult<()> {
        self.insert_all(vec![route])
    }

    fn insert_all(&mut self, routes: Vec<RouteDescriptor>) -> RegistryResult<()> {
        let mut pending: HashMap<(HttpMethod, String), String> = HashMap::new();
        let mut pending_dynamic: HashMap<String, DynamicSegment> = HashMap::new();

        for route in &routes {
            let key = Self::validate(route)?;
            let existing = self.index.get(&key).or_else(|| pending.get(&key));
            if let Some(existing) = existing {
                return Err(RegistryError::DuplicateRoute {
                    method: key.0,
                    path: route.path().to_string(),
                    handler: route.handler_id(),
                    existing: existing.clone(),
                });
            }
            self.check_params(route, &mut pending_dynamic)?;
            pending.insert(key, route.handler_id());
        }

        for route in routes {
            tracing::debug!(
                method = %route.method(),
                path = route.path(),
                handler = %route.handler_id(),
                "Registered route"
            );
            self.routes.push(route);
        }
        self.index.extend(pending);
        self.dynamic.extend(pending_dynamic);
        Ok(())
    }

    /// 同一静态前缀下的动态段必须一致
    fn check_params(
        &self,
        route: &RouteDescriptor,
        pending: &mut HashMap<String, DynamicSegment>,
    ) -> RegistryResult<()> {
        let mut prefix = String::new();
        for segment in route.path().split('/').skip(1) {
            if is_dynamic(segment) {
                let seen = self.dynamic.get(&prefix).or_else(|| pending.get(&prefix));
                match seen {
                    Some(seen) if seen.segment != segment => {
                        return Err(RegistryError::ConflictingParams {
                            path: route.path().to_string(),
                            handler: route.handler_id(),
                            existing_path: seen.path.clone(),
                            existing: seen.handler.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        pending.insert(
                            prefix.clone(),
                            DynamicSegment {
                                segment: segment.to_string(),
                                path: route.path().to_string(),
                                handler: route.handler_id(),
                            },
                        );
                    }
                }
            }
            prefix.push('/');
            prefix.push_str(&path_shape(segment));
        }
        Ok(())
    }

    fn validate(route: &RouteDescriptor) -> RegistryResult<(HttpMethod, String)> {
        let path = route.path();
        if path.is_empty() {
            return Err(RegistryError::EmptyPath {
                handler: route.handler_id(),
            });
        }
        if !path.starts_with('/') {
            return Err(RegistryError::InvalidPath {
                handler: route.handler_id(),
                path: path.to_string(),
            });
        }

        let malformed = |reason| RegistryError::MalformedPath {
            handler: route.handler_id(),
            path: path.to_string(),
            reason,
        };
        let segments: Vec<&str> = path.split('/').skip(1).collect();
        for (i, segment) in segments.iter().enumerate() {
            if (segment.starts_with(':') || segment.starts_with('*')) && segment.len() == 1 {
                return Err(malformed("parameter name is empty"));
            }
            if segment.starts_with('*') && i + 1 != segments.len() {
                return Err(malformed("wildcard must be the last segment"));
            }
            if segment.chars().skip(1).any(|c| c == ':' || c == '*') {
                return Err(malformed("parameters must span a whole segment"));
            }
        }

        Ok((route.method(), path_shape(path)))
    }

    /// 按注册顺序返回所有路由
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn into_routes(self) -> Vec<RouteDescriptor> {
        self.routes
    }

    /// 已注册的控制器名（按注册顺序）
    pub fn controllers(&self) -> &[String] {
        &self.controllers
    }

    /// 所有出现过的分组标签
    pub fn groups(&self) -> BTreeSet<&str> {
        self.routes.iter().filter_map(|r| r.group()).collect()
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RouteDescriptor> {
        self.routes
            .iter()
            .find(|r| r.method() == method && r.path() == path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn list() -> &'static str {
        "list"
    }

    async fn create() -> &'static str {
        "create"
    }

    fn users() -> ControllerDescriptor {
        ControllerDescriptor::new("UserController", "/users")
            .group("USERS")
            .route(RouteDescriptor::new(HttpMethod::Get, "/", "list", list))
            .route(RouteDescriptor::new(HttpMethod::Post, "/create", "create", create))
    }

    #[test]
    fn test_controller_routes_get_full_paths() {
        let mut registry = RouteRegistry::new();
        registry.register_controller(users()).unwrap();

        assert_eq!(registry.len(), 2);
        let get = registry.find(HttpMethod::Get, "/users/").unwrap();
        assert_eq!(get.group(), Some("USERS"));
        assert_eq!(get.controller(), Some("UserController"));
        assert!(registry.find(HttpMethod::Post, "/users/create").is_some());
        assert_eq!(registry.controllers(), &["UserController".to_string()]);
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut registry = RouteRegistry::new();
        registry.register_controller(users()).unwrap();

        let clash = RouteDescriptor::new(HttpMethod::Get, "/users/", "other_list", list);
        let err = registry.register_route(clash).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRoute {
                method: HttpMethod::Get,
                path: "/users/".into(),
                handler: "other_list".into(),
                existing: "UserController::list".into(),
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_same_path_different_method_is_allowed() {
        let mut registry = RouteRegistry::new();
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Get, "/items", "list", list))
            .unwrap();
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Post, "/items", "create", create))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_failed_controller_registers_nothing() {
        let mut registry = RouteRegistry::new();
        let broken = ControllerDescriptor::new("Broken", "")
            .route(RouteDescriptor::new(HttpMethod::Get, "/ok", "ok", list))
            .route(RouteDescriptor::new(HttpMethod::Get, "relative", "bad", list));

        let err = registry.register_controller(broken).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPath { .. }));
        assert!(registry.is_empty());
        assert!(registry.controllers().is_empty());
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let mut registry = RouteRegistry::new();
        let err = registry
            .register_route(RouteDescriptor::new(HttpMethod::Get, "", "root", list))
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyPath { handler: "root".into() });
    }

    #[test]
    fn test_groups_are_collected() {
        let mut registry = RouteRegistry::new();
        registry.register_controller(users()).unwrap();
        registry
            .register_route(
                RouteDescriptor::new(HttpMethod::Get, "/health", "health", list).with_group("OPS"),
            )
            .unwrap();

        let groups: Vec<_> = registry.groups().into_iter().collect();
        assert_eq!(groups, vec!["OPS", "USERS"]);
    }

    #[test]
    fn test_path_shape() {
        assert_eq!(path_shape("/items/:id"), "/items/:");
        assert_eq!(path_shape("/files/*rest"), "/files/*");
        assert_eq!(path_shape("/users/"), "/users/");
    }

    #[test]
    fn test_differently_named_params_conflict() {
        let mut registry = RouteRegistry::new();
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Get, "/items/:id", "show", list))
            .unwrap();

        let err = registry
            .register_route(RouteDescriptor::new(HttpMethod::Delete, "/items/:item_id", "remove", create))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ConflictingParams {
                path: "/items/:item_id".into(),
                handler: "remove".into(),
                existing_path: "/items/:id".into(),
                existing: "show".into(),
            }
        );

        // 名称一致时不同方法、更深的路径都可以共存
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Delete, "/items/:id", "remove", create))
            .unwrap();
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Get, "/items/:id/tags", "tags", list))
            .unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_param_conflict_inside_one_controller_registers_nothing() {
        let mut registry = RouteRegistry::new();
        let controller = ControllerDescriptor::new("ItemController", "/items")
            .route(RouteDescriptor::new(HttpMethod::Get, "/:id", "show", list))
            .route(RouteDescriptor::new(HttpMethod::Put, "/:key", "update", create));

        let err = registry.register_controller(controller).unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingParams { .. }));
        assert!(registry.is_empty());

        // 失败的控制器不会留下参数段记录
        registry
            .register_route(RouteDescriptor::new(HttpMethod::Get, "/items/:key", "show", list))
            .unwrap();
    }

    #[test]
    fn test_malformed_paths_are_rejected() {
        for path in ["/items/:", "/files/*rest/more", "/items/id:x"] {
            let mut registry = RouteRegistry::new();
            let err = registry
                .register_route(RouteDescriptor::new(HttpMethod::Get, path, "bad", list))
                .unwrap_err();
            assert!(matches!(err, RegistryError::MalformedPath { .. }), "{}", path);
        }
    }
}
